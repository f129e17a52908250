//! Schemas and column metadata.
//!
//! A [`Schema`] is an ordered sequence of [`ColumnInfo`] descriptors that
//! also supports keyed lookup: resolving an (optionally table-qualified)
//! column name to a position, with ambiguity detection. Schemas are
//! immutable once built and shared between plan nodes via [`SchemaRef`].

use std::fmt;
use std::sync::Arc;

use crate::datum::Type;

use super::error::ExecutorError;

/// Assumed encoded size of a variable-length column, for cost estimation.
const VARLEN_SIZE_ESTIMATE: usize = 32;

/// A shared, immutable schema.
pub type SchemaRef = Arc<Schema>;

/// Metadata describing one column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnInfo {
    /// Column name (or alias).
    pub name: String,
    /// Qualifying table name. `None` for computed/expression columns.
    pub table: Option<String>,
    /// Column type.
    pub ty: Type,
}

impl ColumnInfo {
    /// Creates an unqualified column descriptor.
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            table: None,
            ty,
        }
    }

    /// Creates a table-qualified column descriptor.
    pub fn with_table(name: impl Into<String>, table: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            table: Some(table.into()),
            ty,
        }
    }

    /// Returns `table.column` when qualified, or just the column name.
    pub fn display_name(&self) -> String {
        match &self.table {
            Some(table) => format!("{}.{}", table, self.name),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for ColumnInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.display_name(), self.ty)
    }
}

/// An ordered list of columns with name-based resolution.
///
/// Duplicate column names are allowed (they arise naturally from joins and
/// projections); ambiguity is detected at lookup time instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Schema {
    columns: Vec<ColumnInfo>,
}

impl Schema {
    /// Creates a schema from an ordered column list.
    pub fn new(columns: Vec<ColumnInfo>) -> Self {
        Self { columns }
    }

    /// Returns the columns in order.
    pub fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    /// Returns the number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if the schema has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Returns the column types in order.
    pub fn types(&self) -> Vec<Type> {
        self.columns.iter().map(|c| c.ty).collect()
    }

    /// Resolves a column reference to its position.
    ///
    /// Matching is case-insensitive. A qualified reference matches only
    /// columns carrying that table qualifier. Returns `Ok(None)` if nothing
    /// matches, so callers can fall through to other schemas.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::AmbiguousColumn`] if more than one column
    /// matches.
    pub fn find_column(
        &self,
        table: Option<&str>,
        name: &str,
    ) -> Result<Option<usize>, ExecutorError> {
        let mut found = None;

        for (index, column) in self.columns.iter().enumerate() {
            if !column.name.eq_ignore_ascii_case(name) {
                continue;
            }
            if let Some(table) = table {
                let qualifier_matches = column
                    .table
                    .as_deref()
                    .is_some_and(|t| t.eq_ignore_ascii_case(table));
                if !qualifier_matches {
                    continue;
                }
            }

            if found.is_some() {
                return Err(ExecutorError::AmbiguousColumn {
                    name: match table {
                        Some(table) => format!("{}.{}", table, name),
                        None => name.to_string(),
                    },
                });
            }
            found = Some(index);
        }

        Ok(found)
    }

    /// Returns all columns qualified by the given table, with their
    /// positions, preserving schema order.
    pub fn columns_for_table<'a>(
        &'a self,
        table: &'a str,
    ) -> impl Iterator<Item = (usize, &'a ColumnInfo)> + 'a {
        self.columns.iter().enumerate().filter(move |(_, column)| {
            column
                .table
                .as_deref()
                .is_some_and(|t| t.eq_ignore_ascii_case(table))
        })
    }

    /// Estimates the encoded size in bytes of a tuple with this schema.
    ///
    /// Fixed-size types use their exact encoded size; variable-length
    /// columns use a fixed estimate.
    pub fn estimated_tuple_size(&self) -> f32 {
        let values: usize = self
            .columns
            .iter()
            .map(|c| c.ty.encoded_size().unwrap_or(VARLEN_SIZE_ESTIMATE))
            .sum();
        // Two bytes of record header (the column count).
        (2 + values) as f32
    }
}
