//! Table and column statistics.
//!
//! Statistics feed the cost estimates computed during plan preparation.
//! Unknown values are represented as `None` rather than a sentinel.

/// Per-column statistics.
///
/// A plan node's statistics are a list of `ColumnStats` aligned one-to-one
/// with its output schema columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnStats {
    /// Number of distinct values in the column, if known.
    pub num_unique_values: Option<u64>,
    /// Number of NULL values in the column, if known.
    pub num_null_values: Option<u64>,
}

impl ColumnStats {
    /// Creates statistics with all fields unknown.
    pub fn unknown() -> Self {
        Self::default()
    }

    /// Creates statistics with a known distinct-value count.
    pub fn with_unique_values(num_unique_values: u64) -> Self {
        Self {
            num_unique_values: Some(num_unique_values),
            num_null_values: None,
        }
    }
}

/// Per-table statistics supplied to a scan operator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableStats {
    /// Number of data pages in the table's heap file.
    pub num_data_pages: u32,
    /// Number of live tuples in the table.
    pub num_tuples: u32,
    /// Average encoded tuple size in bytes.
    pub avg_tuple_size: f32,
}

impl TableStats {
    /// Creates table statistics.
    pub fn new(num_data_pages: u32, num_tuples: u32, avg_tuple_size: f32) -> Self {
        Self {
            num_data_pages,
            num_tuples,
            avg_tuple_size,
        }
    }
}
