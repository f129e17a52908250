//! Sequential file scan operator.

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::heap::{HeapCursor, HeapFile, TupleId};
use crate::storage::Storage;

use super::cost::PlanCost;
use super::error::ExecutorError;
use super::node::PlanNode;
use super::schema::SchemaRef;
use super::stats::{ColumnStats, TableStats};
use super::tuple::Tuple;

/// Leaf operator producing every live tuple of a heap file, in storage
/// order.
///
/// The scan advances a [`HeapCursor`] one tuple per pull; no page stays
/// pinned between pulls. Produced tuples carry their storage identity, so
/// downstream operators (and trivial projections) can preserve it.
///
/// Marking is supported: the mark is a snapshot of the cursor position,
/// and resetting simply moves the cursor back.
pub struct FileScanNode<S> {
    table_name: String,
    cursor: HeapCursor<S>,
    schema: SchemaRef,
    column_stats: Vec<ColumnStats>,
    table_stats: TableStats,
    cost: Option<PlanCost>,
    done: bool,
    mark: Option<(Option<TupleId>, bool)>,
}

impl<S: Storage> FileScanNode<S> {
    /// Creates a scan over `file` with the table's schema and statistics.
    ///
    /// The schema and statistics come from the catalog layer, which is
    /// outside this crate; `column_stats` must align with the schema.
    pub fn new(
        file: HeapFile<S>,
        table_name: impl Into<String>,
        schema: SchemaRef,
        table_stats: TableStats,
        column_stats: Vec<ColumnStats>,
    ) -> Self {
        debug_assert_eq!(schema.len(), column_stats.len());
        Self {
            table_name: table_name.into(),
            cursor: HeapCursor::new(file),
            schema,
            column_stats,
            table_stats,
            cost: None,
            done: false,
            mark: None,
        }
    }

    /// Returns the name of the scanned table.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }
}

impl<S: Storage + 'static> PlanNode for FileScanNode<S> {
    fn prepare(&mut self) -> Result<(), ExecutorError> {
        if self.cost.is_some() {
            return Ok(());
        }

        let num_tuples = self.table_stats.num_tuples as f32;
        self.cost = Some(PlanCost::new(
            num_tuples,
            self.table_stats.avg_tuple_size,
            num_tuples,
            self.table_stats.num_data_pages as f32,
        ));
        Ok(())
    }

    fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    fn stats(&self) -> &[ColumnStats] {
        &self.column_stats
    }

    fn cost(&self) -> &PlanCost {
        self.cost.as_ref().expect("plan node has not been prepared")
    }

    fn initialize(&mut self) {
        self.cursor.rewind();
        self.done = false;
        self.mark = None;
    }

    fn get_next_tuple(&mut self) -> Result<Option<Tuple>, ExecutorError> {
        if self.cost.is_none() {
            return Err(ExecutorError::InvalidState(
                "plan node has not been prepared",
            ));
        }
        if self.done {
            return Ok(None);
        }

        match self.cursor.next_tuple()? {
            Some((id, record)) => Ok(Some(Tuple::stored(record, id))),
            None => {
                self.done = true;
                Ok(None)
            }
        }
    }

    fn supports_marking(&self) -> bool {
        true
    }

    fn mark_current_position(&mut self) -> Result<(), ExecutorError> {
        self.mark = Some((self.cursor.position(), self.done));
        Ok(())
    }

    fn reset_to_last_mark(&mut self) -> Result<(), ExecutorError> {
        match self.mark {
            Some((position, done)) => {
                self.cursor.set_position(position);
                self.done = done;
                Ok(())
            }
            None => Err(ExecutorError::InvalidState("no position has been marked")),
        }
    }

    fn clean_up(&mut self) {
        // The scan holds no pages between pulls; nothing to release.
    }

    fn duplicate(&self) -> Box<dyn PlanNode> {
        Box::new(FileScanNode {
            table_name: self.table_name.clone(),
            cursor: HeapCursor::new(self.cursor.file().clone()),
            schema: self.schema.clone(),
            column_stats: self.column_stats.clone(),
            table_stats: self.table_stats,
            cost: self.cost,
            done: false,
            mark: None,
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_node(&self, other: &dyn PlanNode) -> bool {
        match other.as_any().downcast_ref::<FileScanNode<S>>() {
            Some(other) => self.table_name == other.table_name && self.schema == other.schema,
            None => false,
        }
    }

    fn hash_node(&self, state: &mut dyn Hasher) {
        let mut state = state;
        self.table_name.hash(&mut state);
        self.schema.hash(&mut state);
    }
}

impl<S> fmt::Display for FileScanNode<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileScan[table: {}]", self.table_name)
    }
}
