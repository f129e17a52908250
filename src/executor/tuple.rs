//! Tuples flowing through the executor.

use crate::datum::Value;
use crate::heap::{Record, TupleId};

/// A tuple in the execution pipeline: a row of values plus, when the tuple
/// is backed by storage, its identity.
///
/// Tuples read from a heap file carry the `(page, slot)` identity they were
/// read from; tuples synthesized by operators (e.g. a projection's output)
/// carry no identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Tuple {
    /// The tuple's data values.
    pub record: Record,
    /// Storage identity, or `None` for computed tuples.
    pub id: Option<TupleId>,
}

impl Tuple {
    /// Creates a tuple backed by a storage position.
    pub fn stored(record: Record, id: TupleId) -> Self {
        Self {
            record,
            id: Some(id),
        }
    }

    /// Creates a computed tuple with no storage identity.
    pub fn computed(record: Record) -> Self {
        Self { record, id: None }
    }

    /// Returns the tuple's values in column order.
    pub fn values(&self) -> &[Value] {
        &self.record.values
    }
}
