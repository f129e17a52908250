//! Heap storage for variable-length tuples.
//!
//! This module provides the heap file implementation, which stores table
//! rows in slotted pages. The term "heap" refers to an unordered collection
//! of tuples, as opposed to indexed structures.
//!
//! - [`SlottedPage`]: page-level tuple storage (slot directory + packed
//!   tuple heap)
//! - [`Record`]: a row of [`Value`](crate::datum::Value)s with compact
//!   serialization
//! - [`HeapFile`]: multi-page tuple storage with positional iteration
//! - [`HeapCursor`]: streaming iteration over all live tuples in a file

pub mod cursor;
pub mod error;
pub mod file;
pub mod page;
pub mod record;

pub use cursor::HeapCursor;
pub use error::HeapError;
pub use file::HeapFile;
pub use page::{EMPTY_SLOT, SlottedPage};
pub use record::Record;

use crate::storage::PageId;

/// Slot index within a page.
pub type SlotId = u16;

/// Identity of a tuple: the page holding it and its slot within that page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TupleId {
    /// Page containing the tuple.
    pub page_id: PageId,
    /// Slot within the page.
    pub slot: SlotId,
}

impl TupleId {
    /// Creates a new tuple identifier.
    pub fn new(page_id: PageId, slot: SlotId) -> Self {
        Self { page_id, slot }
    }
}
