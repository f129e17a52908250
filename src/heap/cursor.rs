//! Streaming cursor over the live tuples of a heap file.

use crate::storage::Storage;

use super::error::HeapError;
use super::file::HeapFile;
use super::record::Record;
use super::TupleId;

/// Cursor yielding every live tuple of a [`HeapFile`] in position order.
///
/// Advances slot-by-slot within a page and then page-by-page via the heap
/// file's positional contract. The cursor holds no page pins between calls;
/// each step fetches and releases the pages it touches.
pub struct HeapCursor<S> {
    file: HeapFile<S>,
    position: Option<TupleId>,
}

impl<S: Storage> HeapCursor<S> {
    /// Creates a cursor positioned before the first tuple.
    pub fn new(file: HeapFile<S>) -> Self {
        Self {
            file,
            position: None,
        }
    }

    /// Returns the heap file this cursor iterates over.
    pub fn file(&self) -> &HeapFile<S> {
        &self.file
    }

    /// Returns the cursor's current position, or `None` if it has not
    /// produced a tuple yet.
    pub fn position(&self) -> Option<TupleId> {
        self.position
    }

    /// Moves the cursor to an arbitrary position.
    ///
    /// `None` rewinds to before the first tuple; a `Some` position makes
    /// the next call continue after that tuple.
    pub fn set_position(&mut self, position: Option<TupleId>) {
        self.position = position;
    }

    /// Rewinds the cursor to before the first tuple.
    pub fn rewind(&mut self) {
        self.position = None;
    }

    /// Advances to the next live tuple and returns it with its identity.
    ///
    /// Returns `Ok(None)` once the file is exhausted. Calling again after
    /// exhaustion rescans from the last position and yields any tuples
    /// inserted after it in the meantime.
    pub fn next_tuple(&mut self) -> Result<Option<(TupleId, Record)>, HeapError> {
        let next = match self.position {
            None => self.file.first()?,
            Some(pos) => self.file.next_after(pos)?,
        };

        match next {
            Some(id) => {
                self.position = Some(id);
                let record = self.file.tuple_at(id)?;
                Ok(Some((id, record)))
            }
            None => Ok(None),
        }
    }
}
