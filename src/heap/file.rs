//! Multi-page heap file.
//!
//! A [`HeapFile`] stores records in a sequence of slotted pages obtained
//! from a shared [`PageCache`]. Insertion walks the existing pages looking
//! for free space and extends the file with a fresh page when every page is
//! full. Iteration is positional: [`first`](HeapFile::first) and
//! [`next_after`](HeapFile::next_after) advance slot-by-slot within a page
//! and then page-by-page, skipping empty slots.
//!
//! Pages are pinned only for the duration of a single operation; no method
//! holds a page across a return.

use std::sync::Arc;

use tracing::debug;

use crate::storage::{PageCache, PageId, Storage};

use super::error::HeapError;
use super::page::{EMPTY_SLOT, SlottedPage};
use super::record::Record;
use super::{SlotId, TupleId};

/// A heap file of records over a page cache.
///
/// Cloning is cheap: clones share the same underlying page cache.
pub struct HeapFile<S> {
    cache: Arc<PageCache<S>>,
}

impl<S> Clone for HeapFile<S> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<S: Storage> HeapFile<S> {
    /// Creates a heap file over the given page cache.
    pub fn new(cache: Arc<PageCache<S>>) -> Self {
        Self { cache }
    }

    /// Returns the number of pages in the file.
    pub fn page_count(&self) -> u64 {
        self.cache.page_count()
    }

    /// Returns the largest encoded tuple an empty page can hold.
    ///
    /// Accounts for the slot-count field and one slot entry.
    pub fn max_tuple_size(&self) -> usize {
        self.cache.page_size() - 4
    }

    /// Inserts a record, extending the file with a new page if necessary.
    ///
    /// Pages are tried in order; a page that reports
    /// [`HeapError::PageFull`] is skipped. Returns the [`TupleId`] of the
    /// stored tuple.
    ///
    /// # Errors
    ///
    /// Returns [`HeapError::TupleTooLarge`] if the record cannot fit in any
    /// page, or a storage error if page I/O fails.
    pub fn insert_tuple(&self, record: &Record) -> Result<TupleId, HeapError> {
        let len = record.serialized_size();
        let max = self.max_tuple_size();
        if len > max {
            return Err(HeapError::TupleTooLarge { size: len, max });
        }

        let mut buf = vec![0u8; len];
        record.serialize(&mut buf)?;

        for page_num in 0..self.cache.page_count() {
            let page_id = PageId::new(page_num);
            let mut page = self.cache.fetch_page(page_id)?;

            let allocated = SlottedPage::new(&mut page).allocate_tuple(len);
            match allocated {
                Ok(slot) => {
                    SlottedPage::new(&mut page)
                        .tuple_data_mut(slot)?
                        .copy_from_slice(&buf);
                    self.cache.release_page(page, true)?;
                    return Ok(TupleId::new(page_id, slot));
                }
                Err(HeapError::PageFull { .. }) => {
                    self.cache.release_page(page, false)?;
                }
                Err(err) => {
                    self.cache.release_page(page, false)?;
                    return Err(err);
                }
            }
        }

        // Every existing page is full: extend the file.
        debug!(len, "no page has room, extending heap file");
        let mut page = self.cache.allocate_page()?;
        let page_id = page.page_id();
        {
            let mut slotted = SlottedPage::new(&mut page);
            slotted.init();
            let slot = slotted.allocate_tuple(len)?;
            slotted.tuple_data_mut(slot)?.copy_from_slice(&buf);
            self.cache.release_page(page, true)?;
            Ok(TupleId::new(page_id, slot))
        }
    }

    /// Deletes the tuple at the given position.
    pub fn delete_tuple(&self, id: TupleId) -> Result<(), HeapError> {
        let mut page = self.cache.fetch_page(id.page_id)?;
        let result = SlottedPage::new(&mut page).delete_tuple(id.slot);
        match result {
            Ok(()) => {
                self.cache.release_page(page, true)?;
                Ok(())
            }
            Err(err) => {
                self.cache.release_page(page, false)?;
                Err(err)
            }
        }
    }

    /// Reads and decodes the tuple at the given position.
    pub fn tuple_at(&self, id: TupleId) -> Result<Record, HeapError> {
        let page = self.cache.fetch_page(id.page_id)?;
        let result = {
            let slotted = SlottedPage::new(&page);
            slotted
                .tuple_data(id.slot)
                .and_then(|bytes| Record::deserialize(bytes).map_err(HeapError::from))
        };
        self.cache.release_page(page, false)?;
        result
    }

    /// Returns the position of the first live tuple, or `None` if the file
    /// holds no tuples.
    pub fn first(&self) -> Result<Option<TupleId>, HeapError> {
        self.scan_from(0, 0)
    }

    /// Returns the position of the first live tuple after `pos`.
    pub fn next_after(&self, pos: TupleId) -> Result<Option<TupleId>, HeapError> {
        self.scan_from(pos.page_id.page_num(), pos.slot as u32 + 1)
    }

    /// Finds the first non-empty slot at or after (`page_num`, `slot`).
    fn scan_from(&self, mut page_num: u64, mut slot: u32) -> Result<Option<TupleId>, HeapError> {
        while page_num < self.cache.page_count() {
            let page_id = PageId::new(page_num);
            let page = self.cache.fetch_page(page_id)?;

            let found = {
                let slotted = SlottedPage::new(&page);
                let num_slots = slotted.num_slots() as u32;
                (slot..num_slots).map(|s| s as SlotId).find(|&s| {
                    matches!(slotted.slot_offset(s), Ok(offset) if offset != EMPTY_SLOT)
                })
            };
            self.cache.release_page(page, false)?;

            if let Some(s) = found {
                return Ok(Some(TupleId::new(page_id, s)));
            }

            page_num += 1;
            slot = 0;
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datum::Value;
    use crate::storage::MemoryStorage;

    fn small_file() -> HeapFile<MemoryStorage> {
        HeapFile::new(Arc::new(PageCache::new(MemoryStorage::with_page_size(64))))
    }

    fn int_record(n: i32) -> Record {
        Record::new(vec![Value::Int32(n)])
    }

    #[test]
    fn test_insert_and_read() {
        let file = small_file();
        let record = Record::new(vec![Value::Int32(1), Value::Text("a".into())]);

        let id = file.insert_tuple(&record).unwrap();
        assert_eq!(file.tuple_at(id).unwrap(), record);
    }

    #[test]
    fn test_insert_extends_to_new_pages() {
        let file = small_file();

        // Each record encodes to 2 + 5 = 7 bytes; a 64-byte page holds a
        // handful, so 30 inserts must span several pages.
        let ids: Vec<_> = (0..30)
            .map(|n| file.insert_tuple(&int_record(n)).unwrap())
            .collect();

        assert!(file.page_count() > 1);
        for (n, id) in ids.iter().enumerate() {
            assert_eq!(file.tuple_at(*id).unwrap(), int_record(n as i32));
        }
    }

    #[test]
    fn test_tuple_too_large() {
        let file = small_file();
        let record = Record::new(vec![Value::Text("x".repeat(100))]);
        assert!(matches!(
            file.insert_tuple(&record),
            Err(HeapError::TupleTooLarge { .. })
        ));
    }

    #[test]
    fn test_iteration_order_and_skipping() {
        let file = small_file();
        let ids: Vec<_> = (0..10)
            .map(|n| file.insert_tuple(&int_record(n)).unwrap())
            .collect();

        file.delete_tuple(ids[3]).unwrap();
        file.delete_tuple(ids[4]).unwrap();

        let mut seen = Vec::new();
        let mut pos = file.first().unwrap();
        while let Some(id) = pos {
            seen.push(file.tuple_at(id).unwrap().values[0].clone());
            pos = file.next_after(id).unwrap();
        }

        let expected: Vec<_> = [0, 1, 2, 5, 6, 7, 8, 9]
            .iter()
            .map(|&n| Value::Int32(n))
            .collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_first_on_empty_file() {
        let file = small_file();
        assert!(file.first().unwrap().is_none());
    }

    #[test]
    fn test_delete_then_insert_reuses_space() {
        let file = small_file();
        let ids: Vec<_> = (0..5)
            .map(|n| file.insert_tuple(&int_record(n)).unwrap())
            .collect();
        let pages_before = file.page_count();

        file.delete_tuple(ids[2]).unwrap();
        let id = file.insert_tuple(&int_record(42)).unwrap();

        // Freed space in an existing page is reused before extending.
        assert_eq!(file.page_count(), pages_before);
        assert_eq!(file.tuple_at(id).unwrap(), int_record(42));
    }

    #[test]
    fn test_double_delete_fails() {
        let file = small_file();
        let a = file.insert_tuple(&int_record(1)).unwrap();
        let _b = file.insert_tuple(&int_record(2)).unwrap();

        file.delete_tuple(a).unwrap();
        assert!(matches!(
            file.delete_tuple(a),
            Err(HeapError::EmptySlot(_))
        ));
    }
}
