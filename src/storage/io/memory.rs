//! In-memory page storage implementation.

use parking_lot::Mutex;

use super::Storage;
use crate::storage::error::StorageError;
use crate::storage::page::{DEFAULT_PAGE_SIZE, PageId};

/// In-memory page storage for testing and development.
///
/// Stores pages in a `Vec`; page numbers are assigned sequentially as
/// indices. Uses `parking_lot::Mutex`, which does not poison on panic.
pub struct MemoryStorage {
    page_size: usize,
    pages: Mutex<Vec<Box<[u8]>>>,
}

impl MemoryStorage {
    /// Creates an empty in-memory storage with the default page size.
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// Creates an empty in-memory storage with the given page size.
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            page_size,
            pages: Mutex::new(Vec::new()),
        }
    }
}

impl Storage for MemoryStorage {
    fn page_size(&self) -> usize {
        self.page_size
    }

    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> Result<(), StorageError> {
        if buf.len() != self.page_size {
            return Err(StorageError::InvalidBufferSize {
                expected: self.page_size,
                actual: buf.len(),
            });
        }

        let pages = self.pages.lock();
        let page = pages
            .get(page_id.page_num() as usize)
            .ok_or(StorageError::PageNotFound(page_id))?;

        buf.copy_from_slice(page);
        Ok(())
    }

    fn write_page(&self, page_id: PageId, buf: &[u8]) -> Result<(), StorageError> {
        if buf.len() != self.page_size {
            return Err(StorageError::InvalidBufferSize {
                expected: self.page_size,
                actual: buf.len(),
            });
        }

        let mut pages = self.pages.lock();
        let page = pages
            .get_mut(page_id.page_num() as usize)
            .ok_or(StorageError::PageNotFound(page_id))?;

        page.copy_from_slice(buf);
        Ok(())
    }

    fn allocate_page(&self) -> Result<PageId, StorageError> {
        let mut pages = self.pages.lock();
        let page_id = PageId::new(pages.len() as u64);
        pages.push(vec![0u8; self.page_size].into_boxed_slice());
        Ok(page_id)
    }

    fn page_count(&self) -> u64 {
        self.pages.lock().len() as u64
    }

    fn sync_all(&self) -> Result<(), StorageError> {
        // No-op for in-memory storage
        Ok(())
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}
