//! Page cache: the interface through which the engine obtains pages.
//!
//! The cache hands out owned [`Page`] buffers; holding the `Page` is the
//! pin. [`PageCache::release_page`] unpins the page and writes it back to
//! the backend when the caller marks it dirty. There is no replacement
//! policy: the cache is a write-through materialization layer over a
//! [`Storage`] backend, and callers hold at most one page per logical
//! operation.

use tracing::trace;

use super::error::StorageError;
use super::io::Storage;
use super::page::{Page, PageId};

/// Write-through page cache over a [`Storage`] backend.
///
/// Shared via `Arc` between heap files and scan operators.
pub struct PageCache<S> {
    storage: S,
}

impl<S: Storage> PageCache<S> {
    /// Creates a cache over the given backend.
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Returns the page size of the underlying backend.
    pub fn page_size(&self) -> usize {
        self.storage.page_size()
    }

    /// Returns the total number of allocated pages.
    pub fn page_count(&self) -> u64 {
        self.storage.page_count()
    }

    /// Fetches and pins a page.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::PageNotFound`] for unallocated pages, or an
    /// I/O error from the backend.
    pub fn fetch_page(&self, page_id: PageId) -> Result<Page, StorageError> {
        trace!(page = page_id.page_num(), "fetching page");
        let mut page = Page::new(page_id, self.storage.page_size());
        self.storage.read_page(page_id, page.data_mut())?;
        Ok(page)
    }

    /// Releases a pinned page, writing it back if `dirty`.
    pub fn release_page(&self, page: Page, dirty: bool) -> Result<(), StorageError> {
        trace!(page = page.page_id().page_num(), dirty, "releasing page");
        if dirty {
            self.storage.write_page(page.page_id(), page.data())?;
        }
        Ok(())
    }

    /// Allocates a new zero-filled page and pins it.
    pub fn allocate_page(&self) -> Result<Page, StorageError> {
        let page_id = self.storage.allocate_page()?;
        trace!(page = page_id.page_num(), "allocated page");
        Ok(Page::new(page_id, self.storage.page_size()))
    }

    /// Flushes pending writes on the backend to durable storage.
    pub fn sync_all(&self) -> Result<(), StorageError> {
        self.storage.sync_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::io::MemoryStorage;

    #[test]
    fn test_allocate_fetch_release() {
        let cache = PageCache::new(MemoryStorage::with_page_size(64));

        let mut page = cache.allocate_page().unwrap();
        let page_id = page.page_id();
        page.write_u16(0, 0xBEEF);
        cache.release_page(page, true).unwrap();

        let page = cache.fetch_page(page_id).unwrap();
        assert_eq!(page.read_u16(0), 0xBEEF);
        cache.release_page(page, false).unwrap();
    }

    #[test]
    fn test_clean_release_discards_changes() {
        let cache = PageCache::new(MemoryStorage::with_page_size(64));

        let page = cache.allocate_page().unwrap();
        let page_id = page.page_id();
        cache.release_page(page, true).unwrap();

        let mut page = cache.fetch_page(page_id).unwrap();
        page.write_u16(0, 0xDEAD);
        cache.release_page(page, false).unwrap();

        let page = cache.fetch_page(page_id).unwrap();
        assert_eq!(page.read_u16(0), 0);
    }

    #[test]
    fn test_fetch_unallocated_page_fails() {
        let cache = PageCache::new(MemoryStorage::with_page_size(64));
        assert!(matches!(
            cache.fetch_page(PageId::new(3)),
            Err(StorageError::PageNotFound(_))
        ));
    }

    #[test]
    fn test_page_count_tracks_allocations() {
        let cache = PageCache::new(MemoryStorage::with_page_size(64));
        assert_eq!(cache.page_count(), 0);
        let p = cache.allocate_page().unwrap();
        cache.release_page(p, true).unwrap();
        assert_eq!(cache.page_count(), 1);
    }
}
