//! Page I/O backend implementations.
//!
//! This module provides the [`Storage`] trait for page-granular I/O, along
//! with [`MemoryStorage`] and [`FileStorage`] implementations.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use super::error::StorageError;
use super::page::PageId;

/// Page I/O backend trait.
///
/// This trait defines the interface for reading and writing fixed-size
/// pages using caller-owned buffers. Implementations include:
/// - [`MemoryStorage`]: in-memory storage for testing
/// - [`FileStorage`]: disk-backed storage over `std::fs`
///
/// # Design
///
/// - **Caller-owned buffers**: the backend moves raw bytes only. Buffer
///   management belongs to the caller (the [`PageCache`](super::PageCache)).
/// - **Page-level operations**: all I/O is in units of `page_size()` bytes.
/// - **Explicit allocation**: `allocate_page()` grows the storage; new pages
///   are zero-filled. The first allocation on empty storage returns page 0,
///   and page numbers are assigned sequentially.
/// - **No caching**: this layer does not cache pages.
///
/// Implementations must be `Send + Sync`; the core accesses a backend from
/// a single logical thread at a time, but backends are shared via `Arc`.
pub trait Storage: Send + Sync {
    /// Returns the page size of this backend in bytes.
    fn page_size(&self) -> usize;

    /// Reads a page into a caller-provided buffer.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::PageNotFound`] if the page has not been
    /// allocated, or [`StorageError::InvalidBufferSize`] if
    /// `buf.len() != page_size()`.
    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> Result<(), StorageError>;

    /// Writes a page from a caller-provided buffer.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::PageNotFound`] if the page has not been
    /// allocated, or [`StorageError::InvalidBufferSize`] if
    /// `buf.len() != page_size()`.
    fn write_page(&self, page_id: PageId, buf: &[u8]) -> Result<(), StorageError>;

    /// Allocates a new zero-filled page and returns its identifier.
    fn allocate_page(&self) -> Result<PageId, StorageError>;

    /// Returns the total number of allocated pages.
    fn page_count(&self) -> u64;

    /// Syncs all pending writes to durable storage.
    ///
    /// For [`MemoryStorage`] this is a no-op. For [`FileStorage`] this calls
    /// `File::sync_all` to flush OS buffers to the physical device.
    fn sync_all(&self) -> Result<(), StorageError>;
}
