//! Disk-backed page storage implementation.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use parking_lot::Mutex;

use super::Storage;
use crate::storage::error::StorageError;
use crate::storage::page::{DEFAULT_PAGE_SIZE, PageId};

/// Disk-backed page storage over a single file.
///
/// Page `n` occupies the byte range `[n * page_size, (n + 1) * page_size)`.
/// The file handle is shared behind a mutex; every operation seeks before
/// reading or writing, so the seek + transfer pair must be atomic.
pub struct FileStorage {
    page_size: usize,
    inner: Mutex<FileInner>,
}

struct FileInner {
    file: File,
    num_pages: u64,
}

impl FileStorage {
    /// Opens (or creates) a storage file with the default page size.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        Self::open_with_page_size(path, DEFAULT_PAGE_SIZE)
    }

    /// Opens (or creates) a storage file with the given page size.
    ///
    /// The page size must match the one the file was created with; an
    /// existing file whose length is not a multiple of the page size was
    /// written with a different size (or truncated) and is rejected.
    pub fn open_with_page_size(
        path: impl AsRef<Path>,
        page_size: usize,
    ) -> Result<Self, StorageError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        let file_len = file.metadata()?.len();
        if file_len % page_size as u64 != 0 {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!(
                    "file length {} is not a multiple of page size {}",
                    file_len, page_size
                ),
            )));
        }

        Ok(Self {
            page_size,
            inner: Mutex::new(FileInner {
                file,
                num_pages: file_len / page_size as u64,
            }),
        })
    }

    fn page_offset(&self, page_id: PageId) -> u64 {
        page_id.page_num() * self.page_size as u64
    }
}

impl Storage for FileStorage {
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

        let mut inner = self.inner.lock();
        if page_id.page_num() >= inner.num_pages {
            return Err(StorageError::PageNotFound(page_id));
        }

        inner.file.seek(SeekFrom::Start(self.page_offset(page_id)))?;
        inner.file.read_exact(buf)?;
        Ok(())
    }

    fn write_page(&self, page_id: PageId, buf: &[u8]) -> Result<(), StorageError> {
        if buf.len() != self.page_size {
            return Err(StorageError::InvalidBufferSize {
                expected: self.page_size,
                actual: buf.len(),
            });
        }

        let mut inner = self.inner.lock();
        if page_id.page_num() >= inner.num_pages {
            return Err(StorageError::PageNotFound(page_id));
        }

        inner.file.seek(SeekFrom::Start(self.page_offset(page_id)))?;
        inner.file.write_all(buf)?;
        Ok(())
    }

    fn allocate_page(&self) -> Result<PageId, StorageError> {
        let mut inner = self.inner.lock();
        let page_id = PageId::new(inner.num_pages);

        let zeroes = vec![0u8; self.page_size];
        inner.file.seek(SeekFrom::Start(self.page_offset(page_id)))?;
        inner.file.write_all(&zeroes)?;
        inner.num_pages += 1;

        Ok(page_id)
    }

    fn page_count(&self) -> u64 {
        self.inner.lock().num_pages
    }

    fn sync_all(&self) -> Result<(), StorageError> {
        self.inner.lock().file.sync_all()?;
        Ok(())
    }
}
