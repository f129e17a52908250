//! Error types for the storage layer.

use std::fmt;

use super::page::PageId;

/// Errors from page I/O operations.
#[derive(Debug)]
pub enum StorageError {
    /// The requested page has not been allocated.
    PageNotFound(PageId),
    /// Caller-provided buffer does not match the backend's page size.
    InvalidBufferSize {
        /// Page size of the backend.
        expected: usize,
        /// Size of the buffer that was passed.
        actual: usize,
    },
    /// Underlying file I/O failed.
    Io(std::io::Error),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::PageNotFound(page_id) => {
                write!(f, "page {} has not been allocated", page_id.page_num())
            }
            StorageError::InvalidBufferSize { expected, actual } => {
                write!(
                    f,
                    "buffer size mismatch: page size is {} bytes, got {}",
                    expected, actual
                )
            }
            StorageError::Io(err) => write!(f, "page I/O failed: {}", err),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StorageError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err)
    }
}
