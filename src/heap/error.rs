//! Error types for the heap module.

use std::fmt;

use crate::datum::SerializationError;
use crate::storage::StorageError;

use super::SlotId;

/// Errors from heap operations.
#[derive(Debug)]
pub enum HeapError {
    /// Slot index outside the page's slot directory.
    SlotOutOfRange {
        /// The requested slot.
        slot: SlotId,
        /// Number of slots currently in the directory.
        num_slots: u16,
    },
    /// Operation requires a live tuple but the slot is empty.
    EmptySlot(SlotId),
    /// Range offset falls outside the tuple data area.
    OffsetNotInTupleData {
        /// The requested offset.
        offset: usize,
        /// Where tuple data currently starts.
        data_start: usize,
    },
    /// Range length exceeds the space available to the operation.
    RangeTooLarge {
        /// The requested length.
        len: usize,
        /// Bytes actually available.
        available: usize,
    },
    /// Page has insufficient free space for the requested allocation.
    ///
    /// This is an expected condition: callers react by moving on to another
    /// page or allocating a fresh one.
    PageFull {
        /// Bytes required, including any new slot entry.
        required: usize,
        /// Bytes of free space in the page.
        available: usize,
    },
    /// Tuple cannot fit in any page, even an empty one.
    TupleTooLarge {
        /// Encoded tuple size.
        size: usize,
        /// Largest tuple an empty page can hold.
        max: usize,
    },
    /// Page I/O failed.
    Storage(StorageError),
    /// Tuple encoding or decoding failed.
    Serialization(SerializationError),
}

impl fmt::Display for HeapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeapError::SlotOutOfRange { slot, num_slots } => {
                write!(f, "valid slots are in range [0, {}); got {}", num_slots, slot)
            }
            HeapError::EmptySlot(slot) => write!(f, "slot {} is empty", slot),
            HeapError::OffsetNotInTupleData { offset, data_start } => {
                write!(
                    f,
                    "offset {} is not in the tuple data portion of this page \
                     (data starts at offset {})",
                    offset, data_start
                )
            }
            HeapError::RangeTooLarge { len, available } => {
                write!(
                    f,
                    "length {} is larger than the available space ({} bytes)",
                    len, available
                )
            }
            HeapError::PageFull {
                required,
                available,
            } => {
                write!(
                    f,
                    "page full: need {} bytes, have {} available",
                    required, available
                )
            }
            HeapError::TupleTooLarge { size, max } => {
                write!(
                    f,
                    "tuple of {} bytes exceeds the per-page maximum of {} bytes",
                    size, max
                )
            }
            HeapError::Storage(err) => write!(f, "{}", err),
            HeapError::Serialization(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for HeapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HeapError::Storage(err) => Some(err),
            HeapError::Serialization(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StorageError> for HeapError {
    fn from(err: StorageError) -> Self {
        HeapError::Storage(err)
    }
}

impl From<SerializationError> for HeapError {
    fn from(err: SerializationError) -> Self {
        HeapError::Serialization(err)
    }
}
