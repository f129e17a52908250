//! Executor-specific errors.

use crate::heap::HeapError;
use crate::storage::StorageError;

/// Errors that can occur during plan preparation or execution.
#[derive(Debug)]
pub enum ExecutorError {
    /// Referenced column does not exist in any bound schema.
    ColumnNotFound { name: String },

    /// Column reference matches more than one column.
    AmbiguousColumn { name: String },

    /// Type mismatch in expression evaluation or type inference.
    TypeMismatch { expected: String, found: String },

    /// Integer arithmetic overflowed.
    IntegerOverflow,

    /// Division (or modulo) by zero.
    DivisionByZero,

    /// Unsupported operation or feature.
    Unsupported(String),

    /// Operation used outside its legal state.
    InvalidState(&'static str),

    /// Heap storage error during tuple access.
    Heap(HeapError),

    /// Page I/O error.
    Storage(StorageError),
}

impl std::fmt::Display for ExecutorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutorError::ColumnNotFound { name } => {
                write!(f, "column \"{}\" does not exist", name)
            }
            ExecutorError::AmbiguousColumn { name } => {
                write!(f, "column reference \"{}\" is ambiguous", name)
            }
            ExecutorError::TypeMismatch { expected, found } => {
                write!(f, "type mismatch: expected {}, found {}", expected, found)
            }
            ExecutorError::IntegerOverflow => write!(f, "integer overflow"),
            ExecutorError::DivisionByZero => write!(f, "division by zero"),
            ExecutorError::Unsupported(msg) => write!(f, "unsupported: {}", msg),
            ExecutorError::InvalidState(msg) => write!(f, "invalid state: {}", msg),
            ExecutorError::Heap(err) => write!(f, "{}", err),
            ExecutorError::Storage(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for ExecutorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExecutorError::Heap(err) => Some(err),
            ExecutorError::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<HeapError> for ExecutorError {
    fn from(err: HeapError) -> Self {
        ExecutorError::Heap(err)
    }
}

impl From<StorageError> for ExecutorError {
    fn from(err: StorageError) -> Self {
        ExecutorError::Storage(err)
    }
}
