use thiserror::Error;

use crate::catalog::TableOid;
use crate::common::types::Rid;
use crate::index::hash::IndexError;
use crate::storage::buffer::BufferPoolError;
use crate::storage::heap::HeapError;

/// Errors surfaced by query operators
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Table with oid {0} not found")]
    TableNotFound(TableOid),

    #[error("Lock denied on record {0}")]
    LockDenied(Rid),

    #[error("Type error: {0}")]
    TypeError(String),

    #[error("Heap error: {0}")]
    Heap(#[from] HeapError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Buffer pool error: {0}")]
    BufferPool(#[from] BufferPoolError),
}

/// Result type for operator execution
pub type ExecutionResult<T> = Result<T, ExecutionError>;
