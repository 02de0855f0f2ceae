use thiserror::Error;

use crate::storage::buffer::BufferPoolError;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Buffer pool error: {0}")]
    BufferPool(#[from] BufferPoolError),

    #[error("Bucket capacity {0} exceeds the page maximum of {1}")]
    CapacityTooLarge(usize, usize),
}
