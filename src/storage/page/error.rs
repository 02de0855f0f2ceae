use thiserror::Error;

use crate::common::types::SlotId;

#[derive(Error, Debug)]
pub enum PageError {
    #[error("Insufficient space on page")]
    InsufficientSpace,

    #[error("Invalid slot {0}")]
    InvalidSlot(SlotId),

    #[error("Record not found")]
    RecordNotFound,
}
