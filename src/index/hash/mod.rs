mod error;
mod extendible;
mod index;

pub use error::IndexError;
pub use extendible::ExtendibleHashTable;
pub use index::HashIndex;
