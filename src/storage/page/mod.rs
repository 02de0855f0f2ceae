mod codec;
mod error;
mod hash_bucket;
mod hash_directory;
mod heap_page;

pub use codec::FixedCodec;
pub use error::PageError;
pub use hash_bucket::HashBucketPage;
pub use hash_directory::{HashDirectoryPage, DIRECTORY_ARRAY_SIZE, MAX_DEPTH};
pub use heap_page::{HeapPage, HeapPageHeader, HEAP_HEADER_SIZE, SLOT_ENTRY_SIZE};
