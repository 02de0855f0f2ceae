use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::catalog::Tuple;
use crate::common::types::Rid;
use crate::index::hash::error::IndexError;
use crate::index::hash::extendible::ExtendibleHashTable;
use crate::storage::buffer::BufferPoolManager;

/// Tuple-keyed hash index over an extendible hash table.
///
/// Key tuples are digested to a fixed-width u64 before they reach the
/// on-page slot array; the table then applies its own directory hash on
/// top of the digest.
pub struct HashIndex {
    table: ExtendibleHashTable<u64, Rid>,
}

impl HashIndex {
    pub fn new(buffer_pool: Arc<BufferPoolManager>) -> Self {
        Self {
            table: ExtendibleHashTable::new(buffer_pool),
        }
    }

    fn key_digest(key: &Tuple) -> u64 {
        let mut hasher = DefaultHasher::new();
        key.values().hash(&mut hasher);
        hasher.finish()
    }

    /// Insert an index entry. Returns `false` if `(key, rid)` already exists.
    pub fn insert_entry(&self, key: &Tuple, rid: Rid) -> Result<bool, IndexError> {
        self.table.insert(&Self::key_digest(key), &rid)
    }

    /// Delete an index entry. Returns `false` if it was not present.
    pub fn delete_entry(&self, key: &Tuple, rid: Rid) -> Result<bool, IndexError> {
        self.table.remove(&Self::key_digest(key), &rid)
    }

    /// All RIDs stored under `key`.
    pub fn scan_key(&self, key: &Tuple) -> Result<Vec<Rid>, IndexError> {
        self.table.get_value(&Self::key_digest(key))
    }
}
