// Extendible hash table
//
// A point-addressable (key -> value) index whose directory and buckets
// live as pages in the buffer pool. The directory addresses buckets by
// hash(key) & ((1 << global_depth) - 1); overflowing buckets split,
// doubling the directory when needed, and emptied buckets merge with
// their split image, halving the directory when every local depth drops
// below the global depth.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;
use log::debug;
use parking_lot::{Mutex, RwLock};

use crate::common::types::{PageId, PagePtr, INVALID_PAGE_ID};
use crate::index::hash::error::IndexError;
use crate::storage::buffer::BufferPoolManager;
use crate::storage::page::{FixedCodec, HashBucketPage, HashDirectoryPage, MAX_DEPTH};

/// SipHash-based default hash, downcast to the 32 bits the directory uses.
fn default_hash<K: Hash>(key: &K) -> u32 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish() as u32
}

pub struct ExtendibleHashTable<K, V> {
    buffer_pool: Arc<BufferPoolManager>,
    /// Guards directory topology across whole operations.
    table_latch: RwLock<()>,
    /// Guards lazy creation of the directory page.
    directory_page_id: Mutex<PageId>,
    bucket_capacity: usize,
    hash_fn: fn(&K) -> u32,
    _marker: PhantomData<(K, V)>,
}

impl<K, V> ExtendibleHashTable<K, V>
where
    K: FixedCodec + PartialEq,
    V: FixedCodec + PartialEq,
{
    pub fn new(buffer_pool: Arc<BufferPoolManager>) -> Self
    where
        K: Hash,
    {
        Self::with_hasher(buffer_pool, default_hash::<K>)
    }

    pub fn with_hasher(buffer_pool: Arc<BufferPoolManager>, hash_fn: fn(&K) -> u32) -> Self {
        Self {
            buffer_pool,
            table_latch: RwLock::new(()),
            directory_page_id: Mutex::new(INVALID_PAGE_ID),
            bucket_capacity: HashBucketPage::<K, V>::max_capacity(),
            hash_fn,
            _marker: PhantomData,
        }
    }

    /// Table with a reduced bucket capacity, so tests can force splits
    /// with a handful of keys.
    pub fn with_bucket_capacity(
        buffer_pool: Arc<BufferPoolManager>,
        hash_fn: fn(&K) -> u32,
        bucket_capacity: usize,
    ) -> Result<Self, IndexError> {
        let max = HashBucketPage::<K, V>::max_capacity();
        if bucket_capacity > max {
            return Err(IndexError::CapacityTooLarge(bucket_capacity, max));
        }
        let mut table = Self::with_hasher(buffer_pool, hash_fn);
        table.bucket_capacity = bucket_capacity;
        Ok(table)
    }

    fn hash(&self, key: &K) -> u32 {
        (self.hash_fn)(key)
    }

    /// Fetch the directory page, creating it (and the first bucket) on
    /// first use.
    fn fetch_directory(&self) -> Result<(PagePtr, PageId), IndexError> {
        let mut dir_id = self.directory_page_id.lock();
        if *dir_id == INVALID_PAGE_ID {
            let (dir_page, dir_page_id) = self.buffer_pool.new_page()?;
            let (_bucket_page, bucket_page_id) = self.buffer_pool.new_page()?;
            {
                let mut guard = dir_page.write();
                HashDirectoryPage::init(&mut guard, dir_page_id);
                // A zeroed page is already a valid empty bucket
                HashDirectoryPage::set_bucket_page_id(&mut guard, 0, bucket_page_id);
            }
            self.buffer_pool.unpin_page(dir_page_id, true)?;
            self.buffer_pool.unpin_page(bucket_page_id, true)?;
            *dir_id = dir_page_id;
            debug!(
                "created hash directory page {} with initial bucket page {}",
                dir_page_id, bucket_page_id
            );
        }

        let page = self.buffer_pool.fetch_page(*dir_id)?;
        Ok((page, *dir_id))
    }

    /// Look up every value stored under `key`.
    pub fn get_value(&self, key: &K) -> Result<Vec<V>, IndexError> {
        let _table = self.table_latch.read();

        let (dir, dir_page_id) = self.fetch_directory()?;
        let bucket_page_id = {
            let guard = dir.read();
            let idx = self.hash(key) & HashDirectoryPage::global_depth_mask(&guard);
            HashDirectoryPage::bucket_page_id(&guard, idx)
        };

        let bucket = self.buffer_pool.fetch_page(bucket_page_id)?;
        let result = {
            let guard = bucket.read();
            HashBucketPage::<K, V>::get_value(&guard, self.bucket_capacity, key)
        };

        self.buffer_pool.unpin_page(bucket_page_id, false)?;
        self.buffer_pool.unpin_page(dir_page_id, false)?;
        Ok(result)
    }

    /// Insert a `(key, value)` pair. Returns `false` for an exact duplicate
    /// or when the target bucket cannot split any further.
    pub fn insert(&self, key: &K, value: &V) -> Result<bool, IndexError> {
        {
            let _table = self.table_latch.write();

            let (dir, dir_page_id) = self.fetch_directory()?;
            let bucket_page_id = {
                let guard = dir.read();
                let idx = self.hash(key) & HashDirectoryPage::global_depth_mask(&guard);
                HashDirectoryPage::bucket_page_id(&guard, idx)
            };

            let bucket = self.buffer_pool.fetch_page(bucket_page_id)?;
            let outcome = {
                let mut guard = bucket.write();
                if !HashBucketPage::<K, V>::is_full(&guard, self.bucket_capacity) {
                    Some(HashBucketPage::<K, V>::insert(
                        &mut guard,
                        self.bucket_capacity,
                        key,
                        value,
                    ))
                } else {
                    None
                }
            };

            match outcome {
                Some(inserted) => {
                    self.buffer_pool.unpin_page(bucket_page_id, inserted)?;
                    self.buffer_pool.unpin_page(dir_page_id, false)?;
                    return Ok(inserted);
                }
                None => {
                    self.buffer_pool.unpin_page(bucket_page_id, false)?;
                    self.buffer_pool.unpin_page(dir_page_id, false)?;
                }
            }
        }

        // Bucket is full: split it, then retry the insert from scratch
        self.split_insert(key, value)
    }

    fn split_insert(&self, key: &K, value: &V) -> Result<bool, IndexError> {
        {
            let _table = self.table_latch.write();

            let (dir, dir_page_id) = self.fetch_directory()?;
            let mut dir_guard = dir.write();

            let bucket_idx = self.hash(key) & HashDirectoryPage::global_depth_mask(&dir_guard);
            let local_depth = HashDirectoryPage::local_depth(&dir_guard, bucket_idx);
            let old_page_id = HashDirectoryPage::bucket_page_id(&dir_guard, bucket_idx);

            if local_depth >= MAX_DEPTH {
                drop(dir_guard);
                self.buffer_pool.unpin_page(dir_page_id, false)?;
                return Ok(false);
            }

            let grew = local_depth == HashDirectoryPage::global_depth(&dir_guard);
            if grew {
                HashDirectoryPage::incr_global_depth(&mut dir_guard);
                debug!(
                    "doubling hash directory to global depth {}",
                    HashDirectoryPage::global_depth(&dir_guard)
                );
            }
            HashDirectoryPage::incr_local_depth(&mut dir_guard, bucket_idx);
            let new_local_depth = local_depth + 1;

            // Drain the overflowing bucket
            let old_bucket = self.buffer_pool.fetch_page(old_page_id)?;
            let entries = {
                let mut guard = old_bucket.write();
                let entries =
                    HashBucketPage::<K, V>::array_copy(&guard, self.bucket_capacity);
                HashBucketPage::<K, V>::reset(&mut guard, self.bucket_capacity);
                entries
            };

            // Allocate its split image
            let (image_bucket, image_page_id) = self.buffer_pool.new_page()?;
            let image_idx = HashDirectoryPage::split_image_index(&dir_guard, bucket_idx);
            HashDirectoryPage::set_local_depth(&mut dir_guard, image_idx, new_local_depth);
            HashDirectoryPage::set_bucket_page_id(&mut dir_guard, image_idx, image_page_id);

            let diff = 1u32 << new_local_depth;
            let dir_size = HashDirectoryPage::size(&dir_guard);
            let half = dir_size / 2;

            // When the directory just doubled, mark the new half unassigned;
            // the walks below claim the split classes and the mirror pass
            // fills in the rest.
            if grew {
                for i in half..dir_size {
                    if i != image_idx {
                        HashDirectoryPage::set_bucket_page_id(&mut dir_guard, i, INVALID_PAGE_ID);
                    }
                }
            }

            // Reassign every entry congruent to the split bucket or its image
            let mut i = bucket_idx as i64;
            while i >= 0 {
                HashDirectoryPage::set_bucket_page_id(&mut dir_guard, i as u32, old_page_id);
                HashDirectoryPage::set_local_depth(&mut dir_guard, i as u32, new_local_depth);
                i -= diff as i64;
            }
            let mut i = bucket_idx;
            while i < dir_size {
                HashDirectoryPage::set_bucket_page_id(&mut dir_guard, i, old_page_id);
                HashDirectoryPage::set_local_depth(&mut dir_guard, i, new_local_depth);
                i += diff;
            }
            let mut i = image_idx as i64;
            while i >= 0 {
                HashDirectoryPage::set_bucket_page_id(&mut dir_guard, i as u32, image_page_id);
                HashDirectoryPage::set_local_depth(&mut dir_guard, i as u32, new_local_depth);
                i -= diff as i64;
            }
            let mut i = image_idx;
            while i < dir_size {
                HashDirectoryPage::set_bucket_page_id(&mut dir_guard, i, image_page_id);
                HashDirectoryPage::set_local_depth(&mut dir_guard, i, new_local_depth);
                i += diff;
            }

            // Mirror the untouched lower-half pointers into the new half
            if grew {
                for i in half..dir_size {
                    if HashDirectoryPage::bucket_page_id(&dir_guard, i) == INVALID_PAGE_ID {
                        let src = i - half;
                        let page_id = HashDirectoryPage::bucket_page_id(&dir_guard, src);
                        let depth = HashDirectoryPage::local_depth(&dir_guard, src);
                        HashDirectoryPage::set_bucket_page_id(&mut dir_guard, i, page_id);
                        HashDirectoryPage::set_local_depth(&mut dir_guard, i, depth);
                    }
                }
            }

            // Rehash the drained entries into the two buckets
            {
                let mut old_guard = old_bucket.write();
                let mut image_guard = image_bucket.write();
                let mask = HashDirectoryPage::local_depth_mask(&dir_guard, bucket_idx);
                for (k, v) in &entries {
                    let target_idx = self.hash(k) & mask;
                    let target_page =
                        HashDirectoryPage::bucket_page_id(&dir_guard, target_idx);
                    debug_assert!(
                        target_page == old_page_id || target_page == image_page_id,
                        "rehashed entry must land in the split bucket or its image"
                    );
                    if target_page == old_page_id {
                        HashBucketPage::<K, V>::insert(
                            &mut old_guard,
                            self.bucket_capacity,
                            k,
                            v,
                        );
                    } else {
                        HashBucketPage::<K, V>::insert(
                            &mut image_guard,
                            self.bucket_capacity,
                            k,
                            v,
                        );
                    }
                }
            }

            drop(dir_guard);
            self.buffer_pool.unpin_page(old_page_id, true)?;
            self.buffer_pool.unpin_page(image_page_id, true)?;
            self.buffer_pool.unpin_page(dir_page_id, true)?;
        }

        // Retry now that the keys have room
        self.insert(key, value)
    }

    /// Remove an exact `(key, value)` pair, merging the bucket if it empties.
    pub fn remove(&self, key: &K, value: &V) -> Result<bool, IndexError> {
        let (removed, emptied, bucket_idx);
        {
            let _table = self.table_latch.write();

            let (dir, dir_page_id) = self.fetch_directory()?;
            let (idx, bucket_page_id) = {
                let guard = dir.read();
                let idx = self.hash(key) & HashDirectoryPage::global_depth_mask(&guard);
                (idx, HashDirectoryPage::bucket_page_id(&guard, idx))
            };

            let bucket = self.buffer_pool.fetch_page(bucket_page_id)?;
            let (r, e) = {
                let mut guard = bucket.write();
                (
                    HashBucketPage::<K, V>::remove(&mut guard, self.bucket_capacity, key, value),
                    HashBucketPage::<K, V>::is_empty(&guard, self.bucket_capacity),
                )
            };

            self.buffer_pool.unpin_page(bucket_page_id, r)?;
            self.buffer_pool.unpin_page(dir_page_id, false)?;
            removed = r;
            emptied = e;
            bucket_idx = idx;
        }

        if emptied {
            self.merge(bucket_idx)?;
        }
        Ok(removed)
    }

    /// Fold an emptied bucket into its split image, lowering local depths
    /// and halving the directory when possible. The emptied bucket page is
    /// intentionally left to the buffer pool rather than deleted.
    fn merge(&self, target_idx: u32) -> Result<(), IndexError> {
        let _table = self.table_latch.write();

        let (dir, dir_page_id) = self.fetch_directory()?;
        let mut dirty = false;
        {
            let mut guard = dir.write();

            if target_idx < HashDirectoryPage::size(&guard)
                && HashDirectoryPage::local_depth(&guard, target_idx) > 0
            {
                let image_idx = HashDirectoryPage::split_image_index(&guard, target_idx);
                let image_page_id = HashDirectoryPage::bucket_page_id(&guard, image_idx);

                HashDirectoryPage::decr_local_depth(&mut guard, target_idx);
                let new_local_depth = HashDirectoryPage::local_depth(&guard, target_idx);
                let diff = 1u32 << new_local_depth;
                let dir_size = HashDirectoryPage::size(&guard);

                let mut i = target_idx as i64;
                while i >= 0 {
                    HashDirectoryPage::set_bucket_page_id(&mut guard, i as u32, image_page_id);
                    HashDirectoryPage::set_local_depth(&mut guard, i as u32, new_local_depth);
                    i -= diff as i64;
                }
                let mut i = target_idx;
                while i < dir_size {
                    HashDirectoryPage::set_bucket_page_id(&mut guard, i, image_page_id);
                    HashDirectoryPage::set_local_depth(&mut guard, i, new_local_depth);
                    i += diff;
                }

                if HashDirectoryPage::can_shrink(&guard) {
                    HashDirectoryPage::decr_global_depth(&mut guard);
                    debug!(
                        "halving hash directory to global depth {}",
                        HashDirectoryPage::global_depth(&guard)
                    );
                }
                dirty = true;
            }
        }

        self.buffer_pool.unpin_page(dir_page_id, dirty)?;
        Ok(())
    }

    pub fn global_depth(&self) -> Result<u32, IndexError> {
        let _table = self.table_latch.read();
        let (dir, dir_page_id) = self.fetch_directory()?;
        let depth = {
            let guard = dir.read();
            HashDirectoryPage::global_depth(&guard)
        };
        self.buffer_pool.unpin_page(dir_page_id, false)?;
        Ok(depth)
    }

    /// Panics if the directory invariants do not hold.
    pub fn verify_integrity(&self) -> Result<(), IndexError> {
        let _table = self.table_latch.read();
        let (dir, dir_page_id) = self.fetch_directory()?;
        {
            let guard = dir.read();
            HashDirectoryPage::verify_integrity(&guard);
        }
        self.buffer_pool.unpin_page(dir_page_id, false)?;
        Ok(())
    }
}
