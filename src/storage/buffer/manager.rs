use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Arc;
use log::debug;
use parking_lot::{Mutex, RwLock};
use anyhow::Result;

use crate::common::types::{Frame, FrameId, FramePtr, Page, PageId, PagePtr, INVALID_PAGE_ID};
use crate::storage::buffer::error::BufferPoolError;
use crate::storage::buffer::replacer::LruKReplacer;
use crate::storage::disk::DiskManager;

/// Default K for the LRU-K replacement policy
pub const DEFAULT_LRU_K: usize = 2;

/// Bookkeeping guarded by the pool latch: the page table, the free list,
/// and the page ID allocator.
struct PoolState {
    page_table: HashMap<PageId, FrameId>,
    free_list: VecDeque<FrameId>,
    next_page_id: PageId,
}

/// Fixed-size cache of disk pages.
///
/// Every operation holds the pool latch for its full duration, including
/// the disk I/O needed to flush an evicted dirty page. The replacer is
/// notified of every access; a frame becomes evictable exactly when its
/// pin count drops to zero.
pub struct BufferPoolManager {
    pool_size: usize,
    frames: Vec<FramePtr>,
    state: Mutex<PoolState>,
    replacer: Mutex<LruKReplacer>,
    disk_manager: Arc<DiskManager>,
}

impl BufferPoolManager {
    pub fn new(pool_size: usize, db_path: impl AsRef<Path>) -> Result<Self, BufferPoolError> {
        Self::with_replacer_k(pool_size, db_path, DEFAULT_LRU_K)
    }

    pub fn with_replacer_k(
        pool_size: usize,
        db_path: impl AsRef<Path>,
        k: usize,
    ) -> Result<Self, BufferPoolError> {
        let disk_manager = Arc::new(DiskManager::new(db_path)?);
        let mut frames = Vec::with_capacity(pool_size);
        let mut free_list = VecDeque::with_capacity(pool_size);

        for frame_id in 0..pool_size {
            let frame = Frame::new(frame_id, Arc::new(RwLock::new(Page::new(INVALID_PAGE_ID))));
            frames.push(Arc::new(RwLock::new(frame)));
            free_list.push_back(frame_id);
        }

        Ok(Self {
            pool_size,
            frames,
            state: Mutex::new(PoolState {
                page_table: HashMap::new(),
                free_list,
                next_page_id: 1, // Page IDs start at 1; 0 is the invalid sentinel
            }),
            replacer: Mutex::new(LruKReplacer::new(k)),
            disk_manager,
        })
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Allocate a fresh page and pin it into a frame.
    pub fn new_page(&self) -> Result<(PagePtr, PageId), BufferPoolError> {
        let mut state = self.state.lock();

        let frame_id = self.acquire_frame(&mut state)?;
        let page_id = state.next_page_id;
        state.next_page_id += 1;

        {
            let frame = &self.frames[frame_id];
            let mut frame_guard = frame.write();
            {
                let mut page_guard = frame_guard.page.write();
                *page_guard = Page::new(page_id);
            }
            frame_guard.pin_count = 1;
            frame_guard.is_dirty = false;
        }

        state.page_table.insert(page_id, frame_id);
        {
            let mut replacer = self.replacer.lock();
            replacer.record_access(frame_id);
            replacer.set_evictable(frame_id, false);
        }

        let frame_guard = self.frames[frame_id].read();
        Ok((frame_guard.page.clone(), page_id))
    }

    /// Fetch a page, reading it from disk if it is not resident.
    pub fn fetch_page(&self, page_id: PageId) -> Result<PagePtr, BufferPoolError> {
        if page_id == INVALID_PAGE_ID {
            return Err(BufferPoolError::InvalidOperation(
                "cannot fetch the invalid page ID".to_string(),
            ));
        }

        let mut state = self.state.lock();

        // Already resident: bump the pin count and record the access
        if let Some(&frame_id) = state.page_table.get(&page_id) {
            let frame = &self.frames[frame_id];
            {
                let mut frame_guard = frame.write();
                frame_guard.pin_count += 1;
            }
            {
                let mut replacer = self.replacer.lock();
                replacer.record_access(frame_id);
                replacer.set_evictable(frame_id, false);
            }
            let frame_guard = frame.read();
            return Ok(frame_guard.page.clone());
        }

        // Not resident: same frame-acquisition path as new_page, then a read
        let frame_id = self.acquire_frame(&mut state)?;

        let new_page = self.disk_manager.read_page(page_id)?;

        {
            let frame = &self.frames[frame_id];
            let mut frame_guard = frame.write();
            {
                let mut page_guard = frame_guard.page.write();
                *page_guard = new_page;
            }
            frame_guard.pin_count = 1;
            frame_guard.is_dirty = false;
        }

        state.page_table.insert(page_id, frame_id);
        {
            let mut replacer = self.replacer.lock();
            replacer.record_access(frame_id);
            replacer.set_evictable(frame_id, false);
        }

        let frame_guard = self.frames[frame_id].read();
        Ok(frame_guard.page.clone())
    }

    /// Drop one pin on a page, OR-accumulating the dirty flag. The frame
    /// becomes evictable when the pin count reaches zero.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> Result<(), BufferPoolError> {
        let state = self.state.lock();

        let frame_id = match state.page_table.get(&page_id) {
            Some(&id) => id,
            None => return Err(BufferPoolError::PageNotFound(page_id)),
        };

        let pin_count = {
            let frame = &self.frames[frame_id];
            let mut frame_guard = frame.write();

            if frame_guard.pin_count == 0 {
                return Err(BufferPoolError::PageNotPinned(page_id));
            }
            frame_guard.pin_count -= 1;

            if is_dirty {
                frame_guard.is_dirty = true;
            }
            frame_guard.pin_count
        };

        if pin_count == 0 {
            self.replacer.lock().set_evictable(frame_id, true);
        }

        Ok(())
    }

    /// Write a resident page to disk unconditionally and clear its dirty bit.
    /// Pin state is untouched.
    pub fn flush_page(&self, page_id: PageId) -> Result<(), BufferPoolError> {
        let state = self.state.lock();

        let frame_id = match state.page_table.get(&page_id) {
            Some(&id) => id,
            None => return Err(BufferPoolError::PageNotFound(page_id)),
        };

        let frame = &self.frames[frame_id];
        let mut frame_guard = frame.write();
        {
            let page_guard = frame_guard.page.read();
            self.disk_manager.write_page(&page_guard)?;
        }
        frame_guard.is_dirty = false;

        Ok(())
    }

    /// Flush every resident page.
    pub fn flush_all_pages(&self) -> Result<(), BufferPoolError> {
        let page_ids: Vec<PageId> = {
            let state = self.state.lock();
            state.page_table.keys().copied().collect()
        };

        for page_id in page_ids {
            self.flush_page(page_id)?;
        }
        Ok(())
    }

    /// Remove a page from the pool, returning its frame to the free list.
    /// Deleting a non-resident page succeeds vacuously; deleting a pinned
    /// page fails.
    pub fn delete_page(&self, page_id: PageId) -> Result<(), BufferPoolError> {
        let mut state = self.state.lock();

        let frame_id = match state.page_table.get(&page_id) {
            Some(&id) => id,
            None => return Ok(()),
        };

        {
            let frame = &self.frames[frame_id];
            let mut frame_guard = frame.write();

            if frame_guard.pin_count > 0 {
                return Err(BufferPoolError::PagePinned(page_id));
            }

            {
                let mut page_guard = frame_guard.page.write();
                *page_guard = Page::new(INVALID_PAGE_ID);
            }
            frame_guard.is_dirty = false;
        }

        state.page_table.remove(&page_id);
        self.replacer.lock().remove(frame_id);
        state.free_list.push_back(frame_id);

        Ok(())
    }

    /// Current pin count of a resident page, or `None` if not resident.
    pub fn pin_count(&self, page_id: PageId) -> Option<u32> {
        let state = self.state.lock();
        let frame_id = *state.page_table.get(&page_id)?;
        Some(self.frames[frame_id].read().pin_count)
    }

    /// Frames that could hold a new page right now (free plus evictable).
    pub fn free_frame_count(&self) -> usize {
        let state = self.state.lock();
        state.free_list.len() + self.replacer.lock().evictable_count()
    }

    /// Obtain a frame from the free list, or evict a victim. A dirty victim
    /// is written back before its frame is reused.
    fn acquire_frame(&self, state: &mut PoolState) -> Result<FrameId, BufferPoolError> {
        if let Some(frame_id) = state.free_list.pop_front() {
            return Ok(frame_id);
        }

        let frame_id = self
            .replacer
            .lock()
            .evict()
            .ok_or(BufferPoolError::BufferPoolFull)?;

        let frame = &self.frames[frame_id];
        let (evicted_page_id, dirty) = {
            let frame_guard = frame.read();
            assert_eq!(
                frame_guard.pin_count, 0,
                "evicted frame {} must be unpinned",
                frame_id
            );
            let page_guard = frame_guard.page.read();
            (page_guard.page_id, frame_guard.is_dirty)
        };

        if dirty {
            let frame_guard = frame.read();
            let page_guard = frame_guard.page.read();
            self.disk_manager.write_page(&page_guard)?;
        }

        if evicted_page_id != INVALID_PAGE_ID {
            state.page_table.remove(&evicted_page_id);
        }
        debug!("evicting page {} from frame {}", evicted_page_id, frame_id);

        Ok(frame_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn test_pool(pool_size: usize) -> (BufferPoolManager, NamedTempFile) {
        let file = NamedTempFile::new().unwrap();
        let pool = BufferPoolManager::new(pool_size, file.path()).unwrap();
        (pool, file)
    }

    #[test]
    fn test_page_ids_are_dense_from_one() {
        let (pool, _file) = test_pool(4);
        let (_, p1) = pool.new_page().unwrap();
        let (_, p2) = pool.new_page().unwrap();
        assert_eq!(p1, 1);
        assert_eq!(p2, 2);
    }

    #[test]
    fn test_unpin_protocol_violations() {
        let (pool, _file) = test_pool(4);
        let (_, page_id) = pool.new_page().unwrap();

        assert!(matches!(
            pool.unpin_page(999, false),
            Err(BufferPoolError::PageNotFound(999))
        ));

        pool.unpin_page(page_id, false).unwrap();
        assert!(matches!(
            pool.unpin_page(page_id, false),
            Err(BufferPoolError::PageNotPinned(_))
        ));
    }

    #[test]
    fn test_dirty_flag_accumulates() {
        let (pool, _file) = test_pool(4);
        let (page, page_id) = pool.new_page().unwrap();
        {
            let mut guard = page.write();
            guard.data[0] = 7;
        }

        // Pin twice, unpin once dirty and once clean: the dirty bit sticks.
        let _ = pool.fetch_page(page_id).unwrap();
        pool.unpin_page(page_id, true).unwrap();
        pool.unpin_page(page_id, false).unwrap();

        // Force the page out and back; the write must survive.
        for _ in 0..4 {
            let (_, pid) = pool.new_page().unwrap();
            pool.unpin_page(pid, false).unwrap();
        }
        let fetched = pool.fetch_page(page_id).unwrap();
        assert_eq!(fetched.read().data[0], 7);
        pool.unpin_page(page_id, false).unwrap();
    }

    #[test]
    fn test_delete_page_semantics() {
        let (pool, _file) = test_pool(4);
        let (_, page_id) = pool.new_page().unwrap();

        // Pinned page cannot be deleted
        assert!(matches!(
            pool.delete_page(page_id),
            Err(BufferPoolError::PagePinned(_))
        ));

        pool.unpin_page(page_id, false).unwrap();
        pool.delete_page(page_id).unwrap();

        // Deleting an absent page succeeds vacuously
        pool.delete_page(page_id).unwrap();
        pool.delete_page(12345).unwrap();
    }

    #[test]
    fn test_pool_exhaustion_and_recovery() {
        let (pool, _file) = test_pool(3);

        let mut pages = Vec::new();
        for _ in 0..3 {
            pages.push(pool.new_page().unwrap());
        }
        assert_eq!(pool.free_frame_count(), 0);
        assert!(matches!(
            pool.new_page(),
            Err(BufferPoolError::BufferPoolFull)
        ));

        let (_, victim_id) = pages.remove(0);
        pool.unpin_page(victim_id, false).unwrap();
        assert_eq!(pool.free_frame_count(), 1);

        let (_, new_id) = pool.new_page().unwrap();
        assert!(new_id > victim_id);
        // The only unpinned page was evicted
        assert_eq!(pool.pin_count(victim_id), None);
    }
}
