// Table heap
//
// An append-oriented record store: a singly linked chain of slotted heap
// pages. Inserts go to the tail page, allocating and linking a new page
// when the tail is full. RIDs are stable for the lifetime of a record.

use std::sync::Arc;
use parking_lot::Mutex;
use thiserror::Error;

use crate::catalog::Tuple;
use crate::common::types::{PageId, Rid, INVALID_PAGE_ID};
use crate::storage::buffer::{BufferPoolError, BufferPoolManager};
use crate::storage::page::{HeapPage, PageError};

#[derive(Error, Debug)]
pub enum HeapError {
    #[error("Page error: {0}")]
    Page(#[from] PageError),

    #[error("Buffer pool error: {0}")]
    BufferPool(#[from] BufferPoolError),

    #[error("Tuple serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Tuple does not fit on an empty page")]
    TupleTooLarge,
}

pub struct TableHeap {
    buffer_pool: Arc<BufferPoolManager>,
    first_page_id: PageId,
    /// Append target; guarded so concurrent inserts chain pages consistently.
    last_page_id: Mutex<PageId>,
}

impl TableHeap {
    /// Create an empty heap with one initialized page.
    pub fn new(buffer_pool: Arc<BufferPoolManager>) -> Result<Self, HeapError> {
        let (page, page_id) = buffer_pool.new_page()?;
        {
            let mut guard = page.write();
            HeapPage::init(&mut guard);
        }
        buffer_pool.unpin_page(page_id, true)?;

        Ok(Self {
            buffer_pool,
            first_page_id: page_id,
            last_page_id: Mutex::new(page_id),
        })
    }

    pub fn first_page_id(&self) -> PageId {
        self.first_page_id
    }

    /// Append a tuple, returning its RID.
    pub fn insert_tuple(&self, tuple: &Tuple) -> Result<Rid, HeapError> {
        let bytes = bincode::serialize(tuple)?;

        let mut last_page_id = self.last_page_id.lock();
        let page = self.buffer_pool.fetch_page(*last_page_id)?;

        let inserted = {
            let mut guard = page.write();
            HeapPage::insert_record(&mut guard, &bytes)
        };

        match inserted {
            Ok(slot) => {
                let rid = Rid::new(*last_page_id, slot);
                self.buffer_pool.unpin_page(*last_page_id, true)?;
                Ok(rid)
            }
            Err(PageError::InsufficientSpace) => {
                // Chain a fresh page off the current tail and retry there
                let (new_page, new_page_id) = self.buffer_pool.new_page()?;
                {
                    let mut guard = new_page.write();
                    HeapPage::init(&mut guard);
                }
                {
                    let mut guard = page.write();
                    HeapPage::set_next_page_id(&mut guard, new_page_id);
                }
                self.buffer_pool.unpin_page(*last_page_id, true)?;
                *last_page_id = new_page_id;

                let slot = {
                    let mut guard = new_page.write();
                    HeapPage::insert_record(&mut guard, &bytes)
                };
                let result = match slot {
                    Ok(slot) => Ok(Rid::new(new_page_id, slot)),
                    Err(PageError::InsufficientSpace) => Err(HeapError::TupleTooLarge),
                    Err(e) => Err(e.into()),
                };
                self.buffer_pool.unpin_page(new_page_id, true)?;
                result
            }
            Err(e) => {
                self.buffer_pool.unpin_page(*last_page_id, false)?;
                Err(e.into())
            }
        }
    }

    pub fn get_tuple(&self, rid: Rid) -> Result<Tuple, HeapError> {
        let page = self.buffer_pool.fetch_page(rid.page_id)?;
        let bytes = {
            let guard = page.read();
            HeapPage::get_record(&guard, rid.slot)
        };
        self.buffer_pool.unpin_page(rid.page_id, false)?;
        Ok(bincode::deserialize(&bytes?)?)
    }

    /// Overwrite the record at `rid` with a new tuple.
    pub fn update_tuple(&self, tuple: &Tuple, rid: Rid) -> Result<(), HeapError> {
        let bytes = bincode::serialize(tuple)?;
        let page = self.buffer_pool.fetch_page(rid.page_id)?;
        let result = {
            let mut guard = page.write();
            HeapPage::update_record(&mut guard, rid.slot, &bytes)
        };
        self.buffer_pool.unpin_page(rid.page_id, result.is_ok())?;
        Ok(result?)
    }

    /// Tombstone the record at `rid`.
    pub fn mark_delete(&self, rid: Rid) -> Result<(), HeapError> {
        let page = self.buffer_pool.fetch_page(rid.page_id)?;
        let result = {
            let mut guard = page.write();
            HeapPage::delete_record(&mut guard, rid.slot)
        };
        self.buffer_pool.unpin_page(rid.page_id, result.is_ok())?;
        Ok(result?)
    }

    /// Iterator over all live records, in page-chain and slot order.
    pub fn iter(&self) -> TableIterator {
        TableIterator {
            buffer_pool: self.buffer_pool.clone(),
            current_page_id: self.first_page_id,
            current_slot: 0,
        }
    }
}

/// Cursor over a table heap, skipping tombstoned slots.
pub struct TableIterator {
    buffer_pool: Arc<BufferPoolManager>,
    current_page_id: PageId,
    current_slot: u32,
}

impl TableIterator {
    /// Pull the next live record, or `None` at end of table.
    pub fn next(&mut self) -> Result<Option<(Rid, Tuple)>, HeapError> {
        loop {
            if self.current_page_id == INVALID_PAGE_ID {
                return Ok(None);
            }

            let page = self.buffer_pool.fetch_page(self.current_page_id)?;
            let mut hit: Option<(Rid, Vec<u8>)> = None;
            let mut scan_error: Option<PageError> = None;
            let mut next_page: Option<PageId> = None;
            {
                let guard = page.read();
                let record_count = HeapPage::record_count(&guard);
                while self.current_slot < record_count {
                    let slot = self.current_slot;
                    self.current_slot += 1;
                    match HeapPage::get_record(&guard, slot) {
                        Ok(bytes) => {
                            hit = Some((Rid::new(self.current_page_id, slot), bytes));
                            break;
                        }
                        // Tombstone: keep scanning
                        Err(PageError::RecordNotFound) => continue,
                        Err(e) => {
                            scan_error = Some(e);
                            break;
                        }
                    }
                }
                if hit.is_none() && scan_error.is_none() {
                    next_page = HeapPage::next_page_id(&guard);
                }
            }

            self.buffer_pool.unpin_page(self.current_page_id, false)?;

            if let Some(e) = scan_error {
                return Err(e.into());
            }
            if let Some((rid, bytes)) = hit {
                return Ok(Some((rid, bincode::deserialize(&bytes)?)));
            }
            self.current_page_id = next_page.unwrap_or(INVALID_PAGE_ID);
            self.current_slot = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;
    use crate::catalog::DataValue;

    fn test_heap(pool_size: usize) -> (TableHeap, NamedTempFile) {
        let file = NamedTempFile::new().unwrap();
        let pool = Arc::new(BufferPoolManager::new(pool_size, file.path()).unwrap());
        (TableHeap::new(pool).unwrap(), file)
    }

    fn row(id: i64) -> Tuple {
        Tuple::new(vec![
            DataValue::Integer(id),
            DataValue::Text(format!("row-{}", id)),
        ])
    }

    #[test]
    fn test_insert_and_get() {
        let (heap, _file) = test_heap(8);
        let rid = heap.insert_tuple(&row(1)).unwrap();
        assert_eq!(heap.get_tuple(rid).unwrap(), row(1));
    }

    #[test]
    fn test_update_and_delete() {
        let (heap, _file) = test_heap(8);
        let rid = heap.insert_tuple(&row(1)).unwrap();

        heap.update_tuple(&row(99), rid).unwrap();
        assert_eq!(heap.get_tuple(rid).unwrap(), row(99));

        heap.mark_delete(rid).unwrap();
        assert!(heap.get_tuple(rid).is_err());
    }

    #[test]
    fn test_iterator_skips_deleted() {
        let (heap, _file) = test_heap(8);
        let mut rids = Vec::new();
        for i in 0..5 {
            rids.push(heap.insert_tuple(&row(i)).unwrap());
        }
        heap.mark_delete(rids[1]).unwrap();
        heap.mark_delete(rids[3]).unwrap();

        let mut iter = heap.iter();
        let mut seen = Vec::new();
        while let Some((rid, tuple)) = iter.next().unwrap() {
            seen.push((rid, tuple));
        }

        let ids: Vec<_> = seen
            .iter()
            .map(|(_, t)| t.value(0).clone())
            .collect();
        assert_eq!(
            ids,
            vec![
                DataValue::Integer(0),
                DataValue::Integer(2),
                DataValue::Integer(4)
            ]
        );
    }

    #[test]
    fn test_spills_to_new_pages() {
        let (heap, _file) = test_heap(16);
        // Large text rows so a single page overflows
        let big = |i: i64| {
            Tuple::new(vec![
                DataValue::Integer(i),
                DataValue::Text("x".repeat(1000)),
            ])
        };

        let mut rids = Vec::new();
        for i in 0..20 {
            rids.push(heap.insert_tuple(&big(i)).unwrap());
        }
        // Rows landed on more than one page
        assert!(rids.iter().any(|r| r.page_id != rids[0].page_id));

        let mut iter = heap.iter();
        let mut count = 0;
        while let Some((_, tuple)) = iter.next().unwrap() {
            assert_eq!(*tuple.value(0), DataValue::Integer(count));
            count += 1;
        }
        assert_eq!(count, 20);
    }
}
