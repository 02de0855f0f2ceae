use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use parking_lot::Mutex;
use thiserror::Error;

use crate::common::types::{Page, PageId, INVALID_PAGE_ID, PAGE_SIZE};

#[derive(Error, Debug)]
pub enum DiskManagerError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Invalid page ID: {0}")]
    InvalidPageId(PageId),
}

/// Page-granular I/O over a single database file.
///
/// Page IDs are handed out densely by the buffer pool, so the IDs that can
/// possibly hold data are exactly `1..=watermark` for a single high-water
/// mark. The disk manager tracks that mark itself: a read above it is
/// answered as a zeroed page without touching the file, and a write above
/// it extends the file and raises it. Skipped IDs in between are holes
/// that read back as zeroes, so every ID the pool has ever allocated is
/// readable, written or not.
pub struct DiskManager {
    db_file: Mutex<File>,
    /// Highest page ID ever written to the file.
    watermark: AtomicU32,
}

impl DiskManager {
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self, DiskManagerError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(db_path)?;

        // On reopen, the file length tells us how far writes got
        let watermark = (file.metadata()?.len() / PAGE_SIZE as u64) as PageId;

        Ok(Self {
            db_file: Mutex::new(file),
            watermark: AtomicU32::new(watermark),
        })
    }

    /// Read a page. An ID that was never written reads back as an all-zero
    /// page, which every page layout in this crate treats as valid-empty.
    pub fn read_page(&self, page_id: PageId) -> Result<Page, DiskManagerError> {
        if page_id == INVALID_PAGE_ID {
            return Err(DiskManagerError::InvalidPageId(page_id));
        }

        let mut page = Page::new(page_id);
        if page_id > self.watermark.load(Ordering::Acquire) {
            return Ok(page);
        }

        let mut file = self.db_file.lock();
        file.seek(SeekFrom::Start(Self::offset_of(page_id)))?;
        file.read_exact(&mut page.data)?;
        Ok(page)
    }

    /// Write a page at its slot, extending the file when the ID lies past
    /// the current end.
    pub fn write_page(&self, page: &Page) -> Result<(), DiskManagerError> {
        if page.page_id == INVALID_PAGE_ID {
            return Err(DiskManagerError::InvalidPageId(page.page_id));
        }

        {
            let mut file = self.db_file.lock();
            file.seek(SeekFrom::Start(Self::offset_of(page.page_id)))?;
            file.write_all(&page.data)?;
            file.flush()?;
        }
        self.watermark.fetch_max(page.page_id, Ordering::AcqRel);
        Ok(())
    }

    /// Byte position of a page: IDs are 1-based, slots are contiguous.
    fn offset_of(page_id: PageId) -> u64 {
        (page_id as u64 - 1) * PAGE_SIZE as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_write_read_round_trip() {
        let file = NamedTempFile::new().unwrap();
        let disk = DiskManager::new(file.path()).unwrap();

        let mut page = Page::new(3);
        page.data[0..5].copy_from_slice(b"hello");
        disk.write_page(&page).unwrap();

        let read_back = disk.read_page(3).unwrap();
        assert_eq!(read_back.page_id, 3);
        assert_eq!(&read_back.data[0..5], b"hello");
    }

    #[test]
    fn test_unwritten_page_reads_zeroed_without_file_io() {
        let file = NamedTempFile::new().unwrap();
        let disk = DiskManager::new(file.path()).unwrap();

        // Nothing written: the read is served off the watermark alone and
        // the file stays empty.
        let page = disk.read_page(42).unwrap();
        assert_eq!(page.page_id, 42);
        assert!(page.data.iter().all(|&b| b == 0));
        assert_eq!(file.as_file().metadata().unwrap().len(), 0);
    }

    #[test]
    fn test_hole_between_written_pages_reads_zeroed() {
        let file = NamedTempFile::new().unwrap();
        let disk = DiskManager::new(file.path()).unwrap();

        // Writing page 5 leaves pages 1-4 as holes below the watermark
        let mut page = Page::new(5);
        page.data[0] = 0xCD;
        disk.write_page(&page).unwrap();

        let hole = disk.read_page(3).unwrap();
        assert!(hole.data.iter().all(|&b| b == 0));
        assert_eq!(disk.read_page(5).unwrap().data[0], 0xCD);
    }

    #[test]
    fn test_reopen_recovers_watermark() {
        let file = NamedTempFile::new().unwrap();
        {
            let disk = DiskManager::new(file.path()).unwrap();
            let mut page = Page::new(2);
            page.data[7] = 0xEE;
            disk.write_page(&page).unwrap();
        }

        let disk = DiskManager::new(file.path()).unwrap();
        assert_eq!(disk.read_page(2).unwrap().data[7], 0xEE);
    }

    #[test]
    fn test_invalid_page_id_rejected() {
        let file = NamedTempFile::new().unwrap();
        let disk = DiskManager::new(file.path()).unwrap();

        assert!(disk.read_page(INVALID_PAGE_ID).is_err());
        assert!(disk.write_page(&Page::new(INVALID_PAGE_ID)).is_err());
    }
}
