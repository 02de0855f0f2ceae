// Extendible hash directory page layout
//
// page_id (4) | lsn (4) | global_depth (4) | local_depths[512] (1 each) |
// bucket_page_ids[512] (4 each)

use std::collections::HashMap;
use byteorder::{ByteOrder, LittleEndian};

use crate::common::types::{Page, PageId};

/// Upper bound on both global and local depth.
pub const MAX_DEPTH: u32 = 9;

/// Number of directory entries, fixed at `1 << MAX_DEPTH`.
pub const DIRECTORY_ARRAY_SIZE: usize = 1 << MAX_DEPTH;

const PAGE_ID_OFFSET: usize = 0;
const LSN_OFFSET: usize = 4;
const GLOBAL_DEPTH_OFFSET: usize = 8;
const LOCAL_DEPTHS_OFFSET: usize = 12;
const BUCKET_PAGE_IDS_OFFSET: usize = LOCAL_DEPTHS_OFFSET + DIRECTORY_ARRAY_SIZE;

/// Accessors for the directory page of an extendible hash table.
pub struct HashDirectoryPage;

impl HashDirectoryPage {
    pub fn init(page: &mut Page, page_id: PageId) {
        page.data[..BUCKET_PAGE_IDS_OFFSET + 4 * DIRECTORY_ARRAY_SIZE].fill(0);
        LittleEndian::write_u32(&mut page.data[PAGE_ID_OFFSET..PAGE_ID_OFFSET + 4], page_id);
    }

    pub fn page_id(page: &Page) -> PageId {
        LittleEndian::read_u32(&page.data[PAGE_ID_OFFSET..PAGE_ID_OFFSET + 4])
    }

    pub fn lsn(page: &Page) -> u32 {
        LittleEndian::read_u32(&page.data[LSN_OFFSET..LSN_OFFSET + 4])
    }

    pub fn global_depth(page: &Page) -> u32 {
        LittleEndian::read_u32(&page.data[GLOBAL_DEPTH_OFFSET..GLOBAL_DEPTH_OFFSET + 4])
    }

    /// Mask with exactly `global_depth` low bits set.
    pub fn global_depth_mask(page: &Page) -> u32 {
        (1 << Self::global_depth(page)) - 1
    }

    pub fn local_depth_mask(page: &Page, bucket_idx: u32) -> u32 {
        (1 << Self::local_depth(page, bucket_idx)) - 1
    }

    pub fn incr_global_depth(page: &mut Page) {
        let depth = Self::global_depth(page);
        assert!(depth < MAX_DEPTH, "directory cannot grow past MAX_DEPTH");
        LittleEndian::write_u32(
            &mut page.data[GLOBAL_DEPTH_OFFSET..GLOBAL_DEPTH_OFFSET + 4],
            depth + 1,
        );
    }

    pub fn decr_global_depth(page: &mut Page) {
        let depth = Self::global_depth(page);
        assert!(depth > 0, "directory cannot shrink below depth 0");
        LittleEndian::write_u32(
            &mut page.data[GLOBAL_DEPTH_OFFSET..GLOBAL_DEPTH_OFFSET + 4],
            depth - 1,
        );
    }

    /// Number of active directory entries: `1 << global_depth`.
    pub fn size(page: &Page) -> u32 {
        1 << Self::global_depth(page)
    }

    pub fn bucket_page_id(page: &Page, bucket_idx: u32) -> PageId {
        let pos = BUCKET_PAGE_IDS_OFFSET + 4 * bucket_idx as usize;
        LittleEndian::read_u32(&page.data[pos..pos + 4])
    }

    pub fn set_bucket_page_id(page: &mut Page, bucket_idx: u32, bucket_page_id: PageId) {
        let pos = BUCKET_PAGE_IDS_OFFSET + 4 * bucket_idx as usize;
        LittleEndian::write_u32(&mut page.data[pos..pos + 4], bucket_page_id);
    }

    pub fn local_depth(page: &Page, bucket_idx: u32) -> u32 {
        page.data[LOCAL_DEPTHS_OFFSET + bucket_idx as usize] as u32
    }

    pub fn set_local_depth(page: &mut Page, bucket_idx: u32, local_depth: u32) {
        assert!(local_depth <= Self::global_depth(page));
        page.data[LOCAL_DEPTHS_OFFSET + bucket_idx as usize] = local_depth as u8;
    }

    pub fn incr_local_depth(page: &mut Page, bucket_idx: u32) {
        let depth = Self::local_depth(page, bucket_idx);
        assert!(depth < Self::global_depth(page));
        page.data[LOCAL_DEPTHS_OFFSET + bucket_idx as usize] = (depth + 1) as u8;
    }

    pub fn decr_local_depth(page: &mut Page, bucket_idx: u32) {
        let depth = Self::local_depth(page, bucket_idx);
        assert!(depth > 0);
        page.data[LOCAL_DEPTHS_OFFSET + bucket_idx as usize] = (depth - 1) as u8;
    }

    /// Index of the bucket that this bucket last split from (or would merge
    /// with): flip the highest bit of the local prefix.
    pub fn split_image_index(page: &Page, bucket_idx: u32) -> u32 {
        let depth = Self::local_depth(page, bucket_idx);
        bucket_idx ^ (1 << (depth - 1))
    }

    /// The directory can halve when every active entry is below global depth.
    pub fn can_shrink(page: &Page) -> bool {
        let global = Self::global_depth(page);
        (0..Self::size(page)).all(|i| Self::local_depth(page, i) < global)
    }

    /// Check the three directory invariants, panicking on violation:
    /// every local depth is at most the global depth, every bucket page
    /// appears exactly `2^(global - local)` times, and all entries sharing
    /// a bucket page share a local depth.
    pub fn verify_integrity(page: &Page) {
        let global = Self::global_depth(page);
        let mut pointer_counts: HashMap<PageId, u32> = HashMap::new();
        let mut local_depths: HashMap<PageId, u32> = HashMap::new();

        for idx in 0..Self::size(page) {
            let bucket_page_id = Self::bucket_page_id(page, idx);
            let local = Self::local_depth(page, idx);
            assert!(
                local <= global,
                "local depth {} exceeds global depth {} at index {}",
                local,
                global,
                idx
            );

            *pointer_counts.entry(bucket_page_id).or_insert(0) += 1;
            if let Some(&known) = local_depths.get(&bucket_page_id) {
                assert_eq!(
                    known, local,
                    "inconsistent local depths for bucket page {}",
                    bucket_page_id
                );
            } else {
                local_depths.insert(bucket_page_id, local);
            }
        }

        for (bucket_page_id, count) in pointer_counts {
            let local = local_depths[&bucket_page_id];
            let required = 1 << (global - local);
            assert_eq!(
                count, required,
                "bucket page {} has {} pointers, expected {}",
                bucket_page_id, count, required
            );
        }
    }
}
