// Extendible hash bucket page layout
//
// occupied[ceil(cap/8)] | readable[ceil(cap/8)] | array[cap] of (key, value)
//
// Bits are byte-packed LSB-first. `readable` implies `occupied`; removal
// clears only `readable`, leaving the occupied bit as a tombstone so scans
// can short-circuit on a never-touched region.

use std::marker::PhantomData;

use crate::common::types::{Page, PAGE_SIZE};
use crate::storage::page::codec::FixedCodec;

/// Accessors for a bucket page holding fixed-width `(K, V)` pairs.
///
/// The slot capacity is chosen by the owning hash table and passed into
/// every call; the layout offsets depend on it.
pub struct HashBucketPage<K, V> {
    _marker: PhantomData<(K, V)>,
}

impl<K, V> HashBucketPage<K, V>
where
    K: FixedCodec + PartialEq,
    V: FixedCodec + PartialEq,
{
    /// Largest capacity whose bitmaps and slot array fit on one page:
    /// each pair costs its encoded width plus two bits.
    pub fn max_capacity() -> usize {
        let pair_width = K::WIDTH + V::WIDTH;
        let mut cap = (4 * PAGE_SIZE) / (4 * pair_width + 1);
        while 2 * cap.div_ceil(8) + cap * pair_width > PAGE_SIZE {
            cap -= 1;
        }
        cap
    }

    fn bitmap_bytes(cap: usize) -> usize {
        cap.div_ceil(8)
    }

    fn pair_offset(cap: usize, slot: usize) -> usize {
        2 * Self::bitmap_bytes(cap) + slot * (K::WIDTH + V::WIDTH)
    }

    pub fn is_occupied(page: &Page, _cap: usize, slot: usize) -> bool {
        (page.data[slot / 8] >> (slot % 8)) & 1 == 1
    }

    fn set_occupied(page: &mut Page, _cap: usize, slot: usize) {
        page.data[slot / 8] |= 1 << (slot % 8);
    }

    pub fn is_readable(page: &Page, cap: usize, slot: usize) -> bool {
        let byte = Self::bitmap_bytes(cap) + slot / 8;
        (page.data[byte] >> (slot % 8)) & 1 == 1
    }

    fn set_readable(page: &mut Page, cap: usize, slot: usize) {
        let byte = Self::bitmap_bytes(cap) + slot / 8;
        page.data[byte] |= 1 << (slot % 8);
    }

    /// Clear only the readable bit; the occupied tombstone survives.
    pub fn remove_at(page: &mut Page, cap: usize, slot: usize) {
        let byte = Self::bitmap_bytes(cap) + slot / 8;
        page.data[byte] &= !(1 << (slot % 8));
    }

    pub fn key_at(page: &Page, cap: usize, slot: usize) -> K {
        let pos = Self::pair_offset(cap, slot);
        K::decode_from(&page.data[pos..pos + K::WIDTH])
    }

    pub fn value_at(page: &Page, cap: usize, slot: usize) -> V {
        let pos = Self::pair_offset(cap, slot) + K::WIDTH;
        V::decode_from(&page.data[pos..pos + V::WIDTH])
    }

    fn write_pair(page: &mut Page, cap: usize, slot: usize, key: &K, value: &V) {
        let pos = Self::pair_offset(cap, slot);
        key.encode_into(&mut page.data[pos..pos + K::WIDTH]);
        value.encode_into(&mut page.data[pos + K::WIDTH..pos + K::WIDTH + V::WIDTH]);
    }

    /// Collect every readable value stored under `key`.
    pub fn get_value(page: &Page, cap: usize, key: &K) -> Vec<V> {
        let mut result = Vec::new();
        for slot in 0..cap {
            if Self::is_readable(page, cap, slot) && Self::key_at(page, cap, slot) == *key {
                result.push(Self::value_at(page, cap, slot));
            }
        }
        result
    }

    /// Insert a pair into the first writable slot. Rejects an exact
    /// `(key, value)` duplicate; returns `false` when the bucket is full.
    pub fn insert(page: &mut Page, cap: usize, key: &K, value: &V) -> bool {
        for slot in 0..cap {
            if Self::is_readable(page, cap, slot)
                && Self::key_at(page, cap, slot) == *key
                && Self::value_at(page, cap, slot) == *value
            {
                return false;
            }
        }

        for slot in 0..cap {
            if !Self::is_readable(page, cap, slot) {
                Self::write_pair(page, cap, slot, key, value);
                Self::set_occupied(page, cap, slot);
                Self::set_readable(page, cap, slot);
                return true;
            }
        }
        false
    }

    /// Remove the pair matching `(key, value)` exactly.
    pub fn remove(page: &mut Page, cap: usize, key: &K, value: &V) -> bool {
        for slot in 0..cap {
            if Self::is_readable(page, cap, slot)
                && Self::key_at(page, cap, slot) == *key
                && Self::value_at(page, cap, slot) == *value
            {
                Self::remove_at(page, cap, slot);
                return true;
            }
        }
        false
    }

    pub fn is_full(page: &Page, cap: usize) -> bool {
        (0..cap).all(|slot| Self::is_readable(page, cap, slot))
    }

    pub fn is_empty(page: &Page, cap: usize) -> bool {
        (0..cap).all(|slot| !Self::is_readable(page, cap, slot))
    }

    pub fn num_readable(page: &Page, cap: usize) -> usize {
        (0..cap)
            .filter(|&slot| Self::is_readable(page, cap, slot))
            .count()
    }

    /// Compact copy of all readable pairs.
    pub fn array_copy(page: &Page, cap: usize) -> Vec<(K, V)> {
        (0..cap)
            .filter(|&slot| Self::is_readable(page, cap, slot))
            .map(|slot| (Self::key_at(page, cap, slot), Self::value_at(page, cap, slot)))
            .collect()
    }

    /// Clear both bitmaps, logically emptying the bucket.
    pub fn reset(page: &mut Page, cap: usize) {
        let bytes = Self::bitmap_bytes(cap);
        page.data[..2 * bytes].fill(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::Rid;

    type Bucket = HashBucketPage<u64, Rid>;

    const CAP: usize = 8;

    #[test]
    fn test_insert_get_remove() {
        let mut page = Page::new(1);
        assert!(Bucket::insert(&mut page, CAP, &10, &Rid::new(1, 0)));
        assert!(Bucket::insert(&mut page, CAP, &10, &Rid::new(1, 1)));
        assert!(Bucket::insert(&mut page, CAP, &20, &Rid::new(2, 0)));

        // Duplicate (key, value) pair is rejected
        assert!(!Bucket::insert(&mut page, CAP, &10, &Rid::new(1, 0)));

        let mut values = Bucket::get_value(&page, CAP, &10);
        values.sort();
        assert_eq!(values, vec![Rid::new(1, 0), Rid::new(1, 1)]);

        assert!(Bucket::remove(&mut page, CAP, &10, &Rid::new(1, 0)));
        assert!(!Bucket::remove(&mut page, CAP, &10, &Rid::new(1, 0)));
        assert_eq!(Bucket::get_value(&page, CAP, &10), vec![Rid::new(1, 1)]);
    }

    #[test]
    fn test_readable_implies_occupied() {
        let mut page = Page::new(1);
        for slot in 0..CAP {
            assert!(Bucket::insert(&mut page, CAP, &(slot as u64), &Rid::new(1, slot as u32)));
        }
        for slot in 0..CAP {
            assert!(Bucket::is_occupied(&page, CAP, slot));
            assert!(Bucket::is_readable(&page, CAP, slot));
        }

        // Tombstone keeps the occupied bit
        Bucket::remove_at(&mut page, CAP, 3);
        assert!(Bucket::is_occupied(&page, CAP, 3));
        assert!(!Bucket::is_readable(&page, CAP, 3));
    }

    #[test]
    fn test_full_empty_accounting() {
        let mut page = Page::new(1);
        assert!(Bucket::is_empty(&page, CAP));
        assert!(!Bucket::is_full(&page, CAP));

        for slot in 0..CAP {
            assert!(Bucket::insert(&mut page, CAP, &7, &Rid::new(1, slot as u32)));
        }
        assert!(Bucket::is_full(&page, CAP));
        assert_eq!(Bucket::num_readable(&page, CAP), CAP);

        // Full bucket rejects further inserts
        assert!(!Bucket::insert(&mut page, CAP, &8, &Rid::new(9, 9)));

        // A tombstoned slot is reusable
        Bucket::remove_at(&mut page, CAP, 0);
        assert!(Bucket::insert(&mut page, CAP, &8, &Rid::new(9, 9)));
    }

    #[test]
    fn test_array_copy_and_reset() {
        let mut page = Page::new(1);
        Bucket::insert(&mut page, CAP, &1, &Rid::new(1, 1));
        Bucket::insert(&mut page, CAP, &2, &Rid::new(2, 2));
        Bucket::remove(&mut page, CAP, &1, &Rid::new(1, 1));

        let copy = Bucket::array_copy(&page, CAP);
        assert_eq!(copy, vec![(2, Rid::new(2, 2))]);

        Bucket::reset(&mut page, CAP);
        assert!(Bucket::is_empty(&page, CAP));
        assert_eq!(Bucket::array_copy(&page, CAP), vec![]);
    }

    #[test]
    fn test_max_capacity_fits_page() {
        let cap = Bucket::max_capacity();
        let pair_width = 16;
        assert!(2 * cap.div_ceil(8) + cap * pair_width <= PAGE_SIZE);
        // Page space is not wasted wholesale
        assert!(cap > 400);
    }
}
