// Slotted heap page layout
//
// Record data grows forward from the header; the slot directory grows
// backward from the end of the page. Deleting a record tombstones its
// slot (length 0) so RIDs of surviving records stay stable.

use byteorder::{ByteOrder, LittleEndian};

use crate::common::types::{Page, PageId, SlotId, INVALID_PAGE_ID, PAGE_SIZE};
use crate::storage::page::error::PageError;

pub const HEAP_HEADER_SIZE: usize = 16; // 4 bytes per field * 4 fields
pub const SLOT_ENTRY_SIZE: usize = 8; // 4 bytes offset + 4 bytes length

#[derive(Debug, Clone, Copy)]
pub struct HeapPageHeader {
    pub free_space_offset: u32,
    pub free_space_size: u32,
    pub record_count: u32,
    pub next_page_id: Option<PageId>,
}

impl HeapPageHeader {
    pub fn new() -> Self {
        Self {
            free_space_offset: HEAP_HEADER_SIZE as u32,
            free_space_size: (PAGE_SIZE - HEAP_HEADER_SIZE) as u32,
            record_count: 0,
            next_page_id: None,
        }
    }

    pub fn to_bytes(&self) -> [u8; HEAP_HEADER_SIZE] {
        let mut bytes = [0u8; HEAP_HEADER_SIZE];
        LittleEndian::write_u32(&mut bytes[0..4], self.free_space_offset);
        LittleEndian::write_u32(&mut bytes[4..8], self.free_space_size);
        LittleEndian::write_u32(&mut bytes[8..12], self.record_count);
        LittleEndian::write_u32(&mut bytes[12..16], self.next_page_id.unwrap_or(INVALID_PAGE_ID));
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        let next = LittleEndian::read_u32(&bytes[12..16]);
        Self {
            free_space_offset: LittleEndian::read_u32(&bytes[0..4]),
            free_space_size: LittleEndian::read_u32(&bytes[4..8]),
            record_count: LittleEndian::read_u32(&bytes[8..12]),
            next_page_id: if next == INVALID_PAGE_ID { None } else { Some(next) },
        }
    }
}

impl Default for HeapPageHeader {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy)]
struct SlotEntry {
    offset: u32,
    length: u32, // 0 marks a deleted record
}

impl SlotEntry {
    fn write(&self, buf: &mut [u8]) {
        LittleEndian::write_u32(&mut buf[0..4], self.offset);
        LittleEndian::write_u32(&mut buf[4..8], self.length);
    }

    fn read(buf: &[u8]) -> Self {
        Self {
            offset: LittleEndian::read_u32(&buf[0..4]),
            length: LittleEndian::read_u32(&buf[4..8]),
        }
    }
}

/// Accessors for the slotted record layout of a heap page.
pub struct HeapPage;

impl HeapPage {
    pub fn init(page: &mut Page) {
        let header = HeapPageHeader::new();
        page.data[0..HEAP_HEADER_SIZE].copy_from_slice(&header.to_bytes());
    }

    pub fn header(page: &Page) -> HeapPageHeader {
        HeapPageHeader::from_bytes(&page.data[0..HEAP_HEADER_SIZE])
    }

    fn write_header(page: &mut Page, header: &HeapPageHeader) {
        page.data[0..HEAP_HEADER_SIZE].copy_from_slice(&header.to_bytes());
    }

    pub fn next_page_id(page: &Page) -> Option<PageId> {
        Self::header(page).next_page_id
    }

    pub fn set_next_page_id(page: &mut Page, next: PageId) {
        let mut header = Self::header(page);
        header.next_page_id = Some(next);
        Self::write_header(page, &header);
    }

    pub fn record_count(page: &Page) -> u32 {
        Self::header(page).record_count
    }

    /// Append a record, returning its slot.
    pub fn insert_record(page: &mut Page, data: &[u8]) -> Result<SlotId, PageError> {
        let mut header = Self::header(page);

        let record_size = data.len() as u32;
        let space_needed = record_size + SLOT_ENTRY_SIZE as u32;
        if header.free_space_size < space_needed {
            return Err(PageError::InsufficientSpace);
        }

        let slot = header.record_count;
        let slot_pos = Self::slot_position(slot);
        let entry = SlotEntry {
            offset: header.free_space_offset,
            length: record_size,
        };

        let data_start = header.free_space_offset as usize;
        page.data[data_start..data_start + data.len()].copy_from_slice(data);
        entry.write(&mut page.data[slot_pos..slot_pos + SLOT_ENTRY_SIZE]);

        header.free_space_offset += record_size;
        header.free_space_size -= space_needed;
        header.record_count += 1;
        Self::write_header(page, &header);

        Ok(slot)
    }

    pub fn get_record(page: &Page, slot: SlotId) -> Result<Vec<u8>, PageError> {
        let entry = Self::slot_entry(page, slot)?;
        if entry.length == 0 {
            return Err(PageError::RecordNotFound);
        }

        let start = entry.offset as usize;
        let end = start + entry.length as usize;
        Ok(page.data[start..end].to_vec())
    }

    /// Overwrite a record in place. A larger payload is relocated into the
    /// page's free space so the slot number never changes.
    pub fn update_record(page: &mut Page, slot: SlotId, data: &[u8]) -> Result<(), PageError> {
        let entry = Self::slot_entry(page, slot)?;
        if entry.length == 0 {
            return Err(PageError::RecordNotFound);
        }

        let slot_pos = Self::slot_position(slot);
        let new_size = data.len() as u32;

        if new_size > entry.length {
            let mut header = Self::header(page);
            let growth = new_size - entry.length;
            if header.free_space_size < growth {
                return Err(PageError::InsufficientSpace);
            }

            let new_offset = header.free_space_offset;
            let start = new_offset as usize;
            page.data[start..start + data.len()].copy_from_slice(data);

            let new_entry = SlotEntry {
                offset: new_offset,
                length: new_size,
            };
            new_entry.write(&mut page.data[slot_pos..slot_pos + SLOT_ENTRY_SIZE]);

            header.free_space_offset += new_size;
            header.free_space_size -= growth;
            Self::write_header(page, &header);
            return Ok(());
        }

        let start = entry.offset as usize;
        page.data[start..start + data.len()].copy_from_slice(data);

        if new_size < entry.length {
            let new_entry = SlotEntry {
                offset: entry.offset,
                length: new_size,
            };
            new_entry.write(&mut page.data[slot_pos..slot_pos + SLOT_ENTRY_SIZE]);
        }

        Ok(())
    }

    /// Tombstone a record. The space is not reclaimed.
    pub fn delete_record(page: &mut Page, slot: SlotId) -> Result<(), PageError> {
        let entry = Self::slot_entry(page, slot)?;
        if entry.length == 0 {
            return Err(PageError::RecordNotFound);
        }

        let tombstone = SlotEntry {
            offset: entry.offset,
            length: 0,
        };
        let slot_pos = Self::slot_position(slot);
        tombstone.write(&mut page.data[slot_pos..slot_pos + SLOT_ENTRY_SIZE]);

        Ok(())
    }

    fn slot_entry(page: &Page, slot: SlotId) -> Result<SlotEntry, PageError> {
        let header = Self::header(page);
        if slot >= header.record_count {
            return Err(PageError::InvalidSlot(slot));
        }
        let slot_pos = Self::slot_position(slot);
        Ok(SlotEntry::read(&page.data[slot_pos..slot_pos + SLOT_ENTRY_SIZE]))
    }

    fn slot_position(slot: SlotId) -> usize {
        PAGE_SIZE - SLOT_ENTRY_SIZE * (slot as usize + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_page() -> Page {
        let mut page = Page::new(1);
        HeapPage::init(&mut page);
        page
    }

    #[test]
    fn test_insert_and_get() {
        let mut page = fresh_page();
        let slot_a = HeapPage::insert_record(&mut page, b"alpha").unwrap();
        let slot_b = HeapPage::insert_record(&mut page, b"beta").unwrap();

        assert_eq!(slot_a, 0);
        assert_eq!(slot_b, 1);
        assert_eq!(HeapPage::get_record(&page, slot_a).unwrap(), b"alpha");
        assert_eq!(HeapPage::get_record(&page, slot_b).unwrap(), b"beta");
        assert_eq!(HeapPage::record_count(&page), 2);
    }

    #[test]
    fn test_delete_tombstones_slot() {
        let mut page = fresh_page();
        let slot_a = HeapPage::insert_record(&mut page, b"alpha").unwrap();
        let slot_b = HeapPage::insert_record(&mut page, b"beta").unwrap();

        HeapPage::delete_record(&mut page, slot_a).unwrap();
        assert!(matches!(
            HeapPage::get_record(&page, slot_a),
            Err(PageError::RecordNotFound)
        ));
        assert!(matches!(
            HeapPage::delete_record(&mut page, slot_a),
            Err(PageError::RecordNotFound)
        ));

        // The surviving record keeps its slot
        assert_eq!(HeapPage::get_record(&page, slot_b).unwrap(), b"beta");
    }

    #[test]
    fn test_update_in_place_and_relocated() {
        let mut page = fresh_page();
        let slot = HeapPage::insert_record(&mut page, b"0123456789").unwrap();

        HeapPage::update_record(&mut page, slot, b"abc").unwrap();
        assert_eq!(HeapPage::get_record(&page, slot).unwrap(), b"abc");

        HeapPage::update_record(&mut page, slot, b"a-much-longer-record").unwrap();
        assert_eq!(
            HeapPage::get_record(&page, slot).unwrap(),
            b"a-much-longer-record"
        );
    }

    #[test]
    fn test_page_fills_up() {
        let mut page = fresh_page();
        let payload = [0xAAu8; 1024];
        let mut inserted = 0;
        while HeapPage::insert_record(&mut page, &payload).is_ok() {
            inserted += 1;
        }
        // 8192-byte page, 16-byte header, 1032 bytes per record+slot
        assert_eq!(inserted, 7);
        assert!(matches!(
            HeapPage::insert_record(&mut page, &payload),
            Err(PageError::InsufficientSpace)
        ));
    }

    #[test]
    fn test_next_page_link() {
        let mut page = fresh_page();
        assert_eq!(HeapPage::next_page_id(&page), None);
        HeapPage::set_next_page_id(&mut page, 9);
        assert_eq!(HeapPage::next_page_id(&page), Some(9));
    }
}
