use byteorder::{ByteOrder, LittleEndian};

use crate::common::types::Rid;

/// Fixed-width on-page encoding for hash index keys and values.
///
/// Slot positions in a bucket page are computed from `WIDTH`, so the
/// encoding of a type must always occupy exactly that many bytes.
pub trait FixedCodec: Sized {
    const WIDTH: usize;

    fn encode_into(&self, buf: &mut [u8]);
    fn decode_from(buf: &[u8]) -> Self;
}

impl FixedCodec for u32 {
    const WIDTH: usize = 4;

    fn encode_into(&self, buf: &mut [u8]) {
        LittleEndian::write_u32(buf, *self);
    }

    fn decode_from(buf: &[u8]) -> Self {
        LittleEndian::read_u32(buf)
    }
}

impl FixedCodec for u64 {
    const WIDTH: usize = 8;

    fn encode_into(&self, buf: &mut [u8]) {
        LittleEndian::write_u64(buf, *self);
    }

    fn decode_from(buf: &[u8]) -> Self {
        LittleEndian::read_u64(buf)
    }
}

impl FixedCodec for i64 {
    const WIDTH: usize = 8;

    fn encode_into(&self, buf: &mut [u8]) {
        LittleEndian::write_i64(buf, *self);
    }

    fn decode_from(buf: &[u8]) -> Self {
        LittleEndian::read_i64(buf)
    }
}

impl FixedCodec for Rid {
    const WIDTH: usize = 8;

    fn encode_into(&self, buf: &mut [u8]) {
        LittleEndian::write_u32(&mut buf[0..4], self.page_id);
        LittleEndian::write_u32(&mut buf[4..8], self.slot);
    }

    fn decode_from(buf: &[u8]) -> Self {
        Rid {
            page_id: LittleEndian::read_u32(&buf[0..4]),
            slot: LittleEndian::read_u32(&buf[4..8]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rid_round_trip() {
        let rid = Rid::new(17, 42);
        let mut buf = [0u8; Rid::WIDTH];
        rid.encode_into(&mut buf);
        assert_eq!(Rid::decode_from(&buf), rid);
    }

    #[test]
    fn test_u64_round_trip() {
        let mut buf = [0u8; u64::WIDTH];
        0xDEAD_BEEF_u64.encode_into(&mut buf);
        assert_eq!(u64::decode_from(&buf), 0xDEAD_BEEF);
    }
}
