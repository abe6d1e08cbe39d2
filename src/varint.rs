//! Varint and ZigZag primitives.
//!
//! The compact protocol carries integers as varints: seven data bits per
//! byte, least-significant group first, with the high bit flagging a
//! continuation. Signed integers go through ZigZag first so small magnitudes
//! stay short on the wire whether positive or negative.
//!
//! Only three widths ever appear on the wire: 16 bits for field identifiers,
//! 32 bits for lengths and counts, and 64 bits for integer values. Rather
//! than abstracting over integer types, everything funnels through a single
//! 64-bit encode/decode pair and the narrower readers range-check the result.

use crate::Error;
use bytes::{Buf, BufMut};

/// Continuation flag, set on every byte except the last of an encoding.
const CONTINUATION: u8 = 0x80;

/// A 64-bit varint never spans more than ten bytes (`ceil(64 / 7)`).
const MAX_BYTES: usize = 10;

// ---------- Unsigned ----------

/// Writes `value` as a varint.
pub fn write_u64(value: u64, buf: &mut impl BufMut) {
    let mut rest = value;
    while rest >= u64::from(CONTINUATION) {
        buf.put_u8(rest as u8 | CONTINUATION);
        rest >>= 7;
    }
    buf.put_u8(rest as u8);
}

/// Writes a 32-bit length or count as a varint.
pub fn write_u32(value: u32, buf: &mut impl BufMut) {
    write_u64(u64::from(value), buf);
}

/// Reads a varint of at most 64 data bits.
///
/// Overlong encodings of in-range values are accepted (other writers are not
/// required to emit minimal varints); anything carrying data past the 64th
/// bit is rejected.
pub fn read_u64(buf: &mut impl Buf) -> Result<u64, Error> {
    let mut value = 0u64;
    for index in 0..MAX_BYTES {
        if !buf.has_remaining() {
            return Err(Error::EndOfBuffer);
        }
        let byte = buf.get_u8();
        let group = u64::from(byte & !CONTINUATION);
        // The tenth byte has room for a single data bit.
        if index == MAX_BYTES - 1 && group > 1 {
            return Err(Error::InvalidVarint(8));
        }
        value |= group << (index * 7);
        if byte & CONTINUATION == 0 {
            return Ok(value);
        }
    }
    Err(Error::InvalidVarint(8))
}

/// Reads a varint and narrows it to a 32-bit length or count.
pub fn read_u32(buf: &mut impl Buf) -> Result<u32, Error> {
    u32::try_from(read_u64(buf)?).map_err(|_| Error::InvalidVarint(4))
}

/// Reads a varint and narrows it to a 16-bit field identifier.
pub fn read_u16(buf: &mut impl Buf) -> Result<u16, Error> {
    u16::try_from(read_u64(buf)?).map_err(|_| Error::InvalidVarint(2))
}

/// Bytes `value` occupies as a varint: one per started 7-bit group.
pub fn encoded_len(value: u64) -> usize {
    let data_bits = 64 - value.leading_zeros() as usize;
    usize::max(1, data_bits.div_ceil(7))
}

// ---------- ZigZag ----------

/// ZigZag interleaves signed values onto the unsigned line, so 0, -1, 1, -2,
/// 2, ... map to 0, 1, 2, 3, 4, ... and the varint length tracks magnitude.
#[inline]
pub fn to_zigzag16(value: i16) -> u16 {
    ((value << 1) ^ (value >> 15)) as u16
}

#[inline]
pub fn from_zigzag16(value: u16) -> i16 {
    ((value >> 1) as i16) ^ -((value & 1) as i16)
}

#[inline]
pub fn to_zigzag32(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

#[inline]
pub fn from_zigzag32(value: u32) -> i32 {
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}

#[inline]
pub fn to_zigzag64(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

#[inline]
pub fn from_zigzag64(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

// ---------- Signed ----------

/// Writes a 16-bit field identifier as a ZigZag varint.
pub fn write_i16(value: i16, buf: &mut impl BufMut) {
    write_u64(u64::from(to_zigzag16(value)), buf);
}

/// Reads a 16-bit field identifier from a ZigZag varint.
pub fn read_i16(buf: &mut impl Buf) -> Result<i16, Error> {
    Ok(from_zigzag16(read_u16(buf)?))
}

/// Writes a 32-bit value as a ZigZag varint.
pub fn write_i32(value: i32, buf: &mut impl BufMut) {
    write_u64(u64::from(to_zigzag32(value)), buf);
}

/// Reads a 32-bit value from a ZigZag varint.
pub fn read_i32(buf: &mut impl Buf) -> Result<i32, Error> {
    Ok(from_zigzag32(read_u32(buf)?))
}

/// Writes a 64-bit value as a ZigZag varint.
pub fn write_i64(value: i64, buf: &mut impl BufMut) {
    write_u64(to_zigzag64(value), buf);
}

/// Reads a 64-bit value from a ZigZag varint.
pub fn read_i64(buf: &mut impl Buf) -> Result<i64, Error> {
    Ok(from_zigzag64(read_u64(buf)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_end_of_buffer() {
        let mut buf: &[u8] = &[];
        assert!(matches!(read_u64(&mut buf), Err(Error::EndOfBuffer)));

        // Continuation bit set on the last available byte.
        let mut buf: &[u8] = &[0x80, 0x8F];
        assert!(matches!(read_u64(&mut buf), Err(Error::EndOfBuffer)));
    }

    #[test]
    fn test_width_overflow() {
        // The tenth byte may only carry the 64th bit.
        let mut buf: &[u8] = &[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01];
        assert_eq!(read_u64(&mut buf).unwrap(), u64::MAX);

        let mut buf: &[u8] = &[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x02];
        assert!(matches!(read_u64(&mut buf), Err(Error::InvalidVarint(8))));

        // Narrowing readers reject values past their width.
        let mut buf: &[u8] = &[0xFF, 0xFF, 0xFF, 0xFF, 0x0F];
        assert_eq!(read_u32(&mut buf).unwrap(), u32::MAX);

        let mut buf: &[u8] = &[0xFF, 0xFF, 0xFF, 0xFF, 0x1F];
        assert!(matches!(read_u32(&mut buf), Err(Error::InvalidVarint(4))));

        let mut buf: &[u8] = &[0xFF, 0xFF, 0x03];
        assert_eq!(read_u16(&mut buf).unwrap(), u16::MAX);

        let mut buf: &[u8] = &[0xFF, 0xFF, 0x07];
        assert!(matches!(read_u16(&mut buf), Err(Error::InvalidVarint(2))));
    }

    #[test]
    fn test_unterminated() {
        let mut buf: &[u8] = &[0x80; 10];
        assert!(matches!(read_u64(&mut buf), Err(Error::InvalidVarint(8))));
    }

    #[test]
    fn test_non_canonical_accepted() {
        // Overlong but in-range encodings still decode; other writers are not
        // required to emit minimal varints.
        let mut buf: &[u8] = &[0x81, 0x00];
        assert_eq!(read_u64(&mut buf).unwrap(), 1);

        let mut buf: &[u8] = &[0x80, 0x80, 0x00];
        assert_eq!(read_u32(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_conformity() {
        fn encoded(value: u64) -> Vec<u8> {
            let mut buf = Vec::new();
            write_u64(value, &mut buf);
            buf
        }

        assert_eq!(encoded(0), [0x00]);
        assert_eq!(encoded(1), [0x01]);
        assert_eq!(encoded(127), [0x7F]);
        assert_eq!(encoded(128), [0x80, 0x01]);
        assert_eq!(encoded(16383), [0xFF, 0x7F]);
        assert_eq!(encoded(16384), [0x80, 0x80, 0x01]);
        assert_eq!(encoded(2097151), [0xFF, 0xFF, 0x7F]);
        assert_eq!(encoded(u32::MAX as u64), [0xFF, 0xFF, 0xFF, 0xFF, 0x0F]);
        assert_eq!(
            encoded(u64::MAX),
            [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01]
        );
    }

    #[test]
    fn test_unsigned_round_trips() {
        let cases: &[u64] = &[
            0,
            1,
            126,
            127,
            128,
            129,
            0xFF,
            0x100,
            0x3FFF,
            0x4000,
            0x1_FFFF,
            0xFF_FFFF,
            0x1_FF_FF_FF_FF,
            u16::MAX as u64,
            u32::MAX as u64,
            u64::MAX,
        ];

        for &value in cases {
            let mut buf = Vec::new();
            write_u64(value, &mut buf);
            assert_eq!(buf.len(), encoded_len(value), "length mismatch for {value}");

            let mut slice = &buf[..];
            assert_eq!(read_u64(&mut slice).unwrap(), value);
            assert!(slice.is_empty());

            // The narrowing readers agree wherever the value fits.
            if let Ok(narrow) = u32::try_from(value) {
                let mut slice = &buf[..];
                assert_eq!(read_u32(&mut slice).unwrap(), narrow);
            }
            if let Ok(narrow) = u16::try_from(value) {
                let mut slice = &buf[..];
                assert_eq!(read_u16(&mut slice).unwrap(), narrow);
            }
        }
    }

    #[test]
    fn test_signed_round_trips() {
        let cases: &[i64] = &[
            0,
            1,
            -1,
            2,
            -2,
            63,
            -64,
            64,
            -65,
            127,
            -128,
            128,
            -129,
            0x7FFF_FFFF,
            -0x8000_0000,
            i16::MIN as i64,
            i16::MAX as i64,
            i32::MIN as i64,
            i32::MAX as i64,
            i64::MIN,
            i64::MAX,
        ];

        for &value in cases {
            let mut buf = Vec::new();
            write_i64(value, &mut buf);
            assert_eq!(buf.len(), encoded_len(to_zigzag64(value)));
            let mut slice = &buf[..];
            assert_eq!(read_i64(&mut slice).unwrap(), value);
            assert!(slice.is_empty());

            if let Ok(value) = i32::try_from(value) {
                let mut buf = Vec::new();
                write_i32(value, &mut buf);
                let mut slice = &buf[..];
                assert_eq!(read_i32(&mut slice).unwrap(), value);
            }
            if let Ok(value) = i16::try_from(value) {
                let mut buf = Vec::new();
                write_i16(value, &mut buf);
                let mut slice = &buf[..];
                assert_eq!(read_i16(&mut slice).unwrap(), value);
            }
        }
    }

    #[test]
    fn test_zigzag_laws() {
        // Interleaving: 0, -1, 1, -2, 2, ...
        assert_eq!(to_zigzag32(0), 0);
        assert_eq!(to_zigzag32(-1), 1);
        assert_eq!(to_zigzag32(1), 2);
        assert_eq!(to_zigzag32(-2), 3);
        assert_eq!(to_zigzag32(2), 4);
        assert_eq!(to_zigzag16(i16::MIN), u16::MAX);
        assert_eq!(to_zigzag32(i32::MIN), u32::MAX);
        assert_eq!(to_zigzag64(i64::MIN), u64::MAX);
        assert_eq!(to_zigzag64(i64::MAX), u64::MAX - 1);

        for n in i16::MIN..=i16::MAX {
            assert_eq!(from_zigzag16(to_zigzag16(n)), n);
        }
        for n in [i32::MIN, -1, 0, 1, i32::MAX] {
            assert_eq!(from_zigzag32(to_zigzag32(n)), n);
        }
        for n in [i64::MIN, -1, 0, 1, i64::MAX] {
            assert_eq!(from_zigzag64(to_zigzag64(n)), n);
        }
    }

    #[test]
    fn test_encoded_len_boundaries() {
        // Values that require exactly N bytes.
        let boundaries: &[(u64, usize)] = &[
            (0, 1),
            (127, 1),
            (128, 2),
            (16383, 2),
            (16384, 3),
            (2097151, 3),
            (2097152, 4),
            (268435455, 4),
            (268435456, 5),
            (34359738367, 5),
            (34359738368, 6),
            (u64::MAX, 10),
        ];

        for &(value, expected) in boundaries {
            assert_eq!(encoded_len(value), expected, "length wrong for {value}");
            let mut buf = Vec::new();
            write_u64(value, &mut buf);
            assert_eq!(buf.len(), expected, "encoding wrong for {value}");
        }
    }

    #[test]
    fn test_negative_fuzz() {
        // Deterministic sweep over the signed range, biased toward negatives:
        // Rust's shift semantics are defined for all of them, so every value
        // must survive write/read unchanged.
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..10_000 {
            let value: i64 = rng.gen();
            let value = if value > 0 { -value } else { value };

            let mut buf = Vec::new();
            write_i64(value, &mut buf);
            assert_eq!(buf.len(), encoded_len(to_zigzag64(value)));

            let mut slice = &buf[..];
            assert_eq!(read_i64(&mut slice).unwrap(), value);
            assert!(slice.is_empty());
        }
    }
}
