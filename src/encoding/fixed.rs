//! # Fixed-Width Integer Encoding
//!
//! This module provides little-endian u32/u64 reads and writes at an explicit
//! byte index into a caller-supplied slice. These are the only integer widths
//! that appear in the mapped-file layout (record sizes are u32, offsets are
//! u64) and in the index snapshot framing.
//!
//! ## Design Rationale
//!
//! The pointer-patch paths of the list engine rewrite a single header field
//! of a record that is already resident in the mapped region. Going through
//! a serialization buffer would mean copying a 20-byte header to flip one
//! u64; writing the field at its absolute index is cheaper and keeps the
//! patch sites self-describing.
//!
//! Little-endian is fixed regardless of host so the backing file is portable
//! across the platforms the mmap layer supports.
//!
//! ## Bounds
//!
//! Callers guarantee `idx + width <= buf.len()`. Slice indexing enforces
//! this; an overrun panics. Every index reaching this module is derived from
//! offsets the store itself produced, so an overrun is corruption, not a
//! recoverable error.
//!
//! ## Thread Safety
//!
//! All functions are pure and stateless.

#[inline]
pub fn put_u32(buf: &mut [u8], idx: usize, val: u32) {
    buf[idx..idx + 4].copy_from_slice(&val.to_le_bytes());
}

#[inline]
pub fn get_u32(buf: &[u8], idx: usize) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&buf[idx..idx + 4]);
    u32::from_le_bytes(raw)
}

#[inline]
pub fn put_u64(buf: &mut [u8], idx: usize, val: u64) {
    buf[idx..idx + 8].copy_from_slice(&val.to_le_bytes());
}

#[inline]
pub fn get_u64(buf: &[u8], idx: usize) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&buf[idx..idx + 8]);
    u64::from_le_bytes(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u32_round_trip() {
        let mut buf = [0u8; 4];

        put_u32(&mut buf, 0, 0);
        assert_eq!(get_u32(&buf, 0), 0);

        put_u32(&mut buf, 0, 0xDEAD_BEEF);
        assert_eq!(get_u32(&buf, 0), 0xDEAD_BEEF);

        put_u32(&mut buf, 0, u32::MAX);
        assert_eq!(get_u32(&buf, 0), u32::MAX);
    }

    #[test]
    fn u64_round_trip() {
        let mut buf = [0u8; 8];

        put_u64(&mut buf, 0, 0);
        assert_eq!(get_u64(&buf, 0), 0);

        put_u64(&mut buf, 0, 0x0123_4567_89AB_CDEF);
        assert_eq!(get_u64(&buf, 0), 0x0123_4567_89AB_CDEF);

        put_u64(&mut buf, 0, u64::MAX);
        assert_eq!(get_u64(&buf, 0), u64::MAX);
    }

    #[test]
    fn writes_are_little_endian() {
        let mut buf = [0u8; 8];

        put_u32(&mut buf, 0, 0x0403_0201);
        assert_eq!(&buf[..4], &[1, 2, 3, 4]);

        put_u64(&mut buf, 0, 0x0807_0605_0403_0201);
        assert_eq!(&buf, &[1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn reads_and_writes_at_interior_index() {
        let mut buf = [0xFFu8; 16];

        put_u32(&mut buf, 5, 42);
        assert_eq!(get_u32(&buf, 5), 42);
        assert_eq!(buf[4], 0xFF);
        assert_eq!(buf[9], 0xFF);

        put_u64(&mut buf, 7, 1 << 40);
        assert_eq!(get_u64(&buf, 7), 1 << 40);
        assert_eq!(buf[6], 0xFF);
        assert_eq!(buf[15], 0xFF);
    }

    #[test]
    #[should_panic]
    fn u64_write_past_end_panics() {
        let mut buf = [0u8; 8];
        put_u64(&mut buf, 1, 7);
    }
}
