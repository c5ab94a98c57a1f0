//! # Region and Document Layout
//!
//! Type-safe accessors for the two packed structures living in the mapped
//! region: the 16-byte region header and the 20-byte document header. Both
//! are little-endian with no padding, expressed as zerocopy structs so reads
//! come straight off the mapping without deserialization.
//!
//! ## Document Record
//!
//! ```text
//! Offset  Size   Field
//! ------  -----  --------------------------------------------
//! 0       4      size: total record bytes, header included
//! 4       8      next_off: offset of next live document (0 = none)
//! 12      8      prev_off: offset of previous live document (0 = none)
//! 20      ...    payload: opaque user bytes, size - 20 of them
//! ```
//!
//! ## Validation
//!
//! Every live offset is produced by the store itself, so `document_at`
//! treats an out-of-range offset or an inconsistent size field as fatal and
//! panics. A mismatch here means on-disk corruption or a caller quoting an
//! offset from before a compaction; neither is recoverable.

use zerocopy::little_endian::{U32, U64};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::encoding::{put_u32, put_u64};

/// First byte available to document records.
pub const DOC_START: u64 = 16;

/// Packed size of a document header: size + next_off + prev_off.
pub const DOC_HEADER_SIZE: u64 = 20;

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct RegionHeader {
    first_off: U64,
    last_off: U64,
}

const _: () = assert!(std::mem::size_of::<RegionHeader>() == 16);

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct DocumentHeader {
    size: U32,
    next_off: U64,
    prev_off: U64,
}

const _: () = assert!(std::mem::size_of::<DocumentHeader>() == DOC_HEADER_SIZE as usize);

/// Total packed size of a record carrying `payload_len` bytes.
///
/// Panics if the record would not fit the u32 size field.
pub fn doc_byte_size(payload_len: usize) -> u64 {
    let size = DOC_HEADER_SIZE + payload_len as u64;
    assert!(
        u32::try_from(size).is_ok(),
        "document payload of {} bytes exceeds the record size field",
        payload_len
    );
    size
}

/// An owned document as handed across the public API.
///
/// `next_off` and `prev_off` reflect the record's list links at read time;
/// they are ignored on insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub next_off: u64,
    pub prev_off: u64,
    pub payload: Vec<u8>,
}

impl Document {
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            next_off: 0,
            prev_off: 0,
            payload: payload.into(),
        }
    }

    /// Total packed size of this document, header included.
    pub fn byte_size(&self) -> u64 {
        doc_byte_size(self.payload.len())
    }
}

/// A borrowed view of a record resident in the mapped region.
///
/// The payload aliases the mapping and is only valid while the lock that
/// produced it is held; traversal callbacks receive views, API return values
/// are owned copies.
#[derive(Debug, Clone, Copy)]
pub struct DocumentView<'a> {
    pub size: u32,
    pub next_off: u64,
    pub prev_off: u64,
    pub payload: &'a [u8],
}

impl DocumentView<'_> {
    pub fn byte_size(&self) -> u64 {
        self.size as u64
    }

    pub fn to_document(&self) -> Document {
        Document {
            next_off: self.next_off,
            prev_off: self.prev_off,
            payload: self.payload.to_vec(),
        }
    }
}

pub fn first_off(region: &[u8]) -> u64 {
    region_header(region).first_off.get()
}

pub fn last_off(region: &[u8]) -> u64 {
    region_header(region).last_off.get()
}

pub fn set_first_off(region: &mut [u8], off: u64) {
    region_header_mut(region).first_off = U64::new(off);
}

pub fn set_last_off(region: &mut [u8], off: u64) {
    region_header_mut(region).last_off = U64::new(off);
}

fn region_header(region: &[u8]) -> &RegionHeader {
    RegionHeader::ref_from_bytes(&region[..16]).expect("region shorter than its header")
}

fn region_header_mut(region: &mut [u8]) -> &mut RegionHeader {
    RegionHeader::mut_from_bytes(&mut region[..16]).expect("region shorter than its header")
}

/// Reads the record at `off`, panicking on any bounds or size inconsistency.
pub fn document_at(region: &[u8], off: u64) -> DocumentView<'_> {
    let len = region.len() as u64;
    assert!(
        off >= DOC_START && off + DOC_HEADER_SIZE <= len,
        "document offset {} out of bounds (region length {})",
        off,
        len
    );

    let start = off as usize;
    let header = DocumentHeader::ref_from_bytes(&region[start..start + DOC_HEADER_SIZE as usize])
        .expect("document header slice has fixed length");

    let size = header.size.get();
    assert!(
        size as u64 >= DOC_HEADER_SIZE && off + size as u64 <= len,
        "document at offset {} has corrupt size {} (region length {})",
        off,
        size,
        len
    );

    DocumentView {
        size,
        next_off: header.next_off.get(),
        prev_off: header.prev_off.get(),
        payload: &region[start + DOC_HEADER_SIZE as usize..start + size as usize],
    }
}

/// Packs a record at `off` in place: header populated from the arguments,
/// payload copied after it. The caller guarantees the range is free.
pub fn write_document(region: &mut [u8], off: u64, payload: &[u8], next_off: u64, prev_off: u64) {
    let size = doc_byte_size(payload.len());
    let len = region.len() as u64;
    assert!(
        off >= DOC_START && off + size <= len,
        "document write at offset {} (size {}) out of bounds (region length {})",
        off,
        size,
        len
    );

    let start = off as usize;
    put_u32(region, start, size as u32);
    put_u64(region, start + 4, next_off);
    put_u64(region, start + 12, prev_off);
    region[start + DOC_HEADER_SIZE as usize..start + size as usize].copy_from_slice(payload);
}

/// Patches the next-document pointer of the record at `off`.
pub fn set_next_off(region: &mut [u8], off: u64, next_off: u64) {
    debug_assert!(off >= DOC_START);
    put_u64(region, off as usize + 4, next_off);
}

/// Patches the previous-document pointer of the record at `off`.
pub fn set_prev_off(region: &mut [u8], off: u64, prev_off: u64) {
    debug_assert!(off >= DOC_START);
    put_u64(region, off as usize + 12, prev_off);
}
