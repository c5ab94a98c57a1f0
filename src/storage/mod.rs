//! # Storage Module
//!
//! The storage layer projects the backing file into the process address
//! space and defines the byte layout of everything inside it. There is
//! exactly one file and one mapping per open bundle.
//!
//! ## Region Layout
//!
//! ```text
//! Offset  Size   Description
//! ------  -----  -------------------------------------------
//! 0       8      first_off: offset of first document (0 = empty)
//! 8       8      last_off:  offset of last document  (0 = empty)
//! 16      ...    document records interleaved with dead bytes
//! ```
//!
//! Document records are packed, little-endian, 20-byte header + payload.
//! Valid document offsets are always >= 16; offset 0 is the "none"
//! sentinel.
//!
//! ## Safety Model
//!
//! A mapped region becomes invalid when remapped (grow, shrink, compact).
//! `MappedRegion::remap` takes `&mut self`, so the borrow checker proves no
//! byte reference survives a remap. The bundle layer adds the runtime half
//! of the contract: remap only ever runs under the exclusive lock, and
//! payload views handed to readers never outlive the shared guard.
//!
//! ## Module Organization
//!
//! - `mmap`: file open/create, remap, grow, flush (`MappedRegion`)
//! - `layout`: region header and document record accessors

pub mod layout;
pub mod mmap;

pub use layout::{doc_byte_size, Document, DocumentView, DOC_HEADER_SIZE, DOC_START};
pub use mmap::MappedRegion;

/// Size of the region header holding the first/last document offsets.
pub const REGION_HEADER_SIZE: u64 = 16;

/// Capacity given to a freshly created backing file.
pub const INITIAL_CAPACITY: u64 = 1_000_000_000;

/// Bytes added to the backing file on each grow event.
pub const GROW_CHUNK: u64 = 1_000_000_000;

/// Size an empty bundle shrinks to when compacted.
pub const EMPTY_COMPACTED_SIZE: u64 = 4096;
