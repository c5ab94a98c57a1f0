//! # BindleDB - Embedded Append-Oriented Document Store
//!
//! BindleDB keeps an ordered collection of opaque binary documents in a
//! single file that is memory-mapped into the process. Documents live in
//! the mapping as a doubly-linked list of packed records; optional
//! in-memory exact-match indexes map payload-derived keys to document
//! offsets.
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use bindledb::{Document, DocumentBundle};
//!
//! let db = DocumentBundle::open("./accounts.bndl")?;
//!
//! let off = db.put_document(&Document::new(b"alice:premium".to_vec()))?;
//! assert_eq!(db.get_document_at(off).payload, b"alice:premium");
//!
//! db.add_index("tier", Arc::new(|payload: &[u8]| {
//!     payload.split(|&b| b == b':').nth(1).unwrap_or(b"").to_vec()
//! }));
//! let premium = db.get_documents_where("tier", b"premium");
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │   Public API (DocumentBundle)        │
//! ├─────────────────────────────────────┤
//! │   List Engine (do_ layer)            │
//! ├──────────────────┬──────────────────┤
//! │  Record Layout   │  Exact-Match     │
//! │  (20B header)    │  Indexes         │
//! ├──────────────────┴──────────────────┤
//! │   Memory-Mapped Region (1 file)      │
//! └─────────────────────────────────────┘
//! ```
//!
//! ## Semantics
//!
//! - **Append-oriented**: inserts always land after the last record;
//!   removal unlinks without reclaiming bytes; `compact()` rewrites the
//!   file densely and shrinks it.
//! - **Stable offsets**: the offset returned by an insert addresses the
//!   document until the next compaction.
//! - **Single-writer / multi-reader**: one reader-writer lock governs the
//!   region and the indexes together.
//! - **Best-effort durability**: `sync()` flushes the mapping; `copy_db()`
//!   takes a consistent point-in-time copy. There is no crash atomicity.
//!
//! ## Module Overview
//!
//! - [`storage`]: memory-mapped region and on-map record layout
//! - [`index`]: exact-match indexes and their snapshot format
//! - [`bundle`]: the coordinator, locking, and public operations
//! - [`encoding`]: fixed-width little-endian integer codec

pub mod bundle;
pub mod encoding;
pub mod index;
pub mod storage;

pub use bundle::{BundleBuilder, BundleOptions, DocumentBundle};
pub use index::KeyFn;
pub use storage::{Document, DocumentView};
