//! # List Engine
//!
//! The lock-free inner layer of the bundle: every operation here assumes the
//! coordinator already holds the appropriate lock and never re-acquires.
//! The `do_` prefix marks that contract; it is what lets compound operations
//! (replace = remove + put) stay atomic under one exclusive acquisition.
//!
//! ## List Invariants
//!
//! The live documents form a doubly-linked list of absolute offsets:
//!
//! - `first_off == 0` iff `last_off == 0` iff the list is empty,
//! - the first document's `prev_off` and the last document's `next_off`
//!   are 0,
//! - neighbors point at each other, the list is acyclic, and every record
//!   lies in `[16, region len)` without overlapping another live record.
//!
//! Every mutation below preserves all of these. Removal leaves the record's
//! bytes in place as dead space; only compaction reclaims it.
//!
//! ## Growth
//!
//! Appends grow the region while the insertion point plus the new record
//! would reach past the mapped length, one chunk per iteration. Offsets are
//! stable across growth (contents are preserved by the remap) and until the
//! next compaction.

use eyre::Result;

use crate::index::IndexSet;
use crate::storage::layout::{self, DocumentView};
use crate::storage::{doc_byte_size, MappedRegion, DOC_START};

use super::BundleOptions;

pub(crate) struct BundleInner {
    pub(super) region: MappedRegion,
    pub(super) indexes: IndexSet,
    pub(super) options: BundleOptions,
}

impl BundleInner {
    pub(crate) fn new(region: MappedRegion, options: BundleOptions) -> Self {
        Self {
            region,
            indexes: IndexSet::new(),
            options,
        }
    }

    pub(crate) fn region(&self) -> &MappedRegion {
        &self.region
    }

    pub(crate) fn region_mut(&mut self) -> &mut MappedRegion {
        &mut self.region
    }

    pub(crate) fn indexes(&self) -> &IndexSet {
        &self.indexes
    }

    pub(crate) fn indexes_mut(&mut self) -> &mut IndexSet {
        &mut self.indexes
    }

    pub(crate) fn first_off(&self) -> u64 {
        layout::first_off(self.region.bytes())
    }

    pub(crate) fn last_off(&self) -> u64 {
        layout::last_off(self.region.bytes())
    }

    /// Reads the record at `off`. Panics if `off` is not a live-document
    /// offset produced by this bundle.
    pub(crate) fn do_get_at(&self, off: u64) -> DocumentView<'_> {
        layout::document_at(self.region.bytes(), off)
    }

    fn do_grow(&mut self) -> Result<()> {
        self.region.grow(self.options.grow_chunk)
    }

    /// Appends a record holding `payload` at the end of the list and
    /// returns its offset. Grows the region as needed.
    pub(crate) fn do_put(&mut self, payload: &[u8]) -> Result<u64> {
        let size = doc_byte_size(payload.len());
        let last = self.last_off();

        if last == 0 {
            while DOC_START + size >= self.region.len() {
                self.do_grow()?;
            }
            let bytes = self.region.bytes_mut();
            layout::write_document(bytes, DOC_START, payload, 0, 0);
            layout::set_first_off(bytes, DOC_START);
            layout::set_last_off(bytes, DOC_START);
            self.index_document_at(DOC_START);
            return Ok(DOC_START);
        }

        let insert = last + self.do_get_at(last).byte_size();
        while insert + size >= self.region.len() {
            self.do_grow()?;
        }

        let bytes = self.region.bytes_mut();
        layout::write_document(bytes, insert, payload, 0, last);
        layout::set_next_off(bytes, last, insert);
        layout::set_last_off(bytes, insert);
        self.index_document_at(insert);
        Ok(insert)
    }

    /// Unlinks the record at `off`. Its bytes become dead space.
    pub(crate) fn do_remove_at(&mut self, off: u64) {
        let (prev, next) = {
            let doc = self.do_get_at(off);
            (doc.prev_off, doc.next_off)
        };

        self.deindex_document_at(off);

        let bytes = self.region.bytes_mut();
        if prev != 0 {
            layout::set_next_off(bytes, prev, next);
        } else {
            layout::set_first_off(bytes, next);
        }
        if next != 0 {
            layout::set_prev_off(bytes, next, prev);
        } else {
            layout::set_last_off(bytes, prev);
        }
    }

    /// Replaces the record at `off` with one holding `payload`.
    ///
    /// Overwrites in place when a successor exists and the new record ends
    /// strictly before it (the successor's header starts exactly at
    /// `next_off`, so equality would make the records touch). Otherwise
    /// falls back to unlink-and-append. Returns the record's offset, which
    /// only equals `off` on the in-place path.
    pub(crate) fn do_replace(&mut self, off: u64, payload: &[u8]) -> Result<u64> {
        let size = doc_byte_size(payload.len());
        let (next, prev) = {
            let cur = self.do_get_at(off);
            (cur.next_off, cur.prev_off)
        };

        if next != 0 && off + size < next {
            // The old payload must leave the indexes before its bytes are
            // overwritten; afterwards the key cannot be recomputed.
            self.deindex_document_at(off);
            layout::write_document(self.region.bytes_mut(), off, payload, next, prev);
            self.index_document_at(off);
            return Ok(off);
        }

        self.do_remove_at(off);
        self.do_put(payload)
    }

    /// Visits every live `(offset, record)` pair in list order.
    pub(crate) fn do_for_each(&self, mut visitor: impl FnMut(u64, DocumentView<'_>)) {
        let bytes = self.region.bytes();
        let mut pos = layout::first_off(bytes);
        while pos != 0 {
            let view = layout::document_at(bytes, pos);
            let next = view.next_off;
            visitor(pos, view);
            pos = next;
        }
    }

    fn index_document_at(&mut self, off: u64) {
        let Self {
            region, indexes, ..
        } = self;
        if !indexes.is_empty() {
            let view = layout::document_at(region.bytes(), off);
            indexes.insert_document(view.payload, off);
        }
    }

    fn deindex_document_at(&mut self, off: u64) {
        let Self {
            region, indexes, ..
        } = self;
        if !indexes.is_empty() {
            let view = layout::document_at(region.bytes(), off);
            indexes.remove_document(view.payload, off);
        }
    }
}
