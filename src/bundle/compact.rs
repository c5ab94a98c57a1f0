//! # Compaction
//!
//! Compaction copies every live record down into a dense layout starting at
//! offset 16, patches the list pointers pairwise, shrinks the backing file
//! to exactly the live size, and rebuilds every index from scratch.
//!
//! Appends only ever land past the current last record and removal never
//! moves anything, so list order and address order always agree; each
//! relocation therefore copies a record backwards (or not at all), and the
//! source range of one step never overlaps the destination of a later one.
//! A single record's source and destination CAN overlap (the first record
//! sliding down to 16, or a record sliding over a small hole), which is why
//! the copies go through `copy_within` (memmove semantics).
//!
//! Offsets are stable only between compactions: every relocated record gets
//! a new offset, and no offset handed out before a compaction is valid
//! afterwards. Callers that persist offsets externally must re-derive them.

use eyre::Result;
use tracing::info;

use crate::storage::{layout, DOC_START, EMPTY_COMPACTED_SIZE};

use super::BundleInner;

impl BundleInner {
    /// Compacts the region. Caller holds the exclusive lock.
    pub(crate) fn do_compact(&mut self) -> Result<()> {
        self.indexes_mut().clear_lookups();

        let old_len = self.region().len();
        let first = self.first_off();

        if first == 0 {
            self.region_mut().remap(EMPTY_COMPACTED_SIZE)?;
            info!(
                old_len,
                new_len = EMPTY_COMPACTED_SIZE,
                "compacted empty bundle"
            );
            return Ok(());
        }

        let bytes = self.region_mut().bytes_mut();
        let mut relocated = 0u64;

        let (mut cur_size, mut cur_next) = {
            let view = layout::document_at(bytes, first);
            (view.byte_size(), view.next_off)
        };
        let mut cur_off = first;

        if first != DOC_START {
            bytes.copy_within(first as usize..(first + cur_size) as usize, DOC_START as usize);
            layout::set_first_off(bytes, DOC_START);
            cur_off = DOC_START;
            relocated += 1;
            // The successor's back-pointer is patched in the loop below.
        }

        while cur_next != 0 {
            let (next_size, next_next) = {
                let view = layout::document_at(bytes, cur_next);
                (view.byte_size(), view.next_off)
            };
            let insert = cur_off + cur_size;

            if insert != cur_next {
                bytes.copy_within(
                    cur_next as usize..(cur_next + next_size) as usize,
                    insert as usize,
                );
                relocated += 1;
            }
            layout::set_next_off(bytes, cur_off, insert);
            layout::set_prev_off(bytes, insert, cur_off);

            cur_off = insert;
            cur_size = next_size;
            cur_next = next_next;
        }

        layout::set_last_off(bytes, cur_off);
        let new_len = cur_off + cur_size;

        self.region_mut().remap(new_len)?;
        self.rebuild_indexes();

        info!(old_len, new_len, relocated, "compacted bundle");
        Ok(())
    }

    fn rebuild_indexes(&mut self) {
        let Self {
            region, indexes, ..
        } = self;
        if indexes.is_empty() {
            return;
        }

        let bytes = region.bytes();
        let mut pos = layout::first_off(bytes);
        while pos != 0 {
            let view = layout::document_at(bytes, pos);
            indexes.insert_document(view.payload, pos);
            pos = view.next_off;
        }
    }
}
