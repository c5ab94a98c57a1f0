//! # Bulk Operations
//!
//! Higher-order wrappers over the `do_` layer: predicate-driven scans of
//! the whole list, and index-accelerated bulk replace/remove. Each wrapper
//! acquires its lock once, so a bulk mutation is atomic with respect to
//! readers and other writers.
//!
//! The callbacks run under the bundle's lock and must not call back into
//! the bundle.

use eyre::Result;

use crate::storage::Document;

use super::DocumentBundle;

impl DocumentBundle {
    /// Returns a copy of every document whose payload satisfies `filter`,
    /// scanning the whole bundle in insertion order.
    pub fn get_documents(&self, filter: impl Fn(&[u8]) -> bool) -> Vec<Document> {
        let mut docs = Vec::new();
        self.for_each_document_read_only(|_off, view| {
            if filter(view.payload) {
                docs.push(view.to_document());
            }
        });
        docs
    }

    /// Removes every document whose payload satisfies `filter`. Returns the
    /// number of documents removed.
    pub fn remove_documents(&self, filter: impl Fn(&[u8]) -> bool) -> u64 {
        let mut inner = self.inner().write();
        let mut removed = 0;

        let mut pos = inner.first_off();
        while pos != 0 {
            let (next, matched) = {
                let view = inner.do_get_at(pos);
                (view.next_off, filter(view.payload))
            };
            if matched {
                inner.do_remove_at(pos);
                removed += 1;
            }
            pos = next;
        }

        removed
    }

    /// Runs `replacer` over every document payload; where it returns a new
    /// payload, replaces the document. Returns the number replaced.
    ///
    /// Traverses in reverse: a replacement that no longer fits in place is
    /// appended at the end of the list, and a forward scan would walk into
    /// its own output.
    pub fn replace_documents(
        &self,
        replacer: impl Fn(&[u8]) -> Option<Vec<u8>>,
    ) -> Result<u64> {
        let mut inner = self.inner().write();
        let mut replaced = 0;

        let mut pos = inner.last_off();
        while pos != 0 {
            let (prev, replacement) = {
                let view = inner.do_get_at(pos);
                (view.prev_off, replacer(view.payload))
            };
            if let Some(payload) = replacement {
                inner.do_replace(pos, &payload)?;
                replaced += 1;
            }
            pos = prev;
        }

        Ok(replaced)
    }

    /// Removes every document under `key` in the named index whose payload
    /// satisfies `filter`. Returns the number removed. An unknown index
    /// name removes nothing.
    pub fn remove_documents_where(
        &self,
        index: &str,
        key: &[u8],
        filter: impl Fn(&[u8]) -> bool,
    ) -> u64 {
        let mut inner = self.inner().write();
        let Some(idx) = inner.indexes().get(index) else {
            return 0;
        };
        // Snapshot the bucket: removal swap-removes entries out from under
        // a live iterator.
        let offsets: Vec<u64> = idx.offsets(key).to_vec();

        let mut removed = 0;
        for off in offsets {
            let matched = {
                let view = inner.do_get_at(off);
                filter(view.payload)
            };
            if matched {
                inner.do_remove_at(off);
                removed += 1;
            }
        }
        removed
    }

    /// Runs `replacer` over every document under `key` in the named index;
    /// where it returns a new payload, replaces the document. Returns the
    /// number replaced. An unknown index name replaces nothing.
    pub fn replace_documents_where(
        &self,
        index: &str,
        key: &[u8],
        replacer: impl Fn(&[u8]) -> Option<Vec<u8>>,
    ) -> Result<u64> {
        let mut inner = self.inner().write();
        let Some(idx) = inner.indexes().get(index) else {
            return Ok(0);
        };
        let offsets: Vec<u64> = idx.offsets(key).to_vec();

        let mut replaced = 0;
        for off in offsets {
            let replacement = {
                let view = inner.do_get_at(off);
                replacer(view.payload)
            };
            if let Some(payload) = replacement {
                inner.do_replace(off, &payload)?;
                replaced += 1;
            }
        }
        Ok(replaced)
    }
}
