//! # Bundle Coordinator
//!
//! `DocumentBundle` is the outermost object: it owns the mapped region and
//! the index set behind a single reader-writer lock, and sequences every
//! public operation through it.
//!
//! ## Locking Discipline
//!
//! Pure readers (`get_document_at`, `get_documents_where`,
//! `for_each_document_read_only`, `copy_db`) take the shared lock and run
//! in parallel. Everything that mutates region bytes, the mapping, or the
//! index set (`put`, `remove`, `replace`, index install/drop, `compact`,
//! `sync`, `load_indexes`) takes the exclusive lock. Mutations are totally
//! ordered; a reader observes a state consistent with some prefix of that
//! order.
//!
//! Only the exclusive holder may remap, so a shared guard also pins the
//! mapping: payload views handed to a traversal callback stay valid for
//! exactly the callback's lifetime, and values returned from the API are
//! owned copies.
//!
//! Caller-supplied callbacks (visitors, filters, key functions) must not
//! re-enter the bundle; the lock is not re-entrant and a nested exclusive
//! acquisition deadlocks.
//!
//! ## Durability
//!
//! There is no crash consistency. `sync` issues a best-effort synchronous
//! flush; `copy_db` writes a point-in-time copy of the region (plus,
//! optionally, an index snapshot taken under the same guard). Applications
//! needing durable checkpoints drive both at moments they define.

use std::fs;
use std::path::Path;

use eyre::{Result, WrapErr};
use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::index::{snapshot, Index, KeyFn};
use crate::storage::layout::DocumentView;
use crate::storage::{Document, MappedRegion};

use super::{BundleBuilder, BundleInner, BundleOptions};

pub struct DocumentBundle {
    inner: RwLock<BundleInner>,
}

impl DocumentBundle {
    /// Opens the bundle at `path` with the stock sizing policy, creating
    /// the backing file if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, BundleOptions::default())
    }

    pub fn open_with<P: AsRef<Path>>(path: P, options: BundleOptions) -> Result<Self> {
        let region = MappedRegion::open(path, options.initial_capacity)?;
        Ok(Self {
            inner: RwLock::new(BundleInner::new(region, options)),
        })
    }

    pub fn builder() -> BundleBuilder {
        BundleBuilder::new()
    }

    /// Appends `doc` and returns the offset at which it was inserted. The
    /// document's own link fields are ignored. The offset is stable until
    /// the next compaction.
    pub fn put_document(&self, doc: &Document) -> Result<u64> {
        self.inner.write().do_put(&doc.payload)
    }

    /// Returns a copy of the document at `offset`.
    ///
    /// Panics if `offset` is not a live-document offset produced by this
    /// bundle; such an offset means corruption or a stale caller, neither
    /// of which is recoverable.
    pub fn get_document_at(&self, offset: u64) -> Document {
        self.inner.read().do_get_at(offset).to_document()
    }

    /// Unlinks the document at `offset`. Its bytes become dead space,
    /// reclaimed by the next compaction.
    pub fn remove_document_at(&self, offset: u64) {
        self.inner.write().do_remove_at(offset);
    }

    /// Replaces the document at `offset`, in place when the new payload
    /// fits strictly ahead of the successor, otherwise by unlink-and-append.
    /// Returns the document's offset afterwards.
    pub fn replace_document(&self, offset: u64, doc: &Document) -> Result<u64> {
        self.inner.write().do_replace(offset, &doc.payload)
    }

    /// Visits every live `(offset, document)` pair in insertion order.
    ///
    /// The visitor runs under the shared lock; payload views are valid only
    /// for the duration of each call, and the visitor must not call back
    /// into the bundle.
    pub fn for_each_document_read_only(&self, visitor: impl FnMut(u64, DocumentView<'_>)) {
        self.inner.read().do_for_each(visitor);
    }

    /// Installs an exact-match index under `name`, computing keys with
    /// `key_fn` and populating it from every live document. Replaces any
    /// existing index of the same name.
    pub fn add_index(&self, name: impl Into<String>, key_fn: KeyFn) {
        let mut inner = self.inner.write();
        let mut index = Index::new(key_fn);
        inner.do_for_each(|off, view| index.insert(view.payload, off));
        inner.indexes_mut().install(name, index);
    }

    /// Drops the index under `name`. Returns whether it existed.
    pub fn remove_index(&self, name: &str) -> bool {
        self.inner.write().indexes_mut().remove(name)
    }

    /// Returns a copy of every document whose indexed key equals `key`.
    /// An unknown index name yields an empty result.
    pub fn get_documents_where(&self, name: &str, key: &[u8]) -> Vec<Document> {
        let inner = self.inner.read();
        let Some(index) = inner.indexes().get(name) else {
            return Vec::new();
        };
        index
            .offsets(key)
            .iter()
            .map(|&off| inner.do_get_at(off).to_document())
            .collect()
    }

    /// Rewrites every live document into a dense layout from offset 16,
    /// shrinks the backing file to fit, and rebuilds all indexes. All
    /// previously returned offsets are invalidated.
    pub fn compact(&self) -> Result<()> {
        self.inner.write().do_compact()
    }

    /// Best-effort synchronous flush of the mapped region.
    pub fn sync(&self) -> Result<()> {
        self.inner.write().region().sync()
    }

    /// Writes a point-in-time copy of the region to `data_path` and, when
    /// `index_path` is given, an index snapshot consistent with it.
    pub fn copy_db(&self, data_path: &Path, index_path: Option<&Path>) -> Result<()> {
        let inner = self.inner.read();
        if let Some(index_path) = index_path {
            snapshot::dump(inner.indexes(), index_path)?;
        }
        fs::write(data_path, inner.region().bytes())
            .wrap_err_with(|| format!("failed to copy bundle to '{}'", data_path.display()))
    }

    /// Writes a snapshot of every installed index to `path`.
    pub fn dump_indexes(&self, path: &Path) -> Result<()> {
        snapshot::dump(self.inner.read().indexes(), path)
    }

    /// Restores indexes from the snapshot at `path`. Only records whose
    /// name has a binding in `bindings` are installed (key functions are
    /// not serializable); each installed index replaces any same-named one.
    pub fn load_indexes(&self, bindings: &HashMap<String, KeyFn>, path: &Path) -> Result<()> {
        let mut inner = self.inner.write();
        let loaded = snapshot::load(path, bindings)?;
        for (name, index) in loaded {
            inner.indexes_mut().install(name, index);
        }
        Ok(())
    }

    /// Offset of the first live document, or 0 if the bundle is empty.
    pub fn first_doc_offset(&self) -> u64 {
        self.inner.read().first_off()
    }

    /// Offset of the last live document, or 0 if the bundle is empty.
    pub fn last_doc_offset(&self) -> u64 {
        self.inner.read().last_off()
    }

    /// Current capacity of the mapped region in bytes.
    pub fn capacity(&self) -> u64 {
        self.inner.read().region().len()
    }

    pub(super) fn inner(&self) -> &RwLock<BundleInner> {
        &self.inner
    }
}
