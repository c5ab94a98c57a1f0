//! # Indexing Module
//!
//! Named, in-memory, exact-match secondary indexes over payload-derived
//! keys. An index pairs a caller-supplied key function with a lookup table
//! from key bytes to the offsets of every live document producing that key.
//!
//! ## Key Domain
//!
//! Keys are byte strings. The key function is deterministic, owns no
//! reference back into the bundle, and is never serialized: a snapshot
//! stores only names, keys, and offsets, and the caller re-supplies the
//! functions on load.
//!
//! ## Consistency Contract
//!
//! The bundle drives the two hooks below around every mutation:
//!
//! - `insert_document` after a record is written at its final offset,
//! - `remove_document` before a record is unlinked or overwritten in place.
//!
//! Between public operations, every index bucket holds exactly the offsets
//! of the live documents whose key matches, no more and no fewer.
//!
//! ## Bucket Maintenance
//!
//! Removal swap-removes the offset from its bucket: the matching entry is
//! overwritten with the tail and the bucket shortened. O(bucket length),
//! no reallocation, no promise of bucket order.

pub mod snapshot;

use std::sync::Arc;

use hashbrown::HashMap;
use smallvec::SmallVec;

/// Derives the index key from a document payload.
pub type KeyFn = Arc<dyn Fn(&[u8]) -> Vec<u8> + Send + Sync>;

type Bucket = SmallVec<[u64; 4]>;

pub struct Index {
    key_fn: KeyFn,
    lookup: HashMap<Vec<u8>, Bucket>,
}

impl std::fmt::Debug for Index {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Index")
            .field("keys", &self.lookup.len())
            .finish_non_exhaustive()
    }
}

impl Index {
    pub fn new(key_fn: KeyFn) -> Self {
        Self {
            key_fn,
            lookup: HashMap::new(),
        }
    }

    pub fn key_fn(&self) -> &KeyFn {
        &self.key_fn
    }

    /// Offsets of every live document whose key equals `key`.
    pub fn offsets(&self, key: &[u8]) -> &[u64] {
        self.lookup.get(key).map_or(&[], |bucket| bucket.as_slice())
    }

    pub fn insert(&mut self, payload: &[u8], off: u64) {
        let key = (self.key_fn)(payload);
        self.lookup.entry(key).or_default().push(off);
    }

    pub fn remove(&mut self, payload: &[u8], off: u64) {
        let key = (self.key_fn)(payload);
        if let Some(bucket) = self.lookup.get_mut(&key) {
            if let Some(pos) = bucket.iter().position(|&o| o == off) {
                bucket.swap_remove(pos);
            }
        }
    }

    pub fn clear(&mut self) {
        self.lookup.clear();
    }

    /// Iterates every (key, offsets) bucket, in no particular order.
    pub fn buckets(&self) -> impl Iterator<Item = (&[u8], &[u64])> {
        self.lookup
            .iter()
            .map(|(key, bucket)| (key.as_slice(), bucket.as_slice()))
    }

    pub(crate) fn restore_bucket(&mut self, key: Vec<u8>, offsets: Vec<u64>) {
        self.lookup.insert(key, Bucket::from_vec(offsets));
    }
}

/// The set of installed indexes, keyed by name.
#[derive(Debug, Default)]
pub struct IndexSet {
    indexes: HashMap<String, Index>,
}

impl IndexSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `index` under `name`, replacing any previous index of the
    /// same name.
    pub fn install(&mut self, name: impl Into<String>, index: Index) {
        self.indexes.insert(name.into(), index);
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.indexes.remove(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&Index> {
        self.indexes.get(name)
    }

    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Index)> {
        self.indexes.iter().map(|(name, idx)| (name.as_str(), idx))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Index)> {
        self.indexes
            .iter_mut()
            .map(|(name, idx)| (name.as_str(), idx))
    }

    /// Records `off` under `payload`'s key in every installed index.
    pub fn insert_document(&mut self, payload: &[u8], off: u64) {
        for idx in self.indexes.values_mut() {
            idx.insert(payload, off);
        }
    }

    /// Erases `off` from `payload`'s key bucket in every installed index.
    pub fn remove_document(&mut self, payload: &[u8], off: u64) {
        for idx in self.indexes.values_mut() {
            idx.remove(payload, off);
        }
    }

    /// Empties every index's lookup, keeping names and key functions.
    pub fn clear_lookups(&mut self) {
        for idx in self.indexes.values_mut() {
            idx.clear();
        }
    }
}
