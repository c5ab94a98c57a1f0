//! # Index Snapshot Format
//!
//! Serializes the installed indexes to a single file and restores them from
//! it. Key functions are not serializable; a snapshot stores only names,
//! keys, and offset lists, and the caller re-supplies the bindings on load.
//!
//! ## File Format
//!
//! A snapshot is a sequence of per-index records:
//!
//! ```text
//! u64  record_len     bytes in the record body following this field
//! --- record body ---
//! u32  name_len
//! ...  name bytes (UTF-8)
//! then, repeated until the body is exhausted:
//!   u32  key_len
//!   u32  offsets_len  byte length of the offsets array (8 x count)
//!   ...  key bytes
//!   ...  offsets, little-endian u64 each
//! ```
//!
//! All integers little-endian. The record length makes each index
//! skippable without parsing its body, which is what lets a load ignore
//! records the caller supplied no key function for.
//!
//! ## Consistency
//!
//! A snapshot is best-effort and never written atomically. Offsets in a
//! snapshot are only meaningful against the data file as it existed while
//! the snapshot was taken under the same lock guard; `copy_db` produces
//! such a pair.

use std::fs;
use std::path::Path;

use eyre::{ensure, Result, WrapErr};
use hashbrown::HashMap;
use tracing::{debug, warn};

use crate::encoding::{get_u32, get_u64, put_u32, put_u64};

use super::{Index, IndexSet, KeyFn};

/// Writes every installed index to `path`, replacing any existing snapshot.
pub fn dump(indexes: &IndexSet, path: &Path) -> Result<()> {
    let mut out = Vec::new();

    for (name, index) in indexes.iter() {
        out.extend_from_slice(&encode_record(name, index));
    }

    fs::write(path, &out)
        .wrap_err_with(|| format!("failed to write index snapshot '{}'", path.display()))?;

    debug!(
        path = %path.display(),
        indexes = indexes.len(),
        bytes = out.len(),
        "dumped index snapshot"
    );

    Ok(())
}

/// Reads the snapshot at `path` and returns an `Index` for every record
/// whose name has a key-function binding. Records without a binding are
/// skipped; their offsets cannot be maintained without the function.
pub fn load(path: &Path, bindings: &HashMap<String, KeyFn>) -> Result<Vec<(String, Index)>> {
    let raw = fs::read(path)
        .wrap_err_with(|| format!("failed to read index snapshot '{}'", path.display()))?;

    let mut loaded = Vec::new();
    let mut cursor = 0usize;

    while cursor < raw.len() {
        ensure!(
            cursor + 8 <= raw.len(),
            "truncated index snapshot '{}': record length at byte {} runs past the end",
            path.display(),
            cursor
        );
        let record_len = get_u64(&raw, cursor) as usize;
        cursor += 8;
        ensure!(
            cursor + record_len <= raw.len(),
            "truncated index snapshot '{}': record body of {} bytes at byte {} runs past the end",
            path.display(),
            record_len,
            cursor
        );

        let body = &raw[cursor..cursor + record_len];
        cursor += record_len;

        let (name, buckets) = decode_record(body, path)?;
        match bindings.get(&name) {
            Some(key_fn) => {
                let mut index = Index::new(key_fn.clone());
                for (key, offsets) in buckets {
                    index.restore_bucket(key, offsets);
                }
                debug!(index = %name, "loaded index from snapshot");
                loaded.push((name, index));
            }
            None => {
                warn!(index = %name, "skipping snapshot record with no key-function binding");
            }
        }
    }

    Ok(loaded)
}

fn encode_record(name: &str, index: &Index) -> Vec<u8> {
    let mut body_len = 4 + name.len();
    for (key, offsets) in index.buckets() {
        body_len += 4 + 4 + key.len() + 8 * offsets.len();
    }

    let mut out = vec![0u8; 8 + body_len];
    put_u64(&mut out, 0, body_len as u64);
    let mut cursor = 8;

    put_u32(&mut out, cursor, name.len() as u32);
    cursor += 4;
    out[cursor..cursor + name.len()].copy_from_slice(name.as_bytes());
    cursor += name.len();

    for (key, offsets) in index.buckets() {
        put_u32(&mut out, cursor, key.len() as u32);
        put_u32(&mut out, cursor + 4, (8 * offsets.len()) as u32);
        cursor += 8;
        out[cursor..cursor + key.len()].copy_from_slice(key);
        cursor += key.len();
        for &off in offsets {
            put_u64(&mut out, cursor, off);
            cursor += 8;
        }
    }

    debug_assert_eq!(cursor, out.len());
    out
}

type Buckets = Vec<(Vec<u8>, Vec<u64>)>;

fn decode_record(body: &[u8], path: &Path) -> Result<(String, Buckets)> {
    ensure!(
        body.len() >= 4,
        "corrupt index snapshot '{}': record body shorter than its name length",
        path.display()
    );
    let name_len = get_u32(body, 0) as usize;
    ensure!(
        4 + name_len <= body.len(),
        "corrupt index snapshot '{}': index name of {} bytes runs past its record",
        path.display(),
        name_len
    );
    let name = std::str::from_utf8(&body[4..4 + name_len])
        .wrap_err_with(|| format!("corrupt index snapshot '{}': index name is not UTF-8", path.display()))?
        .to_string();

    let mut buckets = Vec::new();
    let mut cursor = 4 + name_len;

    while cursor < body.len() {
        ensure!(
            cursor + 8 <= body.len(),
            "corrupt index snapshot '{}': bucket header in index '{}' runs past its record",
            path.display(),
            name
        );
        let key_len = get_u32(body, cursor) as usize;
        let offsets_len = get_u32(body, cursor + 4) as usize;
        cursor += 8;

        ensure!(
            offsets_len % 8 == 0,
            "corrupt index snapshot '{}': offsets array of {} bytes in index '{}' is not a multiple of 8",
            path.display(),
            offsets_len,
            name
        );
        ensure!(
            cursor + key_len + offsets_len <= body.len(),
            "corrupt index snapshot '{}': bucket in index '{}' runs past its record",
            path.display(),
            name
        );

        let key = body[cursor..cursor + key_len].to_vec();
        cursor += key_len;

        let mut offsets = Vec::with_capacity(offsets_len / 8);
        for _ in 0..offsets_len / 8 {
            offsets.push(get_u64(body, cursor));
            cursor += 8;
        }

        buckets.push((key, offsets));
    }

    Ok((name, buckets))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tempfile::tempdir;

    use super::*;

    fn first_two() -> KeyFn {
        Arc::new(|payload: &[u8]| payload[..2].to_vec())
    }

    fn bindings(names: &[&str]) -> HashMap<String, KeyFn> {
        names
            .iter()
            .map(|name| (name.to_string(), first_two()))
            .collect()
    }

    #[test]
    fn dump_then_load_round_trips_buckets() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("indexes.snap");

        let mut set = IndexSet::new();
        let mut idx = Index::new(first_two());
        idx.insert(b"aardvark", 16);
        idx.insert(b"aaron", 53);
        idx.insert(b"badger", 92);
        set.install("ftb", idx);

        dump(&set, &path).unwrap();

        let loaded = load(&path, &bindings(&["ftb"])).unwrap();
        assert_eq!(loaded.len(), 1);
        let (name, index) = &loaded[0];
        assert_eq!(name, "ftb");

        let mut aa = index.offsets(b"aa").to_vec();
        aa.sort_unstable();
        assert_eq!(aa, vec![16, 53]);
        assert_eq!(index.offsets(b"ba"), &[92]);
    }

    #[test]
    fn load_skips_records_without_a_binding() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("indexes.snap");

        let mut set = IndexSet::new();
        let mut known = Index::new(first_two());
        known.insert(b"known", 16);
        set.install("known", known);
        let mut orphan = Index::new(first_two());
        orphan.insert(b"orphan", 53);
        set.install("orphan", orphan);

        dump(&set, &path).unwrap();

        let loaded = load(&path, &bindings(&["known"])).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].0, "known");
    }

    #[test]
    fn empty_snapshot_loads_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("indexes.snap");

        dump(&IndexSet::new(), &path).unwrap();
        let loaded = load(&path, &bindings(&["any"])).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn truncated_snapshot_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("indexes.snap");

        let mut set = IndexSet::new();
        let mut idx = Index::new(first_two());
        idx.insert(b"aardvark", 16);
        set.install("ftb", idx);
        dump(&set, &path).unwrap();

        let raw = fs::read(&path).unwrap();
        fs::write(&path, &raw[..raw.len() - 3]).unwrap();

        assert!(load(&path, &bindings(&["ftb"])).is_err());
    }
}
