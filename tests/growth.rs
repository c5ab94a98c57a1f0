//! # Growth Protocol Tests
//!
//! The region grows by a fixed chunk whenever an append would reach past
//! the mapped length, and growth must never disturb existing offsets or
//! payloads. These tests drive the protocol with a small sizing policy so
//! the thresholds are exact; one test checks the stock 1 GB policy against
//! a freshly created (sparse) file.

use bindledb::{BundleOptions, Document, DocumentBundle};
use tempfile::tempdir;

#[test]
fn fresh_bundle_gets_the_stock_initial_capacity() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bundle.bndl");

    let db = DocumentBundle::open(&path).unwrap();
    assert_eq!(db.capacity(), 1_000_000_000);
    assert_eq!(std::fs::metadata(&path).unwrap().len(), 1_000_000_000);

    let options = BundleOptions::default();
    assert_eq!(options.initial_capacity, 1_000_000_000);
    assert_eq!(options.grow_chunk, 1_000_000_000);
}

#[test]
fn append_over_the_threshold_grows_by_exactly_one_chunk() {
    let dir = tempdir().unwrap();
    let db = DocumentBundle::builder()
        .path(dir.path().join("bundle.bndl"))
        .initial_capacity(4096)
        .grow_chunk(4096)
        .open()
        .unwrap();

    // 1020-byte records: offsets 16, 1036, 2056, 3076. The fourth lands at
    // 3076 and ends at 4096, exactly reaching the mapped length, so the
    // region must grow before it is written.
    let payloads: Vec<Vec<u8>> = (0..4u8).map(|i| vec![i; 1000]).collect();

    let mut offsets = Vec::new();
    for payload in &payloads[..3] {
        offsets.push(db.put_document(&Document::new(payload.clone())).unwrap());
    }
    assert_eq!(offsets, vec![16, 1036, 2056]);
    assert_eq!(db.capacity(), 4096);

    let off4 = db.put_document(&Document::new(payloads[3].clone())).unwrap();
    assert_eq!(off4, 3076);
    assert_eq!(db.capacity(), 8192);

    // Prior offsets and payloads are untouched by the remap.
    for (off, payload) in offsets.iter().zip(&payloads) {
        assert_eq!(&db.get_document_at(*off).payload, payload);
    }
    assert_eq!(db.get_document_at(off4).payload, payloads[3]);
    assert_eq!(db.first_doc_offset(), 16);
    assert_eq!(db.last_doc_offset(), 3076);
}

#[test]
fn oversized_first_append_grows_until_it_fits() {
    let dir = tempdir().unwrap();
    let db = DocumentBundle::builder()
        .path(dir.path().join("bundle.bndl"))
        .initial_capacity(4096)
        .grow_chunk(4096)
        .open()
        .unwrap();

    // One record larger than a whole chunk: 16 + 10020 needs three chunks.
    let payload = vec![0xABu8; 10_000];
    let off = db.put_document(&Document::new(payload.clone())).unwrap();

    assert_eq!(off, 16);
    assert_eq!(db.capacity(), 12288);
    assert_eq!(db.get_document_at(off).payload, payload);
}

#[test]
fn growth_after_compaction_restarts_from_the_shrunk_size() {
    let dir = tempdir().unwrap();
    let db = DocumentBundle::builder()
        .path(dir.path().join("bundle.bndl"))
        .initial_capacity(4096)
        .grow_chunk(4096)
        .open()
        .unwrap();

    db.put_document(&Document::new(b"sole record")).unwrap();
    db.compact().unwrap();
    let compacted = db.capacity();
    assert_eq!(compacted, 16 + 20 + 11);

    // The next append cannot fit in the exactly-sized file.
    db.put_document(&Document::new(b"second record")).unwrap();
    assert_eq!(db.capacity(), compacted + 4096);
}
