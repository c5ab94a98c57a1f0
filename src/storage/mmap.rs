//! # Memory-Mapped Region
//!
//! `MappedRegion` owns the backing file and its read-write shared mapping.
//! It is the only component that touches the filesystem for the data file:
//! open/create, remap to a new size, and best-effort synchronous flush.
//!
//! ## Open Semantics
//!
//! Opening a path whose file is missing or shorter than the 16-byte region
//! header initializes a fresh store: the header is zeroed (empty list) and
//! the file is truncated up to the configured initial capacity. Opening an
//! existing store maps it at its current length and preserves contents.
//!
//! Truncating up-front looks wasteful but is free on every filesystem this
//! targets: the capacity beyond the written header is a hole, and pages
//! materialize only when appends touch them.
//!
//! ## Remap Protocol
//!
//! `remap` must serve both grow and shrink. Growing could truncate first and
//! map afterwards, but shrinking a file underneath a live shared mapping
//! leaves the tail of the mapping pointing at nothing; touching it faults.
//! The one sequence that is safe in both directions on every supported
//! platform is the original's: unmap, truncate, map again. The live mapping
//! is dropped by replacing it with a minimal anonymous map before `set_len`.
//!
//! Any byte reference into the region is invalidated by `remap`; the borrow
//! checker enforces this locally (`remap` takes `&mut self`) and the bundle
//! holds its exclusive lock for the full duration.
//!
//! ## Error Handling
//!
//! All fallible operations return `eyre::Result` carrying the file path and
//! the operation that failed.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use eyre::{ensure, Result, WrapErr};
use memmap2::MmapMut;
use tracing::debug;

use super::REGION_HEADER_SIZE;

#[derive(Debug)]
pub struct MappedRegion {
    file: File,
    path: PathBuf,
    mmap: MmapMut,
}

impl MappedRegion {
    /// Opens the backing file at `path`, creating and sizing it to
    /// `initial_capacity` if it does not yet hold a region header.
    pub fn open<P: AsRef<Path>>(path: P, initial_capacity: u64) -> Result<Self> {
        let path = path.as_ref();

        ensure!(
            initial_capacity >= REGION_HEADER_SIZE,
            "initial capacity {} is smaller than the region header ({} bytes)",
            initial_capacity,
            REGION_HEADER_SIZE
        );

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .wrap_err_with(|| format!("failed to open bundle file '{}'", path.display()))?;

        let metadata = file
            .metadata()
            .wrap_err_with(|| format!("failed to stat bundle file '{}'", path.display()))?;

        if metadata.len() < REGION_HEADER_SIZE {
            // Fresh store: zero the first/last pointers, then reserve room.
            file.write_all(&[0u8; REGION_HEADER_SIZE as usize])
                .wrap_err_with(|| {
                    format!("failed to initialize header of '{}'", path.display())
                })?;
            file.set_len(initial_capacity).wrap_err_with(|| {
                format!(
                    "failed to size new bundle file '{}' to {} bytes",
                    path.display(),
                    initial_capacity
                )
            })?;
        }

        // SAFETY: MmapMut::map_mut is unsafe because a memory-mapped file can
        // be modified externally, which would invalidate Rust's aliasing
        // assumptions. This is safe because:
        // 1. The bundle is a single-process store; two bundles on one file
        //    are documented as undefined behavior.
        // 2. The file is at least REGION_HEADER_SIZE bytes at this point.
        // 3. The mapping's lifetime is tied to MappedRegion, and remap()
        //    requires &mut self, so no reference outlives the mapping.
        let mmap = unsafe {
            MmapMut::map_mut(&file)
                .wrap_err_with(|| format!("failed to memory-map '{}'", path.display()))?
        };

        Ok(Self {
            file,
            path: path.to_path_buf(),
            mmap,
        })
    }

    /// Unmaps the current view, truncates the file to `new_len`, and maps it
    /// again. Contents up to `min(old_len, new_len)` are preserved.
    pub fn remap(&mut self, new_len: u64) -> Result<()> {
        ensure!(
            new_len >= REGION_HEADER_SIZE,
            "cannot remap '{}' below the region header ({} < {})",
            self.path.display(),
            new_len,
            REGION_HEADER_SIZE
        );

        let old_len = self.mmap.len() as u64;

        self.mmap
            .flush()
            .wrap_err_with(|| format!("failed to flush '{}' before remap", self.path.display()))?;

        // Drop the live file mapping before set_len: shrinking the file
        // underneath a shared mapping leaves unbacked pages that fault on
        // access. The anonymous placeholder is never read.
        self.mmap = MmapMut::map_anon(REGION_HEADER_SIZE as usize)
            .wrap_err("failed to allocate placeholder mapping during remap")?;

        self.file.set_len(new_len).wrap_err_with(|| {
            format!(
                "failed to truncate '{}' to {} bytes",
                self.path.display(),
                new_len
            )
        })?;

        // SAFETY: MmapMut::map_mut is unsafe for the same reasons as in
        // open(). This is safe because:
        // 1. The previous mapping was dropped above; no reference into it
        //    can exist since remap() holds &mut self.
        // 2. The file was truncated to new_len >= REGION_HEADER_SIZE before
        //    mapping.
        // 3. The caller holds the bundle's exclusive lock for the full
        //    grow/shrink/compact sequence.
        self.mmap = unsafe {
            MmapMut::map_mut(&self.file)
                .wrap_err_with(|| format!("failed to remap '{}'", self.path.display()))?
        };

        debug!(
            path = %self.path.display(),
            old_len,
            new_len,
            "remapped bundle file"
        );

        Ok(())
    }

    /// Grows the region by `chunk` bytes.
    pub fn grow(&mut self, chunk: u64) -> Result<()> {
        let new_len = self.mmap.len() as u64 + chunk;
        self.remap(new_len)
    }

    /// Best-effort synchronous flush of the mapped bytes.
    pub fn sync(&self) -> Result<()> {
        self.mmap
            .flush()
            .wrap_err_with(|| format!("failed to sync '{}'", self.path.display()))
    }

    pub fn len(&self) -> u64 {
        self.mmap.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.mmap.len() == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bytes(&self) -> &[u8] {
        &self.mmap
    }

    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.mmap
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn open_creates_and_sizes_fresh_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bundle.bndl");

        let region = MappedRegion::open(&path, 8192).unwrap();
        assert_eq!(region.len(), 8192);
        assert_eq!(&region.bytes()[..16], &[0u8; 16]);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 8192);
    }

    #[test]
    fn open_existing_preserves_contents_and_length() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bundle.bndl");

        {
            let mut region = MappedRegion::open(&path, 4096).unwrap();
            region.bytes_mut()[16..21].copy_from_slice(b"hello");
            region.sync().unwrap();
        }

        let region = MappedRegion::open(&path, 1 << 30).unwrap();
        assert_eq!(region.len(), 4096, "existing file must not be resized");
        assert_eq!(&region.bytes()[16..21], b"hello");
    }

    #[test]
    fn remap_grows_and_shrinks_preserving_prefix() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bundle.bndl");

        let mut region = MappedRegion::open(&path, 4096).unwrap();
        region.bytes_mut()[100..104].copy_from_slice(b"keep");

        region.remap(16384).unwrap();
        assert_eq!(region.len(), 16384);
        assert_eq!(&region.bytes()[100..104], b"keep");

        region.remap(512).unwrap();
        assert_eq!(region.len(), 512);
        assert_eq!(&region.bytes()[100..104], b"keep");
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 512);
    }

    #[test]
    fn grow_adds_exactly_one_chunk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bundle.bndl");

        let mut region = MappedRegion::open(&path, 4096).unwrap();
        region.grow(4096).unwrap();
        assert_eq!(region.len(), 8192);
    }

    #[test]
    fn remap_below_header_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bundle.bndl");

        let mut region = MappedRegion::open(&path, 4096).unwrap();
        assert!(region.remap(8).is_err());
    }
}
