//! # Bundle Builder
//!
//! Configuration for opening a bundle. The defaults reproduce the stock
//! sizing policy exactly (1 GB initial capacity, 1 GB grow chunks) and are
//! deliberately coarse: growth means an unmap/truncate/remap cycle, so it
//! should be rare. The knobs exist for embedders with tighter disk limits
//! and for exercising the growth protocol without gigabyte files.

use std::path::{Path, PathBuf};

use eyre::{bail, ensure, Result};

use crate::storage::{GROW_CHUNK, INITIAL_CAPACITY, REGION_HEADER_SIZE};

use super::DocumentBundle;

/// Sizing policy for a bundle's backing file.
#[derive(Debug, Clone)]
pub struct BundleOptions {
    /// Capacity given to a freshly created backing file.
    pub initial_capacity: u64,
    /// Bytes added to the backing file on each grow event.
    pub grow_chunk: u64,
}

impl Default for BundleOptions {
    fn default() -> Self {
        Self {
            initial_capacity: INITIAL_CAPACITY,
            grow_chunk: GROW_CHUNK,
        }
    }
}

/// Builder for configuring and opening a [`DocumentBundle`].
///
/// Use `DocumentBundle::builder()`, chain the configuration methods, then
/// call `open()`.
#[derive(Debug, Default)]
pub struct BundleBuilder {
    path: Option<PathBuf>,
    initial_capacity: Option<u64>,
    grow_chunk: Option<u64>,
}

impl BundleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the backing file path. Required.
    pub fn path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Overrides the capacity given to a freshly created backing file.
    /// Ignored when the file already holds a store.
    pub fn initial_capacity(mut self, bytes: u64) -> Self {
        self.initial_capacity = Some(bytes);
        self
    }

    /// Overrides the number of bytes added on each grow event.
    pub fn grow_chunk(mut self, bytes: u64) -> Self {
        self.grow_chunk = Some(bytes);
        self
    }

    pub fn open(self) -> Result<DocumentBundle> {
        let Some(path) = self.path else {
            bail!("bundle builder requires a path");
        };

        let options = BundleOptions {
            initial_capacity: self.initial_capacity.unwrap_or(INITIAL_CAPACITY),
            grow_chunk: self.grow_chunk.unwrap_or(GROW_CHUNK),
        };

        ensure!(
            options.initial_capacity >= REGION_HEADER_SIZE,
            "initial capacity {} is smaller than the region header ({} bytes)",
            options.initial_capacity,
            REGION_HEADER_SIZE
        );
        ensure!(options.grow_chunk > 0, "grow chunk must be non-zero");

        DocumentBundle::open_with(path, options)
    }
}
