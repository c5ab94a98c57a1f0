//! # Bundle Module
//!
//! The coordinator layer: `DocumentBundle` owns the mapped region and the
//! index set behind one reader-writer lock and exposes the public API.
//!
//! ## Layering
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ DocumentBundle (bundle.rs, crud.rs)          │  locking, public API
//! ├─────────────────────────────────────────────┤
//! │ BundleInner do_ layer (inner.rs, compact.rs) │  list engine, no locks
//! ├─────────────────────────────────────────────┤
//! │ MappedRegion + layout (storage)              │  bytes on the mapping
//! └─────────────────────────────────────────────┘
//! ```
//!
//! The `do_` layer assumes its caller holds the right lock and never
//! re-acquires, which is what lets compound operations (replace, bulk
//! scans, compaction) run atomically under a single acquisition.

mod builder;
#[allow(clippy::module_inception)]
mod bundle;
mod compact;
mod crud;
mod inner;

pub use builder::{BundleBuilder, BundleOptions};
pub use bundle::DocumentBundle;

pub(crate) use inner::BundleInner;
