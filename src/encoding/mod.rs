//! # Encoding Module
//!
//! Fixed-width integer encoding for the on-map record layout and the index
//! snapshot framing. All multi-byte values in BindleDB files are
//! little-endian.

pub mod fixed;

pub use fixed::{get_u32, get_u64, put_u32, put_u64};
