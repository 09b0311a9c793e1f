//! # Dpac Core
//!
//! Core components for the Dpac archive library.
//!
//! This crate provides the building blocks the container and codec layers
//! are assembled from:
//!
//! - [`stream`]: the [`ReadStream`]/[`WriteStream`] traits — big-endian
//!   typed accessors, length-prefixed strings, bounds-checked seek/skip —
//!   plus the in-memory [`MemoryStream`]
//! - [`file`]: windowed file-backed streams ([`FileReadStream`],
//!   [`FileWriteStream`])
//! - [`codec`]: streaming [`Compressor`]/[`Decompressor`] traits
//! - [`entry`]: archive entry metadata
//! - [`error`]: error types
//!
//! ## Architecture
//!
//! Dpac is a layered stack:
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ CLI (dpac-cli)                               │
//! ├──────────────────────────────────────────────┤
//! │ Container (dpac-archive)                     │
//! │     ArchiveWriter / ArchiveReader            │
//! ├──────────────────────────────────────────────┤
//! │ Codec adapters (dpac-deflate)                │
//! │     DeflateStream / InflateStream            │
//! ├──────────────────────────────────────────────┤
//! │ Stream primitives (this crate)               │
//! │     ReadStream/WriteStream, windowed files   │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use dpac_core::stream::{MemoryStream, ReadStream, Stream, WriteStream};
//!
//! let mut stream = MemoryStream::new();
//! stream.write_string("/textures/grass.png").unwrap();
//! stream.write_u64(4096).unwrap();
//!
//! stream.seek(0).unwrap();
//! assert_eq!(stream.read_string().unwrap(), "/textures/grass.png");
//! assert_eq!(stream.read_u64().unwrap(), 4096);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod codec;
pub mod entry;
pub mod error;
pub mod file;
pub mod stream;

// Re-exports for convenience
pub use codec::{CompressStatus, Compressor, DecompressStatus, Decompressor, FlushMode};
pub use entry::Entry;
pub use error::{DpacError, Result};
pub use file::{FileReadStream, FileWriteStream};
pub use stream::{MemoryStream, ReadStream, Stream, Transfer, WriteStream};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::codec::{Compressor, Decompressor, FlushMode};
    pub use crate::entry::Entry;
    pub use crate::error::{DpacError, Result};
    pub use crate::file::{FileReadStream, FileWriteStream};
    pub use crate::stream::{MemoryStream, ReadStream, Stream, Transfer, WriteStream};
}
