//! # Dpac Deflate
//!
//! Chunked deflate compression for Dpac streams.
//!
//! Two layers live here:
//!
//! - [`codec`]: [`DeflateCodec`]/[`InflateCodec`], the streaming raw-deflate
//!   contexts behind the `dpac-core` codec traits
//! - [`stream`]: [`DeflateStream`]/[`InflateStream`], stream adapters that
//!   implement the ordinary `WriteStream`/`ReadStream` contracts and drive
//!   the codec through a pair of staging buffers
//!
//! Because the adapters speak the common stream traits they compose
//! transparently with archive entry streams: a `DeflateStream` can sit
//! between a source file and an archive heap region, and an `InflateStream`
//! can wrap the windowed stream an archive hands out for one entry.
//!
//! ## Example
//!
//! ```rust
//! use dpac_core::stream::{MemoryStream, ReadStream, Stream, WriteStream};
//! use dpac_deflate::{DeflateStream, InflateStream};
//!
//! let payload = b"a payload worth compressing ".repeat(64);
//!
//! // Compress-on-write
//! let mut source = MemoryStream::from_vec(payload.clone());
//! let mut deflate = DeflateStream::new(MemoryStream::new());
//! let transfer = deflate.drain_from(&mut source).unwrap();
//! assert!(transfer.bytes_written < transfer.bytes_read);
//! let compressed = deflate.into_inner().unwrap().into_inner();
//!
//! // Decompress-on-read
//! let mut inflate = InflateStream::new(MemoryStream::from_vec(compressed));
//! let mut restored = MemoryStream::new();
//! restored.drain_from(&mut inflate).unwrap();
//! assert_eq!(restored.as_slice(), &payload[..]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod codec;
pub mod stream;

pub use codec::{DeflateCodec, InflateCodec};
pub use stream::{CHUNK_SIZE, DeflateStream, InflateStream};
