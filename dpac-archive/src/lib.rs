//! # Dpac Archive
//!
//! The append-only offset-indexed archive container.
//!
//! An archive file is three regions, in file order:
//!
//! ```text
//! [0, 8)              header: big-endian u64 heap start
//! [8, heapStart)      entry table: (string name, u64 heap-relative offset) records
//! [heapStart, EOF)    heap: entry contents, contiguous, in offset order
//! ```
//!
//! Entry sizes are never stored. Because the heap is contiguous, each
//! entry's length is the distance to the next entry's offset (the last one
//! runs to end of file), so the table stays compact and the format has no
//! per-entry framing to keep consistent.
//!
//! Writing is two-phase: declare every entry with its length, finalize the
//! table, then populate contents in any order. [`ArchiveWriter`] enforces
//! the phases. [`ArchiveReader`] parses and validates the table once at
//! open time and hands out an isolated windowed stream per entry.
//!
//! ## Example
//!
//! ```rust
//! use dpac_archive::{ArchiveReader, ArchiveWriter};
//! use dpac_core::stream::ReadStream;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let path = dir.path().join("assets.dpac");
//!
//! let mut writer = ArchiveWriter::create(&path).unwrap();
//! writer.declare_entry("/hello.txt", 5).unwrap();
//! writer.finalize().unwrap();
//! writer.populate_entry_bytes("/hello.txt", b"hello").unwrap();
//! writer.close().unwrap();
//!
//! let reader = ArchiveReader::open(&path).unwrap();
//! assert_eq!(reader.entry_bytes("/hello.txt").unwrap(), b"hello");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod reader;
pub mod writer;

pub use reader::{ArchiveReader, HEADER_LEN};
pub use writer::ArchiveWriter;

pub use dpac_core::entry::Entry;
