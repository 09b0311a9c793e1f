//! Error types for Dpac operations.
//!
//! All failures in the stream, archive, and codec layers surface through the
//! single [`DpacError`] enum. Errors are synchronous and never retried
//! internally; retry policy belongs to the caller.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for Dpac operations.
#[derive(Debug, Error)]
pub enum DpacError {
    /// I/O error from the backing medium.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A file could not be opened.
    #[error("Failed to open {path}: {source}")]
    OpenFailed {
        /// Path that failed to open.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// A read would cross the stream's known extent.
    #[error("Stream underflow: requested {requested} bytes, {remaining} remaining")]
    Underflow {
        /// Number of bytes requested.
        requested: usize,
        /// Number of bytes actually remaining.
        remaining: u64,
    },

    /// A write would cross a bounded stream's extent.
    #[error("Stream overflow: requested {requested} bytes, {remaining} remaining")]
    Overflow {
        /// Number of bytes the write needed.
        requested: usize,
        /// Number of bytes of room remaining.
        remaining: u64,
    },

    /// A seek or skip target lies outside the stream's bound.
    #[error("Seek target {target} outside stream of {size} bytes")]
    SeekOutOfBounds {
        /// Requested position (stream-relative).
        target: u64,
        /// The stream's bounded size.
        size: u64,
    },

    /// An entry was declared after the entry table was finalized.
    #[error("Entry table is already finalized")]
    EntryTableFinalized,

    /// An entry was populated before the entry table was finalized.
    #[error("Entry table is not yet finalized")]
    EntryTableNotFinalized,

    /// Fewer entries were declared than were reserved.
    #[error("Too few entries declared: reserved {reserved}, declared {declared}")]
    TooFewEntriesReserved {
        /// Number of entries reserved up front.
        reserved: usize,
        /// Number of entries actually declared.
        declared: usize,
    },

    /// An undeclared entry name was populated.
    #[error("Entry not defined: {name}")]
    EntryNotDefined {
        /// Name that was never declared.
        name: String,
    },

    /// A name was declared twice in the same archive.
    #[error("Entry already defined: {name}")]
    EntryAlreadyDefined {
        /// The duplicate name.
        name: String,
    },

    /// An entry was populated with a different byte count than declared.
    #[error("Entry {name}: declared {expected} bytes, populated with {actual}")]
    EntryLengthMismatch {
        /// Entry name.
        name: String,
        /// Declared content length.
        expected: u64,
        /// Bytes actually written.
        actual: u64,
    },

    /// A name was looked up that does not exist in the archive.
    #[error("Entry does not exist: {name}")]
    EntryNotFound {
        /// The missing name.
        name: String,
    },

    /// The archive header or entry table is malformed.
    #[error("Corrupted archive at offset {offset}: {message}")]
    CorruptedArchive {
        /// Byte offset where the corruption was detected.
        offset: u64,
        /// Description of the corruption.
        message: String,
    },

    /// An operation is not supported in the stream's current state,
    /// e.g. seeking a compressed stream.
    #[error("Illegal state: {message}")]
    IllegalState {
        /// Description of the violation.
        message: String,
    },

    /// Failure inside the compression codec.
    #[error("Codec error: {message}")]
    Codec {
        /// Description from the codec.
        message: String,
    },

    /// A stored string was not valid UTF-8.
    #[error("Encoding error: {message}")]
    Encoding {
        /// Description of the encoding failure.
        message: String,
    },
}

/// Result type alias for Dpac operations.
pub type Result<T> = std::result::Result<T, DpacError>;

impl DpacError {
    /// Create an open-failed error.
    pub fn open_failed(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::OpenFailed {
            path: path.into(),
            source,
        }
    }

    /// Create an underflow error.
    pub fn underflow(requested: usize, remaining: u64) -> Self {
        Self::Underflow {
            requested,
            remaining,
        }
    }

    /// Create an overflow error.
    pub fn overflow(requested: usize, remaining: u64) -> Self {
        Self::Overflow {
            requested,
            remaining,
        }
    }

    /// Create a seek-out-of-bounds error.
    pub fn seek_out_of_bounds(target: u64, size: u64) -> Self {
        Self::SeekOutOfBounds { target, size }
    }

    /// Create an entry-not-defined error.
    pub fn entry_not_defined(name: impl Into<String>) -> Self {
        Self::EntryNotDefined { name: name.into() }
    }

    /// Create an entry-already-defined error.
    pub fn entry_already_defined(name: impl Into<String>) -> Self {
        Self::EntryAlreadyDefined { name: name.into() }
    }

    /// Create an entry-length-mismatch error.
    pub fn length_mismatch(name: impl Into<String>, expected: u64, actual: u64) -> Self {
        Self::EntryLengthMismatch {
            name: name.into(),
            expected,
            actual,
        }
    }

    /// Create an entry-not-found error.
    pub fn entry_not_found(name: impl Into<String>) -> Self {
        Self::EntryNotFound { name: name.into() }
    }

    /// Create a corrupted-archive error.
    pub fn corrupted(offset: u64, message: impl Into<String>) -> Self {
        Self::CorruptedArchive {
            offset,
            message: message.into(),
        }
    }

    /// Create an illegal-state error.
    pub fn illegal_state(message: impl Into<String>) -> Self {
        Self::IllegalState {
            message: message.into(),
        }
    }

    /// Create a codec error.
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec {
            message: message.into(),
        }
    }

    /// Create an encoding error.
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }
}
