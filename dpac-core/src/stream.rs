//! Byte stream primitives.
//!
//! This module defines the [`ReadStream`] and [`WriteStream`] traits: ordered
//! random-access byte streams with fixed-width big-endian integer accessors,
//! length-prefixed and fixed-width string encodings, and bounds-checked
//! seek/skip. [`MemoryStream`] is the growable in-memory implementation used
//! for staging and testing; the file-backed implementations live in
//! [`crate::file`].
//!
//! # Wire encoding
//!
//! All multi-byte integers are big-endian, two's complement for signed types.
//! A string is a `u64` byte-length prefix followed by that many raw bytes,
//! with no terminator. A fixed string of width `n` is exactly `n` raw bytes;
//! the logical value is the prefix up to the first NUL byte.
//!
//! # Example
//!
//! ```
//! use dpac_core::stream::{MemoryStream, ReadStream, Stream, WriteStream};
//!
//! let mut stream = MemoryStream::new();
//! stream.write_u32(0xDEAD_BEEF).unwrap();
//! stream.write_string("hello").unwrap();
//!
//! stream.seek(0).unwrap();
//! assert_eq!(stream.read_u32().unwrap(), 0xDEAD_BEEF);
//! assert_eq!(stream.read_string().unwrap(), "hello");
//! assert!(!stream.has_remaining());
//! ```

use crate::error::{DpacError, Result};

/// Chunk size for bulk stream-to-stream transfers.
const TRANSFER_CHUNK: usize = 8192;

/// Byte counts reported by a bulk stream-to-stream transfer.
///
/// The two counts differ only when a codec sits between the source and the
/// sink (e.g. a compressing write stream reads more bytes than it writes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Transfer {
    /// Bytes written to the destination stream.
    pub bytes_written: u64,
    /// Bytes read from the source stream.
    pub bytes_read: u64,
}

/// Common cursor behavior shared by read and write streams.
///
/// Positions are relative to the stream's own window, not the backing
/// medium: a windowed file stream over `[start, start + size)` reports
/// position `0` at `start`. A stream with `size() == None` is unbounded
/// (an append-only sink); bound checks are skipped for it.
pub trait Stream {
    /// Current cursor position, relative to the stream's window.
    fn position(&self) -> u64;

    /// Total window size in bytes, or `None` for an unbounded stream.
    fn size(&self) -> Option<u64>;

    /// Move the cursor to an absolute (window-relative) position.
    ///
    /// Fails with [`DpacError::SeekOutOfBounds`] if the target exceeds the
    /// stream's bound.
    fn seek(&mut self, position: u64) -> Result<()>;

    /// Move the cursor by a signed relative offset.
    fn skip(&mut self, offset: i64) -> Result<()> {
        let target = self
            .position()
            .checked_add_signed(offset)
            .ok_or_else(|| DpacError::seek_out_of_bounds(0, self.size().unwrap_or(u64::MAX)))?;
        self.seek(target)
    }

    /// Bytes remaining before the window end, or `None` if unbounded.
    fn remaining(&self) -> Option<u64> {
        self.size().map(|size| size.saturating_sub(self.position()))
    }

    /// Whether any bytes remain before the window end.
    ///
    /// Always `true` for unbounded streams.
    fn has_remaining(&self) -> bool {
        match self.remaining() {
            Some(remaining) => remaining > 0,
            None => true,
        }
    }
}

/// A readable byte stream with big-endian typed accessors.
pub trait ReadStream: Stream {
    /// Best-effort bulk read.
    ///
    /// Returns the number of bytes read into `buf`. Returns fewer than
    /// `buf.len()` only at end of stream; a short read is not an error.
    fn read_into(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Read exactly `buf.len()` bytes.
    ///
    /// Fails with [`DpacError::Underflow`] when fewer bytes remain; a
    /// truncated value is never returned.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let read = self.read_into(buf)?;
        if read < buf.len() {
            return Err(DpacError::underflow(buf.len(), read as u64));
        }
        Ok(())
    }

    /// Read an unsigned 8-bit integer.
    fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    /// Read a signed 8-bit integer.
    fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    /// Read a big-endian unsigned 16-bit integer.
    fn read_u16(&mut self) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.read_exact(&mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }

    /// Read a big-endian signed 16-bit integer.
    fn read_i16(&mut self) -> Result<i16> {
        let mut buf = [0u8; 2];
        self.read_exact(&mut buf)?;
        Ok(i16::from_be_bytes(buf))
    }

    /// Read a big-endian unsigned 32-bit integer.
    fn read_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(u32::from_be_bytes(buf))
    }

    /// Read a big-endian signed 32-bit integer.
    fn read_i32(&mut self) -> Result<i32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(i32::from_be_bytes(buf))
    }

    /// Read a big-endian unsigned 64-bit integer.
    fn read_u64(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf)?;
        Ok(u64::from_be_bytes(buf))
    }

    /// Read a big-endian signed 64-bit integer.
    fn read_i64(&mut self) -> Result<i64> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf)?;
        Ok(i64::from_be_bytes(buf))
    }

    /// Read a length-prefixed string: a `u64` byte length followed by that
    /// many raw UTF-8 bytes, no terminator.
    fn read_string(&mut self) -> Result<String> {
        let len = self.read_u64()?;
        let len = usize::try_from(len)
            .map_err(|_| DpacError::corrupted(self.position(), "string length exceeds usize"))?;
        let mut buf = vec![0u8; len];
        self.read_exact(&mut buf)?;
        String::from_utf8(buf).map_err(|e| DpacError::encoding(e.to_string()))
    }

    /// Read a fixed-width string of exactly `width` raw bytes.
    ///
    /// The logical value is the prefix up to the first NUL byte; trailing
    /// zero padding is not part of the value.
    fn read_fixed_string(&mut self, width: usize) -> Result<String> {
        let mut buf = vec![0u8; width];
        self.read_exact(&mut buf)?;
        let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
        buf.truncate(end);
        String::from_utf8(buf).map_err(|e| DpacError::encoding(e.to_string()))
    }
}

/// A writable byte stream with big-endian typed accessors.
pub trait WriteStream: Stream {
    /// Write all of `buf` at the current position.
    ///
    /// Bounded implementations fail with [`DpacError::Overflow`] when the
    /// write would cross the window end; unbounded sinks never do.
    fn write_bytes(&mut self, buf: &[u8]) -> Result<()>;

    /// Flush buffered bytes to the backing medium.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    /// Write an unsigned 8-bit integer.
    fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_bytes(&[value])
    }

    /// Write a signed 8-bit integer.
    fn write_i8(&mut self, value: i8) -> Result<()> {
        self.write_bytes(&[value as u8])
    }

    /// Write a big-endian unsigned 16-bit integer.
    fn write_u16(&mut self, value: u16) -> Result<()> {
        self.write_bytes(&value.to_be_bytes())
    }

    /// Write a big-endian signed 16-bit integer.
    fn write_i16(&mut self, value: i16) -> Result<()> {
        self.write_bytes(&value.to_be_bytes())
    }

    /// Write a big-endian unsigned 32-bit integer.
    fn write_u32(&mut self, value: u32) -> Result<()> {
        self.write_bytes(&value.to_be_bytes())
    }

    /// Write a big-endian signed 32-bit integer.
    fn write_i32(&mut self, value: i32) -> Result<()> {
        self.write_bytes(&value.to_be_bytes())
    }

    /// Write a big-endian unsigned 64-bit integer.
    fn write_u64(&mut self, value: u64) -> Result<()> {
        self.write_bytes(&value.to_be_bytes())
    }

    /// Write a big-endian signed 64-bit integer.
    fn write_i64(&mut self, value: i64) -> Result<()> {
        self.write_bytes(&value.to_be_bytes())
    }

    /// Write a length-prefixed string: a `u64` byte length followed by the
    /// raw UTF-8 bytes, no terminator.
    fn write_string(&mut self, value: &str) -> Result<()> {
        self.write_u64(value.len() as u64)?;
        self.write_bytes(value.as_bytes())
    }

    /// Write a fixed-width string, zero-padding to exactly `width` bytes.
    ///
    /// Fails with [`DpacError::Overflow`] when the value is longer than
    /// `width`.
    fn write_fixed_string(&mut self, value: &str, width: usize) -> Result<()> {
        let bytes = value.as_bytes();
        if bytes.len() > width {
            return Err(DpacError::overflow(bytes.len(), width as u64));
        }
        self.write_bytes(bytes)?;
        let padding = vec![0u8; width - bytes.len()];
        self.write_bytes(&padding)
    }

    /// Drain a read stream into this stream.
    ///
    /// Reads `source` to exhaustion and writes every byte through. The
    /// returned [`Transfer`] counts are equal for a plain copy; compressing
    /// implementations override this method and report differing counts.
    fn drain_from<R: ReadStream + ?Sized>(&mut self, source: &mut R) -> Result<Transfer> {
        let mut chunk = [0u8; TRANSFER_CHUNK];
        let mut transfer = Transfer::default();
        while source.has_remaining() {
            let read = source.read_into(&mut chunk)?;
            if read == 0 {
                break;
            }
            self.write_bytes(&chunk[..read])?;
            transfer.bytes_read += read as u64;
            transfer.bytes_written += read as u64;
        }
        Ok(transfer)
    }
}

/// A growable in-memory byte stream, readable and writable.
///
/// Reads are bounded by the current length; writes past the end grow the
/// buffer, so the stream doubles as an in-memory sink. Seeking is allowed
/// anywhere up to the current length.
#[derive(Debug, Clone, Default)]
pub struct MemoryStream {
    data: Vec<u8>,
    pos: usize,
}

impl MemoryStream {
    /// Create an empty stream.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a stream over existing bytes, cursor at the start.
    pub fn from_vec(data: Vec<u8>) -> Self {
        Self { data, pos: 0 }
    }

    /// Current length of the underlying buffer.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the underlying buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrow the underlying bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Consume the stream and return the underlying bytes.
    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }

    /// Reset the cursor to the start.
    pub fn rewind(&mut self) {
        self.pos = 0;
    }
}

impl Stream for MemoryStream {
    fn position(&self) -> u64 {
        self.pos as u64
    }

    fn size(&self) -> Option<u64> {
        Some(self.data.len() as u64)
    }

    fn seek(&mut self, position: u64) -> Result<()> {
        if position > self.data.len() as u64 {
            return Err(DpacError::seek_out_of_bounds(
                position,
                self.data.len() as u64,
            ));
        }
        self.pos = position as usize;
        Ok(())
    }
}

impl ReadStream for MemoryStream {
    fn read_into(&mut self, buf: &mut [u8]) -> Result<usize> {
        let available = self.data.len() - self.pos;
        let take = buf.len().min(available);
        buf[..take].copy_from_slice(&self.data[self.pos..self.pos + take]);
        self.pos += take;
        Ok(take)
    }
}

impl WriteStream for MemoryStream {
    fn write_bytes(&mut self, buf: &[u8]) -> Result<()> {
        let end = self.pos + buf.len();
        if end > self.data.len() {
            self.data.resize(end, 0);
        }
        self.data[self.pos..end].copy_from_slice(buf);
        self.pos = end;
        Ok(())
    }
}
