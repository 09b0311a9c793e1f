//! Windowed file-backed streams.
//!
//! [`FileReadStream`] and [`FileWriteStream`] implement the stream traits
//! over a file descriptor, optionally scoped to an arbitrary
//! `[start, start + size)` sub-range of the backing file. All positions they
//! report are relative to the window start; the window bound is enforced on
//! seek, skip, read, and write even when the underlying file has more bytes
//! beyond it. This is the mechanism that lets an archive hand out an
//! isolated, independently seekable stream for one entry while the rest of
//! the archive file stays invisible to the consumer.
//!
//! File handles are released on drop, on every exit path.

use crate::error::{DpacError, Result};
use crate::stream::{ReadStream, Stream, WriteStream};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

/// A read stream over a file, or a window of one.
#[derive(Debug)]
pub struct FileReadStream {
    file: File,
    start: u64,
    size: u64,
    pos: u64,
}

impl FileReadStream {
    /// Open a stream over an entire file.
    ///
    /// Fails with [`DpacError::OpenFailed`] when the path cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| DpacError::open_failed(path, e))?;
        let size = file.metadata()?.len();
        Ok(Self {
            file,
            start: 0,
            size,
            pos: 0,
        })
    }

    /// Open a stream over the `[start, start + size)` window of a file.
    ///
    /// Fails with [`DpacError::SeekOutOfBounds`] when the window does not
    /// fit inside the file.
    pub fn open_window<P: AsRef<Path>>(path: P, start: u64, size: u64) -> Result<Self> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|e| DpacError::open_failed(path, e))?;
        let file_len = file.metadata()?.len();
        let end = start
            .checked_add(size)
            .ok_or_else(|| DpacError::seek_out_of_bounds(u64::MAX, file_len))?;
        if end > file_len {
            return Err(DpacError::seek_out_of_bounds(end, file_len));
        }
        file.seek(SeekFrom::Start(start))?;
        Ok(Self {
            file,
            start,
            size,
            pos: 0,
        })
    }
}

impl Stream for FileReadStream {
    fn position(&self) -> u64 {
        self.pos
    }

    fn size(&self) -> Option<u64> {
        Some(self.size)
    }

    fn seek(&mut self, position: u64) -> Result<()> {
        if position > self.size {
            return Err(DpacError::seek_out_of_bounds(position, self.size));
        }
        self.file.seek(SeekFrom::Start(self.start + position))?;
        self.pos = position;
        Ok(())
    }
}

impl ReadStream for FileReadStream {
    fn read_into(&mut self, buf: &mut [u8]) -> Result<usize> {
        let remaining = (self.size - self.pos).min(buf.len() as u64) as usize;
        let mut total = 0;
        while total < remaining {
            let read = self.file.read(&mut buf[total..remaining])?;
            if read == 0 {
                break;
            }
            total += read;
        }
        self.pos += total as u64;
        Ok(total)
    }
}

/// A write stream over a file, or a window of one.
///
/// Created with [`FileWriteStream::create`] it is an unbounded append-style
/// sink (`size() == None`, overflow checks skipped); created with
/// [`FileWriteStream::open_window`] it is bounded to the window.
#[derive(Debug)]
pub struct FileWriteStream {
    file: File,
    start: u64,
    size: Option<u64>,
    pos: u64,
}

impl FileWriteStream {
    /// Create (or truncate) a file and open an unbounded write stream over it.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| DpacError::open_failed(path, e))?;
        Ok(Self {
            file,
            start: 0,
            size: None,
            pos: 0,
        })
    }

    /// Open a bounded write stream over the `[start, start + size)` window
    /// of an existing file.
    pub fn open_window<P: AsRef<Path>>(path: P, start: u64, size: u64) -> Result<Self> {
        let path = path.as_ref();
        let mut file = OpenOptions::new()
            .write(true)
            .open(path)
            .map_err(|e| DpacError::open_failed(path, e))?;
        file.seek(SeekFrom::Start(start))?;
        Ok(Self {
            file,
            start,
            size: Some(size),
            pos: 0,
        })
    }
}

impl Stream for FileWriteStream {
    fn position(&self) -> u64 {
        self.pos
    }

    fn size(&self) -> Option<u64> {
        self.size
    }

    fn seek(&mut self, position: u64) -> Result<()> {
        if let Some(size) = self.size {
            if position > size {
                return Err(DpacError::seek_out_of_bounds(position, size));
            }
        }
        self.file.seek(SeekFrom::Start(self.start + position))?;
        self.pos = position;
        Ok(())
    }
}

impl WriteStream for FileWriteStream {
    fn write_bytes(&mut self, buf: &[u8]) -> Result<()> {
        if let Some(size) = self.size {
            let remaining = size.saturating_sub(self.pos);
            if (buf.len() as u64) > remaining {
                return Err(DpacError::overflow(buf.len(), remaining));
            }
        }
        self.file.write_all(buf)?;
        self.pos += buf.len() as u64;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_missing_path_fails() {
        let err = FileReadStream::open("/does/not/exist.dpac").unwrap_err();
        assert!(matches!(err, DpacError::OpenFailed { .. }));
    }

    #[test]
    fn test_whole_file_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.bin");

        let mut writer = FileWriteStream::create(&path).unwrap();
        assert_eq!(writer.size(), None);
        writer.write_u64(42).unwrap();
        writer.write_string("name").unwrap();
        writer.flush().unwrap();
        drop(writer);

        let mut reader = FileReadStream::open(&path).unwrap();
        assert_eq!(reader.size(), Some(20));
        assert_eq!(reader.read_u64().unwrap(), 42);
        assert_eq!(reader.read_string().unwrap(), "name");
        assert!(!reader.has_remaining());
    }

    #[test]
    fn test_window_isolation() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.bin");
        std::fs::write(&path, b"AAAABBBBCCCC").unwrap();

        let mut window = FileReadStream::open_window(&path, 4, 4).unwrap();
        assert_eq!(window.position(), 0);
        assert_eq!(window.size(), Some(4));

        let mut buf = [0u8; 8];
        assert_eq!(window.read_into(&mut buf).unwrap(), 4);
        assert_eq!(&buf[..4], b"BBBB");
        assert!(!window.has_remaining());

        // Positions beyond the window fail even though the file goes on.
        assert!(window.seek(5).is_err());
        window.seek(0).unwrap();
        assert!(window.skip(5).is_err());
        assert!(window.skip(-1).is_err());

        window.seek(2).unwrap();
        assert_eq!(window.read_u16().unwrap(), u16::from_be_bytes(*b"BB"));
    }

    #[test]
    fn test_window_must_fit_in_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.bin");
        std::fs::write(&path, b"0123456789").unwrap();

        assert!(FileReadStream::open_window(&path, 8, 4).is_err());
        assert!(FileReadStream::open_window(&path, 10, 0).is_ok());
    }

    #[test]
    fn test_bounded_write_window_overflow() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.bin");
        std::fs::write(&path, b"............").unwrap();

        let mut window = FileWriteStream::open_window(&path, 4, 4).unwrap();
        window.write_bytes(b"ab").unwrap();
        let err = window.write_bytes(b"cde").unwrap_err();
        assert!(matches!(err, DpacError::Overflow { requested: 3, .. }));
        window.write_bytes(b"cd").unwrap();
        window.flush().unwrap();
        drop(window);

        assert_eq!(std::fs::read(&path).unwrap(), b"....abcd....");
    }

    #[test]
    fn test_sparse_population_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.bin");

        // Write the later region first, the way out-of-order archive
        // population does, then fill the gap.
        let mut writer = FileWriteStream::create(&path).unwrap();
        writer.seek(4).unwrap();
        writer.write_bytes(b"tail").unwrap();
        writer.seek(0).unwrap();
        writer.write_bytes(b"head").unwrap();
        writer.flush().unwrap();
        drop(writer);

        assert_eq!(std::fs::read(&path).unwrap(), b"headtail");
    }
}
