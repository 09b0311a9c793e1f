//! Archive reading.
//!
//! [`ArchiveReader`] parses the header and entry table once at open time
//! and validates the whole table before returning. Entry sizes are not
//! stored on the wire; they are inferred from the adjacency of consecutive
//! offsets, with the last entry running to end of file. Content access
//! opens an independent windowed stream per entry, so concurrent readers
//! never share a file cursor.

use dpac_core::entry::Entry;
use dpac_core::error::{DpacError, Result};
use dpac_core::file::FileReadStream;
use dpac_core::stream::{ReadStream, Stream};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Length of the fixed archive header: one big-endian `u64` heap start.
pub const HEADER_LEN: u64 = 8;

/// Reads a Dpac archive file.
#[derive(Debug)]
pub struct ArchiveReader {
    path: PathBuf,
    heap_start: u64,
    file_size: u64,
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
}

impl ArchiveReader {
    /// Open an archive and parse its entry table.
    ///
    /// Fails with [`DpacError::CorruptedArchive`] when the header or table
    /// is malformed: a heap start outside the file, a table record crossing
    /// the heap boundary, descending offsets, an offset past the heap end,
    /// or a duplicate name.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut stream = FileReadStream::open(&path)?;
        let file_size = stream.size().unwrap_or(0);
        if file_size < HEADER_LEN {
            return Err(DpacError::corrupted(0, "file too short for header"));
        }
        let heap_start = stream.read_u64()?;
        if heap_start < HEADER_LEN || heap_start > file_size {
            return Err(DpacError::corrupted(
                0,
                format!("heap start {heap_start} outside file of {file_size} bytes"),
            ));
        }
        let heap_size = file_size - heap_start;

        let mut entries: Vec<Entry> = Vec::new();
        let mut index = HashMap::new();
        while stream.position() < heap_start {
            let record_at = stream.position();
            let name = stream.read_string()?;
            let offset = stream.read_u64()?;
            if stream.position() > heap_start {
                return Err(DpacError::corrupted(
                    record_at,
                    "entry table record crosses heap boundary",
                ));
            }
            if let Some(previous) = entries.last() {
                if offset < previous.offset {
                    return Err(DpacError::corrupted(
                        record_at,
                        format!(
                            "offset {offset} descends below previous offset {}",
                            previous.offset
                        ),
                    ));
                }
            }
            if offset > heap_size {
                return Err(DpacError::corrupted(
                    record_at,
                    format!("offset {offset} past heap end ({heap_size} heap bytes)"),
                ));
            }
            if index.contains_key(&name) {
                return Err(DpacError::corrupted(
                    record_at,
                    format!("duplicate entry name {name}"),
                ));
            }
            index.insert(name.clone(), entries.len());
            // Size is patched below once the next offset is known.
            entries.push(Entry::new(name, offset, 0));
        }

        // Adjacency size inference: each entry runs to the next entry's
        // offset, the last one to end of file.
        for i in 0..entries.len() {
            let end = match entries.get(i + 1) {
                Some(next) => next.offset,
                None => heap_size,
            };
            entries[i].size = end - entries[i].offset;
        }

        Ok(Self {
            path,
            heap_start,
            file_size,
            entries,
            index,
        })
    }

    /// Open an independent read stream over one entry's content.
    ///
    /// The returned stream is windowed to exactly the entry's bytes and
    /// carries its own file handle; streams for different entries (or the
    /// same entry twice) do not interfere.
    pub fn entry_stream(&self, name: &str) -> Result<FileReadStream> {
        let entry = self.entry(name)?;
        FileReadStream::open_window(&self.path, self.heap_start + entry.offset, entry.size)
    }

    /// Read one entry's content into a fresh buffer.
    pub fn entry_bytes(&self, name: &str) -> Result<Vec<u8>> {
        let entry = self.entry(name)?;
        let mut stream = self.entry_stream(name)?;
        let mut buf = vec![0u8; entry.size as usize];
        stream.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Look up one entry's metadata by name.
    pub fn entry(&self, name: &str) -> Result<&Entry> {
        self.index
            .get(name)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| DpacError::entry_not_found(name))
    }

    /// Inferred content length of one entry.
    pub fn entry_size(&self, name: &str) -> Result<u64> {
        Ok(self.entry(name)?.size)
    }

    /// Whether an entry with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Name to heap-relative offset map for every entry.
    pub fn offset_table(&self) -> HashMap<String, u64> {
        self.entries
            .iter()
            .map(|e| (e.name.clone(), e.offset))
            .collect()
    }

    /// All entries, in table order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Number of entries in the archive.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the archive holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// File offset where the heap region begins.
    pub fn heap_start(&self) -> u64 {
        self.heap_start
    }

    /// Total archive file size in bytes.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dpac_core::file::FileWriteStream;
    use dpac_core::stream::WriteStream;
    use tempfile::tempdir;

    fn write_raw(path: &Path, build: impl FnOnce(&mut FileWriteStream)) {
        let mut stream = FileWriteStream::create(path).unwrap();
        build(&mut stream);
        stream.flush().unwrap();
    }

    #[test]
    fn test_empty_archive() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.dpac");
        write_raw(&path, |s| s.write_u64(8).unwrap());

        let reader = ArchiveReader::open(&path).unwrap();
        assert!(reader.is_empty());
        assert_eq!(reader.heap_start(), 8);
        assert_eq!(reader.file_size(), 8);
    }

    #[test]
    fn test_truncated_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("short.dpac");
        std::fs::write(&path, [0u8; 4]).unwrap();

        let err = ArchiveReader::open(&path).unwrap_err();
        assert!(matches!(err, DpacError::CorruptedArchive { offset: 0, .. }));
    }

    #[test]
    fn test_heap_start_outside_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.dpac");
        write_raw(&path, |s| s.write_u64(1000).unwrap());

        let err = ArchiveReader::open(&path).unwrap_err();
        assert!(matches!(err, DpacError::CorruptedArchive { offset: 0, .. }));
    }

    #[test]
    fn test_record_crossing_heap_boundary() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.dpac");
        // Heap claimed to start mid-record.
        write_raw(&path, |s| {
            s.write_u64(20).unwrap();
            s.write_string("/a.txt").unwrap();
            s.write_u64(0).unwrap();
        });

        let err = ArchiveReader::open(&path).unwrap_err();
        assert!(matches!(err, DpacError::CorruptedArchive { offset: 8, .. }));
    }

    #[test]
    fn test_descending_offsets() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.dpac");
        write_raw(&path, |s| {
            s.write_u64(8 + 2 * 22).unwrap();
            s.write_string("/a.txt").unwrap();
            s.write_u64(5).unwrap();
            s.write_string("/b.txt").unwrap();
            s.write_u64(2).unwrap();
            s.write_bytes(b"hello").unwrap();
        });

        let err = ArchiveReader::open(&path).unwrap_err();
        assert!(matches!(err, DpacError::CorruptedArchive { offset: 30, .. }));
    }

    #[test]
    fn test_offset_past_heap_end() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.dpac");
        write_raw(&path, |s| {
            s.write_u64(8 + 22).unwrap();
            s.write_string("/a.txt").unwrap();
            s.write_u64(64).unwrap();
            s.write_bytes(b"tiny").unwrap();
        });

        let err = ArchiveReader::open(&path).unwrap_err();
        assert!(matches!(err, DpacError::CorruptedArchive { offset: 8, .. }));
    }

    #[test]
    fn test_duplicate_names_in_table() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.dpac");
        write_raw(&path, |s| {
            s.write_u64(8 + 2 * 22).unwrap();
            s.write_string("/a.txt").unwrap();
            s.write_u64(0).unwrap();
            s.write_string("/a.txt").unwrap();
            s.write_u64(0).unwrap();
        });

        let err = ArchiveReader::open(&path).unwrap_err();
        assert!(matches!(err, DpacError::CorruptedArchive { offset: 30, .. }));
    }

    #[test]
    fn test_missing_entry_lookup() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.dpac");
        write_raw(&path, |s| s.write_u64(8).unwrap());

        let reader = ArchiveReader::open(&path).unwrap();
        let err = reader.entry_stream("/missing").unwrap_err();
        assert!(matches!(err, DpacError::EntryNotFound { .. }));
        assert!(!reader.contains("/missing"));
    }
}
