//! Archive creation.
//!
//! [`ArchiveWriter`] drives the two-phase write protocol: declare every
//! entry up front, finalize the table, then populate contents in any order.
//! Declaring appends `(name, offset)` records to the entry table; offsets
//! are assigned by running total of the declared lengths, so the heap
//! layout is fixed the moment the table is finalized. Finalizing
//! back-patches the heap start into the 8-byte header and pins the table;
//! populating seeks into the heap region and copies content through.

use dpac_core::entry::Entry;
use dpac_core::error::{DpacError, Result};
use dpac_core::file::FileWriteStream;
use dpac_core::stream::{ReadStream, Stream, Transfer, WriteStream};
use std::collections::HashMap;
use std::path::Path;

/// Writes a Dpac archive file.
///
/// The protocol is strictly phased. Declarations are rejected once
/// [`finalize`](ArchiveWriter::finalize) has run, and population is
/// rejected until it has. Entries may be populated in any order and from
/// any source stream; each population is checked against the declared
/// length, since a mismatch would silently corrupt every entry after it.
#[derive(Debug)]
pub struct ArchiveWriter {
    stream: FileWriteStream,
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
    next_offset: u64,
    heap_start: Option<u64>,
    reserved: Option<usize>,
}

impl ArchiveWriter {
    /// Create a new archive file, truncating any existing file at `path`.
    ///
    /// Writes a placeholder header; the real heap start is patched in by
    /// [`finalize`](ArchiveWriter::finalize).
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut stream = FileWriteStream::create(path)?;
        stream.write_u64(0)?;
        Ok(Self {
            stream,
            entries: Vec::new(),
            index: HashMap::new(),
            next_offset: 0,
            heap_start: None,
            reserved: None,
        })
    }

    /// Announce how many entries will be declared.
    ///
    /// Optional. When set, [`finalize`](ArchiveWriter::finalize) fails if
    /// fewer entries were actually declared, catching callers that lost
    /// track of a file between sizing and declaring.
    pub fn reserve_entries(&mut self, count: usize) -> Result<()> {
        if self.heap_start.is_some() {
            return Err(DpacError::EntryTableFinalized);
        }
        self.reserved = Some(count);
        Ok(())
    }

    /// Declare an entry of `size` content bytes.
    ///
    /// Appends the `(name, offset)` record to the entry table and assigns
    /// the next free heap offset. The size itself never reaches the wire;
    /// it is implied by the offset of the following entry.
    pub fn declare_entry(&mut self, name: &str, size: u64) -> Result<()> {
        if self.heap_start.is_some() {
            return Err(DpacError::EntryTableFinalized);
        }
        if self.index.contains_key(name) {
            return Err(DpacError::entry_already_defined(name));
        }
        self.stream.write_string(name)?;
        self.stream.write_u64(self.next_offset)?;
        self.index.insert(name.to_string(), self.entries.len());
        self.entries.push(Entry::new(name, self.next_offset, size));
        self.next_offset += size;
        Ok(())
    }

    /// Finalize the entry table.
    ///
    /// Records the current position as the heap start, back-patches it into
    /// the header, and returns the cursor to the heap. No further
    /// declarations are accepted after this.
    pub fn finalize(&mut self) -> Result<()> {
        if self.heap_start.is_some() {
            return Err(DpacError::EntryTableFinalized);
        }
        if let Some(reserved) = self.reserved {
            if self.entries.len() < reserved {
                return Err(DpacError::TooFewEntriesReserved {
                    reserved,
                    declared: self.entries.len(),
                });
            }
        }
        let heap_start = self.stream.position();
        self.stream.seek(0)?;
        self.stream.write_u64(heap_start)?;
        self.stream.seek(heap_start)?;
        self.heap_start = Some(heap_start);
        Ok(())
    }

    /// Populate a declared entry with content drained from `source`.
    ///
    /// Seeks to the entry's heap slot and copies `source` to exhaustion.
    /// Fails with [`DpacError::EntryLengthMismatch`] when the drained byte
    /// count differs from the declared length; the archive should be
    /// considered unusable after that.
    pub fn populate_entry<R: ReadStream + ?Sized>(
        &mut self,
        name: &str,
        source: &mut R,
    ) -> Result<Transfer> {
        let heap_start = self.heap_start.ok_or(DpacError::EntryTableNotFinalized)?;
        let index = *self
            .index
            .get(name)
            .ok_or_else(|| DpacError::entry_not_defined(name))?;
        let entry = &self.entries[index];
        self.stream.seek(heap_start + entry.offset)?;
        let transfer = self.stream.drain_from(source)?;
        if transfer.bytes_written != entry.size {
            return Err(DpacError::length_mismatch(
                name,
                entry.size,
                transfer.bytes_written,
            ));
        }
        Ok(transfer)
    }

    /// Populate a declared entry from an in-memory byte slice.
    pub fn populate_entry_bytes(&mut self, name: &str, content: &[u8]) -> Result<()> {
        let heap_start = self.heap_start.ok_or(DpacError::EntryTableNotFinalized)?;
        let index = *self
            .index
            .get(name)
            .ok_or_else(|| DpacError::entry_not_defined(name))?;
        let entry = &self.entries[index];
        if content.len() as u64 != entry.size {
            return Err(DpacError::length_mismatch(
                name,
                entry.size,
                content.len() as u64,
            ));
        }
        self.stream.seek(heap_start + entry.offset)?;
        self.stream.write_bytes(content)
    }

    /// Entries declared so far, in declaration order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Heap start offset, once the table has been finalized.
    pub fn heap_start(&self) -> Option<u64> {
        self.heap_start
    }

    /// Flush and close the archive.
    pub fn close(mut self) -> Result<()> {
        self.stream.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dpac_core::stream::MemoryStream;
    use tempfile::tempdir;

    #[test]
    fn test_declare_after_finalize_fails() {
        let dir = tempdir().unwrap();
        let mut writer = ArchiveWriter::create(dir.path().join("a.dpac")).unwrap();
        writer.declare_entry("/a.txt", 4).unwrap();
        writer.finalize().unwrap();
        let err = writer.declare_entry("/b.txt", 4).unwrap_err();
        assert!(matches!(err, DpacError::EntryTableFinalized));
        let err = writer.finalize().unwrap_err();
        assert!(matches!(err, DpacError::EntryTableFinalized));
    }

    #[test]
    fn test_populate_before_finalize_fails() {
        let dir = tempdir().unwrap();
        let mut writer = ArchiveWriter::create(dir.path().join("a.dpac")).unwrap();
        writer.declare_entry("/a.txt", 4).unwrap();
        let mut source = MemoryStream::from_vec(b"data".to_vec());
        let err = writer.populate_entry("/a.txt", &mut source).unwrap_err();
        assert!(matches!(err, DpacError::EntryTableNotFinalized));
    }

    #[test]
    fn test_populate_undeclared_fails() {
        let dir = tempdir().unwrap();
        let mut writer = ArchiveWriter::create(dir.path().join("a.dpac")).unwrap();
        writer.finalize().unwrap();
        let mut source = MemoryStream::from_vec(b"data".to_vec());
        let err = writer.populate_entry("/ghost", &mut source).unwrap_err();
        assert!(matches!(err, DpacError::EntryNotDefined { .. }));
    }

    #[test]
    fn test_duplicate_declaration_fails() {
        let dir = tempdir().unwrap();
        let mut writer = ArchiveWriter::create(dir.path().join("a.dpac")).unwrap();
        writer.declare_entry("/a.txt", 4).unwrap();
        let err = writer.declare_entry("/a.txt", 9).unwrap_err();
        assert!(matches!(err, DpacError::EntryAlreadyDefined { .. }));
        // The failed declaration must not have claimed heap space.
        assert_eq!(writer.entries().len(), 1);
    }

    #[test]
    fn test_reserve_too_few_declared() {
        let dir = tempdir().unwrap();
        let mut writer = ArchiveWriter::create(dir.path().join("a.dpac")).unwrap();
        writer.reserve_entries(3).unwrap();
        writer.declare_entry("/a.txt", 4).unwrap();
        writer.declare_entry("/b.txt", 4).unwrap();
        let err = writer.finalize().unwrap_err();
        assert!(matches!(
            err,
            DpacError::TooFewEntriesReserved {
                reserved: 3,
                declared: 2,
            }
        ));
    }

    #[test]
    fn test_length_mismatch_is_rejected() {
        let dir = tempdir().unwrap();
        let mut writer = ArchiveWriter::create(dir.path().join("a.dpac")).unwrap();
        writer.declare_entry("/a.txt", 12).unwrap();
        writer.finalize().unwrap();
        let mut short = MemoryStream::from_vec(b"elevenbytes".to_vec());
        let err = writer.populate_entry("/a.txt", &mut short).unwrap_err();
        assert!(matches!(
            err,
            DpacError::EntryLengthMismatch {
                expected: 12,
                actual: 11,
                ..
            }
        ));

        let err = writer.populate_entry_bytes("/a.txt", b"too long too long").unwrap_err();
        assert!(matches!(err, DpacError::EntryLengthMismatch { .. }));
    }

    #[test]
    fn test_offsets_accumulate_declared_sizes() {
        let dir = tempdir().unwrap();
        let mut writer = ArchiveWriter::create(dir.path().join("a.dpac")).unwrap();
        writer.declare_entry("/a.txt", 12).unwrap();
        writer.declare_entry("/b.txt", 0).unwrap();
        writer.declare_entry("/c.txt", 5).unwrap();
        let offsets: Vec<u64> = writer.entries().iter().map(|e| e.offset).collect();
        assert_eq!(offsets, [0, 12, 12]);
        writer.finalize().unwrap();
        // Header plus three (string, u64) records.
        assert_eq!(writer.heap_start(), Some(8 + 3 * (8 + 6 + 8)));
    }
}
