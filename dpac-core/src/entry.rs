//! Archive entry metadata.

use serde::Serialize;

/// One named entry in a Dpac archive.
///
/// The offset is heap-relative (measured from the start of the heap region,
/// not the start of the file). The size is never stored on the wire; the
/// reader infers it from the adjacency of consecutive offsets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    /// Entry name. Tooling uses POSIX-style relative paths, but the format
    /// treats names as opaque strings.
    pub name: String,
    /// Byte offset of the content, relative to the heap start.
    pub offset: u64,
    /// Content length in bytes.
    pub size: u64,
}

impl Entry {
    /// Create a new entry.
    pub fn new(name: impl Into<String>, offset: u64, size: u64) -> Self {
        Self {
            name: name.into(),
            offset,
            size,
        }
    }

    /// Heap-relative offset one past the end of this entry's content.
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_end() {
        let entry = Entry::new("/a.txt", 12, 5);
        assert_eq!(entry.end(), 17);
        let empty = Entry::new("/b.txt", 12, 0);
        assert_eq!(empty.end(), empty.offset);
    }
}
