//! Read-open stream over a clean file snapshot
//!
//! The handle opens the clean file at construction and captures the entry's
//! length at that moment. A later commit replaces the clean file by rename,
//! which unlinks the old inode but leaves this descriptor valid, so reads
//! in progress are never affected by concurrent writes. Read errors
//! propagate to the caller, unlike the silent writer side.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// A stable read stream over one committed cache entry.
#[derive(Debug)]
pub struct ReaderHandle {
    file: File,
    length: u64,
}

impl ReaderHandle {
    pub(crate) fn open(path: &Path, length: u64) -> io::Result<Self> {
        let file = File::open(path)?;
        Ok(Self { file, length })
    }

    /// Byte length of the entry as of the moment the handle was opened.
    pub fn len(&self) -> u64 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Read the remaining bytes of the snapshot into a vector.
    pub fn read_to_vec(mut self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.length as usize);
        self.file.read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Release the underlying file descriptor.
    pub fn close(self) {}
}

impl Read for ReaderHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}
