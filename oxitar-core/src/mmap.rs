//! Memory-mapped byte source.
//!
//! Mapping the archive lets the OS page content in on demand, which pays off
//! for large archives where most entries are skipped.
//!
//! # Safety
//!
//! A mapped file that is truncated or rewritten by another process while
//! mapped leads to undefined behavior. The mapping is read-only.

use crate::error::{OxiTarError, Result};
use crate::source::{ByteSource, MemorySource};
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;

/// A [`ByteSource`] over a read-only memory map.
#[derive(Debug)]
pub struct MmapSource {
    inner: MemorySource<Mmap>,
}

impl MmapSource {
    /// Open and map a file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| OxiTarError::open_failed(path, e))?;
        Self::from_file(&file)
    }

    /// Map an already-open file. The mapping stays valid after `file` is closed.
    pub fn from_file(file: &File) -> Result<Self> {
        // SAFETY: read-only mapping; callers must not modify the file while mapped.
        let mmap = unsafe { Mmap::map(file)? };
        Ok(Self {
            inner: MemorySource::new(mmap),
        })
    }

    /// Length of the mapped file.
    pub fn len(&self) -> u64 {
        self.inner.len()
    }

    /// Check if the mapped file is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl ByteSource for MmapSource {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.inner.read(buf)
    }

    fn read_at(&mut self, buf: &mut [u8], pos: u64) -> Result<usize> {
        self.inner.read_at(buf, pos)
    }

    fn seek(&mut self, pos: u64) -> Result<()> {
        self.inner.seek(pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_mmap_source() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"mapped archive bytes").unwrap();
        tmp.flush().unwrap();

        let mut source = MmapSource::open(tmp.path()).unwrap();
        assert_eq!(source.len(), 20);

        let mut buf = [0u8; 6];
        assert_eq!(source.read(&mut buf).unwrap(), 6);
        assert_eq!(&buf, b"mapped");

        assert_eq!(source.read_at(&mut buf, 15).unwrap(), 5);
        assert_eq!(&buf[..5], b"bytes");

        source.seek(7).unwrap();
        assert_eq!(source.read(&mut buf).unwrap(), 6);
        assert_eq!(&buf, b"archiv");
    }
}
