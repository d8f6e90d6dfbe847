//! Byte sources.
//!
//! A [`ByteSource`] is anything that produces bytes from a logical cursor:
//! an open file, an in-memory buffer, a pipe, or a decompressing transport.
//! The tar reader only ever talks to this trait, so transports are
//! interchangeable without touching the parser.
//!
//! Sources that wrap an OS handle carry an explicit [`Ownership`] tag. An
//! owned handle is released exactly once when the source is dropped; a
//! borrowed handle is never released by the source.

use crate::error::{OxiTarError, Result};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// A positioned byte-producing resource.
pub trait ByteSource {
    /// Read up to `buf.len()` bytes from the sequential cursor.
    ///
    /// Returns the number of bytes read; `0` signals end of stream.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Read up to `buf.len()` bytes starting at absolute position `pos`.
    ///
    /// The sequential cursor used by [`ByteSource::read`] is left untouched.
    fn read_at(&mut self, buf: &mut [u8], pos: u64) -> Result<usize>;

    /// Move the sequential cursor to absolute position `pos`.
    fn seek(&mut self, pos: u64) -> Result<()>;
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }

    fn read_at(&mut self, buf: &mut [u8], pos: u64) -> Result<usize> {
        (**self).read_at(buf, pos)
    }

    fn seek(&mut self, pos: u64) -> Result<()> {
        (**self).seek(pos)
    }
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }

    fn read_at(&mut self, buf: &mut [u8], pos: u64) -> Result<usize> {
        (**self).read_at(buf, pos)
    }

    fn seek(&mut self, pos: u64) -> Result<()> {
        (**self).seek(pos)
    }
}

/// Whether a source is responsible for releasing its OS handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// The source releases the handle on drop.
    Owned,
    /// The handle belongs to someone else and outlives the source.
    Borrowed,
}

/// Run an io operation, retrying when the system call was interrupted.
fn retry_interrupted<T>(mut op: impl FnMut() -> io::Result<T>) -> Result<T> {
    loop {
        match op() {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            other => return other.map_err(OxiTarError::from),
        }
    }
}

#[derive(Debug)]
enum Handle<'a> {
    Owned(File),
    Borrowed(&'a File),
}

/// A file-backed byte source.
///
/// # Example
///
/// ```no_run
/// use oxitar_core::source::{ByteSource, FileSource, Ownership};
///
/// let mut source = FileSource::open("archive.tar")?;
/// assert_eq!(source.ownership(), Ownership::Owned);
///
/// let mut magic = [0u8; 6];
/// source.read_at(&mut magic, 257)?;
/// # Ok::<(), oxitar_core::OxiTarError>(())
/// ```
#[derive(Debug)]
pub struct FileSource<'a> {
    handle: Handle<'a>,
    path: Option<PathBuf>,
}

impl FileSource<'static> {
    /// Open a file for reading; the returned source owns the handle.
    ///
    /// # Errors
    ///
    /// Returns [`OxiTarError::OpenFailed`] with the OS error if the file
    /// cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| OxiTarError::open_failed(path, e))?;
        Ok(Self {
            handle: Handle::Owned(file),
            path: Some(path.to_path_buf()),
        })
    }

    /// Take ownership of an already-open file.
    pub fn owned(file: File) -> Self {
        Self {
            handle: Handle::Owned(file),
            path: None,
        }
    }
}

impl<'a> FileSource<'a> {
    /// Wrap a file the caller keeps ownership of.
    pub fn borrowed(file: &'a File) -> Self {
        Self {
            handle: Handle::Borrowed(file),
            path: None,
        }
    }

    /// Ownership of the underlying handle.
    pub fn ownership(&self) -> Ownership {
        match self.handle {
            Handle::Owned(_) => Ownership::Owned,
            Handle::Borrowed(_) => Ownership::Borrowed,
        }
    }

    /// Whether dropping this source closes the handle.
    pub fn owns_handle(&self) -> bool {
        self.ownership() == Ownership::Owned
    }

    /// Path the source was opened from, if known.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn file(&self) -> &File {
        match &self.handle {
            Handle::Owned(file) => file,
            Handle::Borrowed(file) => file,
        }
    }
}

impl ByteSource for FileSource<'_> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut file = self.file();
        retry_interrupted(|| file.read(buf))
    }

    #[cfg(unix)]
    fn read_at(&mut self, buf: &mut [u8], pos: u64) -> Result<usize> {
        use std::os::unix::fs::FileExt;

        let file = self.file();
        retry_interrupted(|| file.read_at(buf, pos))
    }

    #[cfg(not(unix))]
    fn read_at(&mut self, buf: &mut [u8], pos: u64) -> Result<usize> {
        let mut file = self.file();
        let cursor = retry_interrupted(|| file.stream_position())?;
        retry_interrupted(|| file.seek(SeekFrom::Start(pos)))?;
        let read = retry_interrupted(|| file.read(buf));
        retry_interrupted(|| file.seek(SeekFrom::Start(cursor)))?;
        read
    }

    fn seek(&mut self, pos: u64) -> Result<()> {
        let mut file = self.file();
        retry_interrupted(|| file.seek(SeekFrom::Start(pos)))?;
        Ok(())
    }
}

impl Drop for FileSource<'_> {
    fn drop(&mut self) {
        // The owned File closes itself right after this; a borrowed one is left alone.
        if self.owns_handle() {
            log::trace!("releasing owned archive handle {:?}", self.path);
        }
    }
}

/// A byte source over an in-memory buffer.
#[derive(Debug, Clone)]
pub struct MemorySource<T> {
    data: T,
    position: u64,
}

impl<T: AsRef<[u8]>> MemorySource<T> {
    /// Create a source positioned at the start of `data`.
    pub fn new(data: T) -> Self {
        Self { data, position: 0 }
    }

    /// Current cursor position.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Total length of the buffer.
    pub fn len(&self) -> u64 {
        self.data.as_ref().len() as u64
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.data.as_ref().is_empty()
    }

    /// Consume the source and return the buffer.
    pub fn into_inner(self) -> T {
        self.data
    }

    fn copy_from(&self, buf: &mut [u8], pos: u64) -> usize {
        let data = self.data.as_ref();
        let start = usize::try_from(pos).unwrap_or(usize::MAX).min(data.len());
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        n
    }
}

impl<T: AsRef<[u8]>> ByteSource for MemorySource<T> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = self.copy_from(buf, self.position);
        self.position += n as u64;
        Ok(n)
    }

    fn read_at(&mut self, buf: &mut [u8], pos: u64) -> Result<usize> {
        Ok(self.copy_from(buf, pos))
    }

    fn seek(&mut self, pos: u64) -> Result<()> {
        self.position = pos;
        Ok(())
    }
}

/// A forward-only byte source over any [`Read`] (pipes, decompressors).
///
/// Positioned reads and seeking are not possible and fail with
/// [`OxiTarError::UnsupportedFeature`].
#[derive(Debug)]
pub struct StreamSource<R> {
    inner: R,
}

impl<R: Read> StreamSource<R> {
    /// Wrap a reader.
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Get a reference to the wrapped reader.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Consume the source and return the wrapped reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> ByteSource for StreamSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let inner = &mut self.inner;
        retry_interrupted(|| inner.read(buf))
    }

    fn read_at(&mut self, _buf: &mut [u8], _pos: u64) -> Result<usize> {
        Err(OxiTarError::unsupported("positioned reads on a forward-only stream"))
    }

    fn seek(&mut self, _pos: u64) -> Result<()> {
        Err(OxiTarError::unsupported("seeking a forward-only stream"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_memory_source_read_and_seek() {
        let mut source = MemorySource::new(b"hello world".to_vec());
        let mut buf = [0u8; 5];

        assert_eq!(source.read(&mut buf).unwrap(), 5);
        assert_eq!(&buf, b"hello");
        assert_eq!(source.position(), 5);

        source.seek(6).unwrap();
        assert_eq!(source.read(&mut buf).unwrap(), 5);
        assert_eq!(&buf, b"world");
        assert_eq!(source.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_memory_source_read_at_keeps_cursor() {
        let mut source = MemorySource::new(&b"0123456789"[..]);
        let mut buf = [0u8; 3];

        assert_eq!(source.read_at(&mut buf, 7).unwrap(), 3);
        assert_eq!(&buf, b"789");
        assert_eq!(source.position(), 0);

        // Past the end
        assert_eq!(source.read_at(&mut buf, 100).unwrap(), 0);
        source.seek(100).unwrap();
        assert_eq!(source.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_stream_source_is_forward_only() {
        let mut source = StreamSource::new(&b"abc"[..]);
        let mut buf = [0u8; 8];
        assert_eq!(source.read(&mut buf).unwrap(), 3);

        let err = source.seek(0).unwrap_err();
        assert!(matches!(err, OxiTarError::UnsupportedFeature { .. }));
        assert!(source.read_at(&mut buf, 0).is_err());
    }

    #[test]
    fn test_file_source_owned() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"file contents").unwrap();

        let mut source = FileSource::open(tmp.path()).unwrap();
        assert!(source.owns_handle());
        assert_eq!(source.path(), Some(tmp.path()));

        let mut buf = [0u8; 4];
        assert_eq!(source.read_at(&mut buf, 5).unwrap(), 4);
        assert_eq!(&buf, b"cont");

        // Sequential cursor was not moved by read_at
        assert_eq!(source.read(&mut buf).unwrap(), 4);
        assert_eq!(&buf, b"file");
    }

    #[test]
    fn test_file_source_borrowed_leaves_handle_open() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"borrowed").unwrap();
        let file = File::open(tmp.path()).unwrap();

        {
            let mut source = FileSource::borrowed(&file);
            assert_eq!(source.ownership(), Ownership::Borrowed);
            let mut buf = [0u8; 3];
            source.read(&mut buf).unwrap();
            assert_eq!(&buf, b"bor");
        }

        // The handle is still usable and shares the cursor.
        let mut rest = String::new();
        (&file).read_to_string(&mut rest).unwrap();
        assert_eq!(rest, "rowed");
    }

    #[test]
    fn test_file_source_open_missing() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.tar");
        let err = FileSource::open(&missing).unwrap_err();
        match err {
            OxiTarError::OpenFailed { path, source } => {
                assert_eq!(path, missing);
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
