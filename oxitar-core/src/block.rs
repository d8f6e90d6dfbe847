//! Full-block reads over a [`ByteSource`].
//!
//! Transports are free to hand back data in arbitrarily small chunks (a
//! decompressor may produce one byte at a time). [`BlockReader`] hides that
//! from the parser: a request is only cut short when the source reports end
//! of stream.

use crate::error::Result;
use crate::source::ByteSource;

/// Size of a tar block.
pub const BLOCK_SIZE: usize = 512;

/// Zero bytes needed after `size` content bytes to reach a block boundary.
pub fn padding_for(size: u64) -> u64 {
    let block = BLOCK_SIZE as u64;
    (block - size % block) % block
}

/// Scratch size used when skipping data.
const SKIP_CHUNK: usize = 8192;

/// A reader that keeps calling its source until a buffer is full.
#[derive(Debug)]
pub struct BlockReader<S> {
    source: S,
    position: u64,
}

impl<S: ByteSource> BlockReader<S> {
    /// Wrap a source whose cursor is at stream position 0.
    pub fn new(source: S) -> Self {
        Self::with_position(source, 0)
    }

    /// Wrap a source whose cursor is already at `position`.
    pub fn with_position(source: S, position: u64) -> Self {
        Self { source, position }
    }

    /// Absolute stream position of the next byte to be read.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Read until `buf` is full or the source reaches end of stream.
    ///
    /// Returns the number of bytes obtained; anything less than `buf.len()`
    /// means the stream ended. An error from the source is returned as-is and
    /// the partially filled buffer must be considered garbage.
    pub fn read_full(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.source.read(&mut buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
            self.position += n as u64;
        }
        Ok(filled)
    }

    /// Read at most `buf.len()` bytes with a single call to the source.
    pub fn read_some(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = self.source.read(buf)?;
        self.position += n as u64;
        Ok(n)
    }

    /// Discard `count` bytes by reading them.
    ///
    /// Returns the number of bytes actually skipped, which is smaller than
    /// `count` only when the stream ended.
    pub fn skip(&mut self, count: u64) -> Result<u64> {
        let mut scratch = [0u8; SKIP_CHUNK];
        let mut skipped = 0u64;
        while skipped < count {
            let want = (count - skipped).min(SKIP_CHUNK as u64) as usize;
            let got = self.read_full(&mut scratch[..want])?;
            skipped += got as u64;
            if got < want {
                break;
            }
        }
        Ok(skipped)
    }

    /// Get a reference to the underlying source.
    pub fn get_ref(&self) -> &S {
        &self.source
    }

    /// Get a mutable reference to the underlying source.
    ///
    /// Reading through it desynchronizes [`BlockReader::position`].
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Consume the reader and return the source.
    pub fn into_inner(self) -> S {
        self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OxiTarError;
    use crate::source::MemorySource;

    #[test]
    fn test_padding_for() {
        assert_eq!(padding_for(0), 0);
        assert_eq!(padding_for(1), 511);
        assert_eq!(padding_for(BLOCK_SIZE as u64), 0);
        assert_eq!(padding_for(u64::MAX), 1);
    }

    /// Hands out at most `chunk` bytes per call.
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        chunk: usize,
    }

    impl ByteSource for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
            let n = buf.len().min(self.chunk).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }

        fn read_at(&mut self, _buf: &mut [u8], _pos: u64) -> Result<usize> {
            Err(OxiTarError::unsupported("read_at"))
        }

        fn seek(&mut self, _pos: u64) -> Result<()> {
            Err(OxiTarError::unsupported("seek"))
        }
    }

    struct Failing;

    impl ByteSource for Failing {
        fn read(&mut self, _buf: &mut [u8]) -> Result<usize> {
            Err(std::io::Error::other("link down").into())
        }

        fn read_at(&mut self, _buf: &mut [u8], _pos: u64) -> Result<usize> {
            Err(std::io::Error::other("link down").into())
        }

        fn seek(&mut self, _pos: u64) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_read_full_assembles_single_bytes() {
        let data: Vec<u8> = (0..1024).map(|i| i as u8).collect();
        let mut reader = BlockReader::new(Trickle {
            data: data.clone(),
            pos: 0,
            chunk: 1,
        });

        let mut block = [0u8; 512];
        assert_eq!(reader.read_full(&mut block).unwrap(), 512);
        assert_eq!(&block[..], &data[..512]);
        assert_eq!(reader.position(), 512);
    }

    #[test]
    fn test_read_full_short_at_end() {
        let mut reader = BlockReader::new(MemorySource::new(vec![7u8; 100]));
        let mut block = [0u8; 512];
        assert_eq!(reader.read_full(&mut block).unwrap(), 100);
        assert_eq!(reader.read_full(&mut block).unwrap(), 0);
    }

    #[test]
    fn test_read_full_propagates_errors() {
        let mut reader = BlockReader::new(Failing);
        let mut block = [0u8; 512];
        let err = reader.read_full(&mut block).unwrap_err();
        assert!(matches!(err, OxiTarError::Io(_)));
    }

    #[test]
    fn test_skip() {
        let mut reader = BlockReader::new(Trickle {
            data: vec![1u8; 20_000],
            pos: 0,
            chunk: 3000,
        });
        assert_eq!(reader.skip(19_000).unwrap(), 19_000);
        assert_eq!(reader.position(), 19_000);
        assert_eq!(reader.skip(5_000).unwrap(), 1_000);
    }
}
