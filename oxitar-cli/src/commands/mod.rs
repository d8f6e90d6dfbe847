//! Command implementations for OxiTar CLI.

pub mod extract;
pub mod info;
pub mod list;
pub mod test;

pub use extract::cmd_extract;
pub use info::cmd_info;
pub use list::cmd_list;
pub use test::cmd_test;

use oxitar_archive::tar::{ArchiveReader, ReaderOptions};
use oxitar_core::error::Result;
use oxitar_core::source::{ByteSource, FileSource};
use std::path::Path;

/// Reader over whichever source the command line selected.
pub type Archive = ArchiveReader<Box<dyn ByteSource>>;

/// How commands open their archive.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenOptions {
    pub reader: ReaderOptions,
    /// Map the file instead of reading it (needs the `mmap` feature).
    pub mmap: bool,
}

/// Open an archive for streaming.
pub fn open_archive(path: &Path, options: &OpenOptions) -> Result<Archive> {
    #[cfg(feature = "mmap")]
    if options.mmap {
        let source = oxitar_core::mmap::MmapSource::open(path)?;
        log::debug!("mapped {} ({} bytes)", path.display(), source.len());
        let source: Box<dyn ByteSource> = Box::new(source);
        return Ok(ArchiveReader::with_options(source, options.reader));
    }
    #[cfg(not(feature = "mmap"))]
    if options.mmap {
        log::warn!("built without mmap support, reading {} instead", path.display());
    }

    let source: Box<dyn ByteSource> = Box::new(FileSource::open(path)?);
    Ok(ArchiveReader::with_options(source, options.reader))
}
