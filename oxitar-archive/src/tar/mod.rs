//! TAR archive format support.
//!
//! This module provides streaming reading of TAR archives with support for:
//! - V7 and UStar (POSIX.1-1988) headers, including the 155-byte name prefix
//! - PAX extended headers (POSIX.1-2001), per-entry and global
//! - GNU long names, long link targets and base-256 numeric fields
//!
//! Writing archives is not supported.

pub mod header;
pub mod pax;
pub mod reader;

pub use header::{BLOCK_SIZE, RawHeader};
pub use pax::PendingOverrides;
pub use reader::{ArchiveReader, File, Next, ReaderOptions};
