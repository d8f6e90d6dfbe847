//! # OxiTar Core
//!
//! Core components for the OxiTar archive reader.
//!
//! This crate provides the format-agnostic building blocks:
//!
//! - [`source`]: The [`ByteSource`] trait and file, memory and stream adapters
//! - [`block`]: [`BlockReader`], full reads over sources that return short reads
//! - [`entry`]: Archive entry metadata
//! - [`path`]: Archive name to platform path conversion
//! - [`error`]: Error types
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ L3: Driver                                              │
//! │     CLI list / test / extract                           │
//! ├─────────────────────────────────────────────────────────┤
//! │ L2: Container                                           │
//! │     TAR header decoding, pax records, ArchiveReader     │
//! ├─────────────────────────────────────────────────────────┤
//! │ L1: Transport (this crate)                              │
//! │     ByteSource, BlockReader, Entry, errors              │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use oxitar_core::block::BlockReader;
//! use oxitar_core::source::MemorySource;
//!
//! let mut reader = BlockReader::new(MemorySource::new(vec![0u8; 700]));
//! let mut block = [0u8; 512];
//! assert_eq!(reader.read_full(&mut block).unwrap(), 512);
//! assert_eq!(reader.read_full(&mut block).unwrap(), 188);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod block;
pub mod entry;
pub mod error;
#[cfg(feature = "mmap")]
pub mod mmap;
pub mod path;
pub mod source;

// Re-exports for convenience
pub use block::BlockReader;
pub use entry::{Entry, EntryType, Format};
pub use error::{ErrorKind, OxiTarError, Result};
#[cfg(feature = "mmap")]
pub use mmap::MmapSource;
pub use path::normalize_separators;
pub use source::{ByteSource, FileSource, MemorySource, Ownership, StreamSource};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::block::BlockReader;
    pub use crate::entry::{Entry, EntryType, Format};
    pub use crate::error::{OxiTarError, Result};
    pub use crate::source::{ByteSource, FileSource, MemorySource, StreamSource};
}
