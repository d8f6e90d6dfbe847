//! # OxiTar Archive
//!
//! Streaming TAR reading for OxiTar.
//!
//! An [`ArchiveReader`] pulls 512-byte blocks from any
//! [`ByteSource`](oxitar_core::ByteSource) and yields entries in physical
//! order, each with a content reader bounded by the entry size. Compressed
//! archives are read by wrapping the decompressor in a
//! [`StreamSource`](oxitar_core::StreamSource).
//!
//! ## Example
//!
//! ```rust,no_run
//! use oxitar_archive::{ArchiveReader, Next};
//! use std::io;
//!
//! let mut archive = ArchiveReader::open("archive.tar").unwrap();
//! while let Next::Entry(mut file) = archive.next_entry().unwrap() {
//!     println!("{}", file.entry());
//!     file.copy_to(&mut io::sink()).unwrap();
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod tar;

// Re-exports
pub use tar::{ArchiveReader, File, Next, RawHeader, ReaderOptions};
