//! Streaming TAR reader.
//!
//! [`ArchiveReader`] walks an archive block by block. Each call to
//! [`ArchiveReader::next_entry`] skips whatever the caller left unread of the
//! previous entry, folds any GNU long-name or pax meta-entries into the next
//! real header, and hands back a [`File`] whose content reads are bounded by
//! the entry size.
//!
//! # Example
//!
//! ```no_run
//! use oxitar_archive::tar::{ArchiveReader, Next};
//!
//! let mut archive = ArchiveReader::open("archive.tar")?;
//! while let Next::Entry(mut file) = archive.next_entry()? {
//!     let data = file.read_to_vec()?;
//!     println!("{} ({} bytes)", file.entry().name.display(), data.len());
//! }
//! # Ok::<(), oxitar_core::OxiTarError>(())
//! ```

use super::header::{BLOCK_SIZE, GNU_SPARSE, RawHeader, is_zero_block};
use super::pax::{
    PAX_GID, PAX_GNAME, PAX_GNU_SPARSE, PAX_LINKPATH, PAX_MTIME, PAX_PATH, PAX_SIZE, PAX_UID,
    PAX_UNAME, PendingOverrides, parse_long_name, parse_pax_time, parse_records, time_from_secs,
};
use log::{debug, trace, warn};
use oxitar_core::block::BlockReader;
use oxitar_core::error::{OxiTarError, Result};
use oxitar_core::path::normalize_separators;
use oxitar_core::source::{ByteSource, FileSource};
use oxitar_core::{Entry, EntryType, Format};
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::Path;

/// Default cap on the payload of a single meta-entry.
pub const DEFAULT_MAX_EXTENSION_SIZE: u64 = 1024 * 1024;

/// Reader configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderOptions {
    /// Largest pax or GNU long-name payload accepted, in bytes.
    pub max_extension_size: u64,
    /// Drop pax global (`g`) records instead of applying them.
    pub ignore_global_extensions: bool,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            max_extension_size: DEFAULT_MAX_EXTENSION_SIZE,
            ignore_global_extensions: false,
        }
    }
}

impl ReaderOptions {
    /// Create the default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the largest accepted meta-entry payload.
    pub fn with_max_extension_size(mut self, size: u64) -> Self {
        self.max_extension_size = size;
        self
    }

    /// Ignore pax global extended headers.
    pub fn with_ignore_global_extensions(mut self, ignore: bool) -> Self {
        self.ignore_global_extensions = ignore;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    ExpectHeader,
    AccumulatingOverride,
    EmittingContent,
    EndOfArchive,
    Failed,
}

/// Outcome of [`ArchiveReader::next_entry`].
#[derive(Debug)]
pub enum Next<'a, S: ByteSource> {
    /// The next entry, with its content reader.
    Entry(File<'a, S>),
    /// The end-of-archive marker was reached.
    EndOfArchive,
}

impl<'a, S: ByteSource> Next<'a, S> {
    /// Convert into the entry, if there is one.
    pub fn into_file(self) -> Option<File<'a, S>> {
        match self {
            Self::Entry(file) => Some(file),
            Self::EndOfArchive => None,
        }
    }

    /// Check if this is the end of the archive.
    pub fn is_end(&self) -> bool {
        matches!(self, Self::EndOfArchive)
    }
}

/// Streaming TAR archive reader.
#[derive(Debug)]
pub struct ArchiveReader<S> {
    reader: BlockReader<S>,
    options: ReaderOptions,
    state: State,
    /// Unread content bytes of the current entry.
    remaining: u64,
    /// Padding after the current entry's content.
    padding: u64,
    pending: PendingOverrides,
    globals: BTreeMap<String, String>,
}

impl ArchiveReader<FileSource<'static>> {
    /// Open an archive file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(FileSource::open(path)?))
    }
}

impl<S: ByteSource> ArchiveReader<S> {
    /// Create a reader over a source positioned at the start of the archive.
    pub fn new(source: S) -> Self {
        Self::with_options(source, ReaderOptions::default())
    }

    /// Create a reader with explicit options.
    pub fn with_options(source: S, options: ReaderOptions) -> Self {
        Self {
            reader: BlockReader::new(source),
            options,
            state: State::ExpectHeader,
            remaining: 0,
            padding: 0,
            pending: PendingOverrides::default(),
            globals: BTreeMap::new(),
        }
    }

    /// Options in effect.
    pub fn options(&self) -> &ReaderOptions {
        &self.options
    }

    /// Number of bytes consumed from the source so far.
    pub fn position(&self) -> u64 {
        self.reader.position()
    }

    /// Check if the end-of-archive marker has been reached.
    pub fn is_finished(&self) -> bool {
        self.state == State::EndOfArchive
    }

    /// Pax global records collected so far.
    pub fn global_extensions(&self) -> &BTreeMap<String, String> {
        &self.globals
    }

    /// Consume the reader and return the source.
    pub fn into_inner(self) -> S {
        self.reader.into_inner()
    }

    /// Advance to the next entry.
    ///
    /// Unread content of the previous entry is skipped first. Once the end of
    /// the archive is reached every further call returns
    /// [`Next::EndOfArchive`]. Any error is fatal: later calls fail without
    /// touching the source.
    pub fn next_entry(&mut self) -> Result<Next<'_, S>> {
        match self.state {
            State::EndOfArchive => return Ok(Next::EndOfArchive),
            State::Failed => {
                return Err(OxiTarError::corrupt(
                    self.position(),
                    "reader halted by an earlier error",
                ));
            }
            _ => {}
        }

        match self.advance() {
            Ok(Some(entry)) => Ok(Next::Entry(File {
                entry,
                archive: self,
            })),
            Ok(None) => Ok(Next::EndOfArchive),
            Err(e) => {
                self.state = State::Failed;
                Err(e)
            }
        }
    }

    /// Read the metadata of every remaining entry, skipping content.
    pub fn collect_entries(&mut self) -> Result<Vec<Entry>> {
        let mut entries = Vec::new();
        while let Next::Entry(file) = self.next_entry()? {
            entries.push(file.into_entry());
        }
        Ok(entries)
    }

    fn advance(&mut self) -> Result<Option<Entry>> {
        self.skip_remainder()?;

        let mut block = [0u8; BLOCK_SIZE];
        loop {
            self.state = State::ExpectHeader;
            let mut header_offset = self.position();
            self.read_block(&mut block)?;

            if is_zero_block(&block) {
                self.read_block(&mut block)?;
                if is_zero_block(&block) {
                    debug!("end of archive at offset {}", header_offset);
                    self.state = State::EndOfArchive;
                    return Ok(None);
                }
                warn!("ignoring lone zero block at offset {}", header_offset);
                header_offset += BLOCK_SIZE as u64;
            }

            let header = RawHeader::decode_at(&block, header_offset)?;
            trace!(
                "header at {}: {:?} {} ({} bytes)",
                header_offset, header.name, header.entry_type, header.size
            );

            if header.entry_type.is_meta() {
                self.state = State::AccumulatingOverride;
                self.accumulate(&header)?;
                continue;
            }

            let entry = self.resolve(header, header_offset)?;
            self.remaining = entry.size;
            self.padding = entry.padding();
            self.state = State::EmittingContent;
            return Ok(Some(entry));
        }
    }

    /// Read one full block; a short block means the archive was cut off.
    fn read_block(&mut self, block: &mut [u8; BLOCK_SIZE]) -> Result<()> {
        let got = self.reader.read_full(block)?;
        if got < BLOCK_SIZE {
            return Err(OxiTarError::truncated(
                self.position(),
                (BLOCK_SIZE - got) as u64,
            ));
        }
        Ok(())
    }

    fn skip_remainder(&mut self) -> Result<()> {
        let want = self.remaining.checked_add(self.padding).ok_or_else(|| {
            OxiTarError::corrupt(self.position(), "entry size overflows the stream offset")
        })?;
        if want > 0 {
            let skipped = self.reader.skip(want)?;
            if skipped < want {
                return Err(OxiTarError::truncated(self.position(), want - skipped));
            }
        }
        self.remaining = 0;
        self.padding = 0;
        Ok(())
    }

    /// Read a meta-entry payload and fold it into the pending overrides.
    fn accumulate(&mut self, header: &RawHeader) -> Result<()> {
        let data_offset = self.position();
        if header.size > self.options.max_extension_size {
            return Err(OxiTarError::corrupt(
                data_offset,
                format!(
                    "{} payload of {} bytes exceeds limit of {}",
                    header.entry_type, header.size, self.options.max_extension_size
                ),
            ));
        }

        let mut payload = vec![0u8; header.size as usize];
        let got = self.reader.read_full(&mut payload)?;
        if got < payload.len() {
            return Err(OxiTarError::truncated(
                self.position(),
                (payload.len() - got) as u64,
            ));
        }
        self.padding = header.padding();
        self.skip_remainder()?;

        match header.entry_type {
            EntryType::GnuLongName => {
                let name = parse_long_name(&payload);
                debug!("GNU long name ({} bytes)", name.len());
                self.pending.long_name = Some(name);
            }
            EntryType::GnuLongLink => {
                let link = parse_long_name(&payload);
                debug!("GNU long link ({} bytes)", link.len());
                self.pending.long_link = Some(link);
            }
            EntryType::PaxExtended => {
                let records = parse_records(&payload, data_offset)?;
                debug!("pax extended header with {} records", records.len());
                self.pending.merge_pax(records);
            }
            EntryType::PaxGlobal => {
                let records = parse_records(&payload, data_offset)?;
                if self.options.ignore_global_extensions {
                    debug!("ignoring pax global header with {} records", records.len());
                } else {
                    debug!("pax global header with {} records", records.len());
                    for (key, value) in records {
                        if value.is_empty() {
                            self.globals.remove(&key);
                        } else {
                            self.globals.insert(key, value);
                        }
                    }
                }
            }
            other => unreachable!("not a meta entry: {other}"),
        }
        Ok(())
    }

    /// Apply pending overrides to a real header and build the entry.
    fn resolve(&mut self, header: RawHeader, header_offset: u64) -> Result<Entry> {
        let pending = std::mem::take(&mut self.pending);

        let mut extensions = if self.options.ignore_global_extensions {
            BTreeMap::new()
        } else {
            self.globals.clone()
        };
        for (key, value) in pending.pax {
            // An empty value cancels the record and falls back to the header field.
            if value.is_empty() {
                extensions.remove(&key);
            } else {
                extensions.insert(key, value);
            }
        }

        if header.typeflag == GNU_SPARSE || extensions.keys().any(|k| k.starts_with(PAX_GNU_SPARSE))
        {
            return Err(OxiTarError::unsupported(format!(
                "GNU sparse file {:?} at offset {}",
                header.name, header_offset
            )));
        }

        let corrupt = |key: &str, value: &str| {
            OxiTarError::corrupt(header_offset, format!("invalid pax {key} value {value:?}"))
        };

        let mut name = header.name;
        let mut linkname = header.linkname;
        let mut size = header.size;
        let mut uid = header.uid;
        let mut gid = header.gid;
        let mut uname = header.uname;
        let mut gname = header.gname;
        let mut mtime = time_from_secs(header.mtime).ok_or_else(|| {
            OxiTarError::corrupt(header_offset, format!("mtime out of range: {}", header.mtime))
        })?;

        for (key, value) in &extensions {
            let (key, value) = (key.as_str(), value.as_str());
            match key {
                PAX_PATH => name = value.to_string(),
                PAX_LINKPATH => linkname = value.to_string(),
                PAX_SIZE => {
                    // Same range as the header field, which is a signed 64-bit number.
                    size = value
                        .parse::<i64>()
                        .ok()
                        .and_then(|v| u64::try_from(v).ok())
                        .ok_or_else(|| corrupt(key, value))?;
                }
                PAX_MTIME => mtime = parse_pax_time(value).ok_or_else(|| corrupt(key, value))?,
                PAX_UID => uid = value.parse().map_err(|_| corrupt(key, value))?,
                PAX_GID => gid = value.parse().map_err(|_| corrupt(key, value))?,
                PAX_UNAME => uname = value.to_string(),
                PAX_GNAME => gname = value.to_string(),
                _ => {}
            }
        }

        if let Some(long_name) = pending.long_name {
            name = long_name;
        }
        if let Some(long_link) = pending.long_link {
            linkname = long_link;
        }

        if name.is_empty() {
            return Err(OxiTarError::corrupt(header_offset, "entry has an empty name"));
        }
        if let EntryType::Unknown(flag) = header.entry_type {
            warn!(
                "unknown typeflag {:#04x} for {:?}, treating as a regular file",
                flag, name
            );
        }

        let format = if extensions.is_empty() {
            header.format
        } else {
            Format::Pax
        };
        let device = match header.entry_type {
            EntryType::CharDevice | EntryType::BlockDevice => {
                Some((header.devmajor, header.devminor))
            }
            _ => None,
        };

        Ok(Entry {
            name: normalize_separators(&name),
            linkname: normalize_separators(&linkname),
            size,
            mode: header.mode,
            uid,
            gid,
            mtime,
            entry_type: header.entry_type,
            format,
            uname,
            gname,
            device,
            header_offset,
            data_offset: header_offset + BLOCK_SIZE as u64,
            extensions,
        })
    }

    /// Read content of the current entry, bounded by its remaining size.
    fn read_content(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.state != State::EmittingContent || self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }

        let want = buf.len().min(usize::try_from(self.remaining).unwrap_or(usize::MAX));
        let got = match self.reader.read_some(&mut buf[..want]) {
            Ok(0) => Err(OxiTarError::truncated(self.position(), self.remaining)),
            other => other,
        };
        match got {
            Ok(n) => {
                self.remaining -= n as u64;
                Ok(n)
            }
            Err(e) => {
                self.state = State::Failed;
                Err(e)
            }
        }
    }
}

/// An entry together with a bounded reader over its content.
///
/// The reader is borrowed mutably, so the archive cannot advance while a
/// `File` is alive. Dropping a partially read `File` is fine; the next call
/// to [`ArchiveReader::next_entry`] skips the rest.
#[derive(Debug)]
pub struct File<'a, S: ByteSource> {
    entry: Entry,
    archive: &'a mut ArchiveReader<S>,
}

impl<S: ByteSource> File<'_, S> {
    /// Entry metadata.
    pub fn entry(&self) -> &Entry {
        &self.entry
    }

    /// Drop the content reader and keep the metadata.
    pub fn into_entry(self) -> Entry {
        self.entry
    }

    /// Content bytes not yet read.
    pub fn remaining(&self) -> u64 {
        self.archive.remaining
    }

    /// Read up to `buf.len()` content bytes.
    ///
    /// Returns 0 once the declared size has been read.
    pub fn read_content(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.archive.read_content(buf)
    }

    /// Read the rest of the content into a vector.
    pub fn read_to_vec(&mut self) -> Result<Vec<u8>> {
        let mut data = Vec::with_capacity(self.remaining().min(DEFAULT_MAX_EXTENSION_SIZE) as usize);
        self.copy_to(&mut data)?;
        Ok(data)
    }

    /// Copy the rest of the content to a writer.
    pub fn copy_to<W: Write>(&mut self, writer: &mut W) -> Result<u64> {
        let mut buffer = [0u8; 8192];
        let mut written = 0u64;
        loop {
            let n = self.read_content(&mut buffer)?;
            if n == 0 {
                break;
            }
            writer.write_all(&buffer[..n])?;
            written += n as u64;
        }
        Ok(written)
    }
}

impl<S: ByteSource> io::Read for File<'_, S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_content(buf).map_err(io::Error::from)
    }
}
