//! Archive entry metadata.
//!
//! This module defines the [`Entry`] struct that describes one member of a
//! tar archive, along with its [`EntryType`] and the header [`Format`] it was
//! decoded from.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Entry type, decoded from the header typeflag byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EntryType {
    /// Regular file (`'0'`, NUL, or contiguous `'7'`).
    #[default]
    Regular,
    /// Directory (`'5'`).
    Directory,
    /// Symbolic link (`'2'`).
    Symlink,
    /// Hard link (`'1'`).
    Hardlink,
    /// Character device (`'3'`).
    CharDevice,
    /// Block device (`'4'`).
    BlockDevice,
    /// FIFO (`'6'`).
    Fifo,
    /// Pax extended header for the next entry (`'x'`).
    PaxExtended,
    /// Pax global extended header (`'g'`).
    PaxGlobal,
    /// GNU long name for the next entry (`'L'`).
    GnuLongName,
    /// GNU long link target for the next entry (`'K'`).
    GnuLongLink,
    /// Any other typeflag. Treated as a regular file when extracting.
    Unknown(u8),
}

impl EntryType {
    /// Map a typeflag byte.
    pub fn from_typeflag(flag: u8) -> Self {
        match flag {
            b'0' | 0 | b'7' => Self::Regular,
            b'1' => Self::Hardlink,
            b'2' => Self::Symlink,
            b'3' => Self::CharDevice,
            b'4' => Self::BlockDevice,
            b'5' => Self::Directory,
            b'6' => Self::Fifo,
            b'x' => Self::PaxExtended,
            b'g' => Self::PaxGlobal,
            b'L' => Self::GnuLongName,
            b'K' => Self::GnuLongLink,
            other => Self::Unknown(other),
        }
    }

    /// Check if the content should be treated as a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, Self::Regular | Self::Unknown(_))
    }

    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, Self::Directory)
    }

    /// Check if this is a symlink.
    pub fn is_symlink(&self) -> bool {
        matches!(self, Self::Symlink)
    }

    /// Check if this is a hard link.
    pub fn is_hardlink(&self) -> bool {
        matches!(self, Self::Hardlink)
    }

    /// Check if this header only carries metadata for a following header.
    pub fn is_meta(&self) -> bool {
        matches!(
            self,
            Self::PaxExtended | Self::PaxGlobal | Self::GnuLongName | Self::GnuLongLink
        )
    }

    /// Short name used in listings.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Regular => "file",
            Self::Directory => "dir",
            Self::Symlink => "symlink",
            Self::Hardlink => "hardlink",
            Self::CharDevice => "char",
            Self::BlockDevice => "block",
            Self::Fifo => "fifo",
            Self::PaxExtended => "pax",
            Self::PaxGlobal => "pax-global",
            Self::GnuLongName => "gnu-longname",
            Self::GnuLongLink => "gnu-longlink",
            Self::Unknown(_) => "unknown",
        }
    }
}

impl std::fmt::Display for EntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown(flag) => write!(f, "unknown({:#04x})", flag),
            _ => write!(f, "{}", self.name()),
        }
    }
}

/// Header layout variant an entry was decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Format {
    /// Pre-POSIX header without a magic string.
    #[default]
    V7,
    /// POSIX.1-1988 ustar.
    Ustar,
    /// Ustar header with pax extended records applied.
    Pax,
    /// GNU tar (`ustar  ` magic).
    Gnu,
}

impl Format {
    /// Get the format name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::V7 => "v7",
            Self::Ustar => "ustar",
            Self::Pax => "pax",
            Self::Gnu => "gnu",
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// An entry in a tar archive.
///
/// Names have already been resolved through any GNU long-name or pax
/// records and converted to platform separators.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// The path of the entry within the archive.
    pub name: PathBuf,
    /// Link target for symlinks and hard links (empty otherwise).
    pub linkname: PathBuf,
    /// Content size in bytes.
    pub size: u64,
    /// Unix mode bits.
    pub mode: u32,
    /// Owner user ID.
    pub uid: u32,
    /// Owner group ID.
    pub gid: u32,
    /// Last modification time.
    pub mtime: SystemTime,
    /// The type of entry.
    pub entry_type: EntryType,
    /// Header format.
    pub format: Format,
    /// Owner user name.
    pub uname: String,
    /// Owner group name.
    pub gname: String,
    /// Device major/minor numbers for character and block devices.
    pub device: Option<(u32, u32)>,
    /// Absolute stream offset of the header block.
    pub header_offset: u64,
    /// Absolute stream offset of the first content byte.
    pub data_offset: u64,
    /// Pax records that applied to this entry.
    pub extensions: BTreeMap<String, String>,
}

impl Entry {
    /// Create an entry with zeroed metadata.
    pub fn new(name: impl Into<PathBuf>, entry_type: EntryType) -> Self {
        Self {
            name: name.into(),
            linkname: PathBuf::new(),
            size: 0,
            mode: 0,
            uid: 0,
            gid: 0,
            mtime: UNIX_EPOCH,
            entry_type,
            format: Format::V7,
            uname: String::new(),
            gname: String::new(),
            device: None,
            header_offset: 0,
            data_offset: 0,
            extensions: BTreeMap::new(),
        }
    }

    /// Builder method to set the content size.
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    /// Builder method to set the mode.
    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = mode;
        self
    }

    /// Builder method to set the link target.
    pub fn with_linkname(mut self, linkname: impl Into<PathBuf>) -> Self {
        self.linkname = linkname.into();
        self
    }

    /// Check if this is a file (regular or unknown typeflag).
    pub fn is_file(&self) -> bool {
        self.entry_type.is_file()
    }

    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        self.entry_type.is_dir()
    }

    /// Link target, if this entry has one.
    pub fn link_target(&self) -> Option<&Path> {
        if self.linkname.as_os_str().is_empty() {
            None
        } else {
            Some(&self.linkname)
        }
    }

    /// Number of zero bytes following the content up to the block boundary.
    pub fn padding(&self) -> u64 {
        crate::block::padding_for(self.size)
    }

    /// Modification time as seconds since the Unix epoch (negative before it).
    pub fn mtime_secs(&self) -> i64 {
        match self.mtime.duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_secs() as i64,
            Err(e) => -(e.duration().as_secs_f64().ceil() as i64),
        }
    }

    /// Validate the entry path for extraction.
    ///
    /// Returns an error for absolute paths and `..` components.
    pub fn validate_path(&self) -> crate::error::Result<()> {
        use crate::error::OxiTarError;

        for component in self.name.components() {
            match component {
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(OxiTarError::path_traversal(&self.name));
                }
                Component::Normal(_) | Component::CurDir => {}
            }
        }
        Ok(())
    }

    /// Get a relative path that's safe to join onto an output directory.
    ///
    /// Drops `.`, `..` and any root or drive prefix.
    pub fn sanitized_name(&self) -> PathBuf {
        self.name
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    /// `ls -l` style mode string.
    pub fn mode_string(&self) -> String {
        let kind = match self.entry_type {
            EntryType::Directory => 'd',
            EntryType::Symlink => 'l',
            EntryType::Hardlink => 'h',
            EntryType::CharDevice => 'c',
            EntryType::BlockDevice => 'b',
            EntryType::Fifo => 'p',
            _ => '-',
        };
        let mut s = String::with_capacity(10);
        s.push(kind);
        for shift in [6u32, 3, 0] {
            let bits = (self.mode >> shift) & 0o7;
            s.push(if bits & 4 != 0 { 'r' } else { '-' });
            s.push(if bits & 2 != 0 { 'w' } else { '-' });
            s.push(if bits & 1 != 0 { 'x' } else { '-' });
        }
        s
    }
}

impl Default for Entry {
    fn default() -> Self {
        Self::new("", EntryType::Regular)
    }
}

impl std::fmt::Display for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}/{} {:>10} {}",
            self.mode_string(),
            self.uid,
            self.gid,
            self.size,
            self.name.display()
        )?;
        if let Some(target) = self.link_target() {
            write!(f, " -> {}", target.display())?;
        }
        Ok(())
    }
}
