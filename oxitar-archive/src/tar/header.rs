//! TAR header block decoding.
//!
//! One 512-byte block is decoded into a [`RawHeader`]: checksum validated,
//! format determined from the magic field, numeric fields decoded from octal
//! ASCII or GNU base-256.

use oxitar_core::error::{OxiTarError, Result};
use oxitar_core::{EntryType, Format};

pub use oxitar_core::block::{BLOCK_SIZE, padding_for};

/// Typeflag of a GNU sparse file.
pub const GNU_SPARSE: u8 = b'S';

const NAME: std::ops::Range<usize> = 0..100;
const MODE: std::ops::Range<usize> = 100..108;
const UID: std::ops::Range<usize> = 108..116;
const GID: std::ops::Range<usize> = 116..124;
const SIZE: std::ops::Range<usize> = 124..136;
const MTIME: std::ops::Range<usize> = 136..148;
const CHECKSUM: std::ops::Range<usize> = 148..156;
const TYPEFLAG: usize = 156;
const LINKNAME: std::ops::Range<usize> = 157..257;
const MAGIC: std::ops::Range<usize> = 257..263;
const VERSION: std::ops::Range<usize> = 263..265;
const UNAME: std::ops::Range<usize> = 265..297;
const GNAME: std::ops::Range<usize> = 297..329;
const DEVMAJOR: std::ops::Range<usize> = 329..337;
const DEVMINOR: std::ops::Range<usize> = 337..345;
const PREFIX: std::ops::Range<usize> = 345..500;

/// Header fields as stored in the block, before any extension records apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawHeader {
    /// Entry name (ustar prefix already joined).
    pub name: String,
    /// File mode.
    pub mode: u32,
    /// Owner UID.
    pub uid: u32,
    /// Owner GID.
    pub gid: u32,
    /// Content size.
    pub size: u64,
    /// Modification time in seconds since the epoch.
    pub mtime: i64,
    /// Stored checksum.
    pub checksum: u32,
    /// Raw typeflag byte.
    pub typeflag: u8,
    /// Decoded typeflag.
    pub entry_type: EntryType,
    /// Link target.
    pub linkname: String,
    /// Header format.
    pub format: Format,
    /// Owner user name.
    pub uname: String,
    /// Owner group name.
    pub gname: String,
    /// Device major number.
    pub devmajor: u32,
    /// Device minor number.
    pub devminor: u32,
}

impl RawHeader {
    /// Decode a header block.
    pub fn decode(block: &[u8; BLOCK_SIZE]) -> Result<Self> {
        Self::decode_at(block, 0)
    }

    /// Decode a header block read from absolute stream position `offset`.
    ///
    /// `offset` is only used to locate errors.
    pub fn decode_at(block: &[u8; BLOCK_SIZE], offset: u64) -> Result<Self> {
        let checksum = parse_octal(&block[CHECKSUM])
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| OxiTarError::corrupt(offset, "unreadable header checksum"))?;
        let (unsigned, signed) = checksums(block);
        if i64::from(checksum) != i64::from(unsigned) && i64::from(checksum) != signed {
            return Err(OxiTarError::corrupt(
                offset,
                format!("header checksum mismatch: stored {checksum:o}, computed {unsigned:o}"),
            ));
        }

        let format = detect_format(block);
        let typeflag = block[TYPEFLAG];
        let field = |range: std::ops::Range<usize>, what: &str| {
            parse_numeric(&block[range]).ok_or_else(|| {
                OxiTarError::corrupt(offset, format!("invalid numeric {what} field"))
            })
        };
        let unsigned_field = |range: std::ops::Range<usize>, what: &str| -> Result<u32> {
            let value = field(range, what)?;
            u32::try_from(value)
                .map_err(|_| OxiTarError::corrupt(offset, format!("{what} out of range: {value}")))
        };

        let mode = unsigned_field(MODE, "mode")?;
        let uid = unsigned_field(UID, "uid")?;
        let gid = unsigned_field(GID, "gid")?;
        let size = field(SIZE, "size")?;
        let size = u64::try_from(size)
            .map_err(|_| OxiTarError::corrupt(offset, format!("negative size: {size}")))?;
        let mtime = field(MTIME, "mtime")?;

        let mut name = parse_string(&block[NAME]);
        let linkname = parse_string(&block[LINKNAME]);

        let (uname, gname, devmajor, devminor) = match format {
            Format::V7 => (String::new(), String::new(), 0, 0),
            _ => (
                parse_string(&block[UNAME]),
                parse_string(&block[GNAME]),
                unsigned_field(DEVMAJOR, "devmajor")?,
                unsigned_field(DEVMINOR, "devminor")?,
            ),
        };

        // GNU headers reuse the prefix area for atime/ctime.
        if format == Format::Ustar {
            let prefix = parse_string(&block[PREFIX]);
            if !prefix.is_empty() {
                name = format!("{}/{}", prefix, name);
            }
        }

        Ok(Self {
            name,
            mode,
            uid,
            gid,
            size,
            mtime,
            checksum,
            typeflag,
            entry_type: EntryType::from_typeflag(typeflag),
            linkname,
            format,
            uname,
            gname,
            devmajor,
            devminor,
        })
    }

    /// Number of zero bytes padding the content to the block boundary.
    pub fn padding(&self) -> u64 {
        padding_for(self.size)
    }
}

/// Check whether a block is entirely zero.
pub fn is_zero_block(block: &[u8; BLOCK_SIZE]) -> bool {
    block.iter().all(|&b| b == 0)
}

/// Header checksums with the checksum field counted as spaces.
///
/// Returns the unsigned byte sum and the signed (`i8`) byte sum; historic
/// writers used either.
pub fn checksums(block: &[u8; BLOCK_SIZE]) -> (u32, i64) {
    let mut unsigned = 0u32;
    let mut signed = 0i64;
    for (i, &b) in block.iter().enumerate() {
        let b = if CHECKSUM.contains(&i) { b' ' } else { b };
        unsigned += u32::from(b);
        signed += i64::from(b as i8);
    }
    (unsigned, signed)
}

fn detect_format(block: &[u8; BLOCK_SIZE]) -> Format {
    let magic = &block[MAGIC];
    let version = &block[VERSION];
    if magic == b"ustar " && version == b" \0" {
        Format::Gnu
    } else if magic == b"ustar\0" || magic.starts_with(b"ustar") {
        Format::Ustar
    } else {
        Format::V7
    }
}

/// Parse a NUL-terminated string field.
pub(crate) fn parse_string(data: &[u8]) -> String {
    let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
    String::from_utf8_lossy(&data[..end]).into_owned()
}

/// Parse an octal ASCII field.
///
/// Leading spaces are skipped and the number ends at the first NUL or space.
/// An empty field is zero.
fn parse_octal(data: &[u8]) -> Option<u64> {
    let digits = data
        .iter()
        .skip_while(|&&b| b == b' ')
        .take_while(|&&b| b != 0 && b != b' ');
    let mut value = 0u64;
    for &b in digits {
        if !(b'0'..=b'7').contains(&b) {
            return None;
        }
        value = value.checked_mul(8)?.checked_add(u64::from(b - b'0'))?;
    }
    Some(value)
}

/// Parse a numeric field, octal or GNU base-256.
///
/// Base-256 is flagged by the high bit of the first byte; the remaining bits
/// form a big-endian two's-complement number, so a `0xff` lead byte is
/// negative.
pub(crate) fn parse_numeric(data: &[u8]) -> Option<i64> {
    let first = *data.first()?;
    if first & 0x80 == 0 {
        return parse_octal(data).and_then(|v| i64::try_from(v).ok());
    }

    let bits = data.len() * 8 - 1;
    if bits > 127 {
        return None;
    }
    let mut acc = u128::from(first & 0x7f);
    for &b in &data[1..] {
        acc = (acc << 8) | u128::from(b);
    }
    let value = if first & 0x40 != 0 {
        acc as i128 - (1i128 << bits)
    } else {
        acc as i128
    };
    i64::try_from(value).ok()
}
