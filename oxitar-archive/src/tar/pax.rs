//! Extension records carried by meta-entries.
//!
//! GNU long-name (`L`) and long-link (`K`) entries carry a NUL-terminated
//! path; pax (`x`, `g`) entries carry `"<len> <key>=<value>\n"` records. Both
//! are collected into [`PendingOverrides`] and applied to the next real
//! header.

use log::warn;
use oxitar_core::error::{OxiTarError, Result};
use std::collections::BTreeMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Pax key overriding the entry path.
pub const PAX_PATH: &str = "path";
/// Pax key overriding the link target.
pub const PAX_LINKPATH: &str = "linkpath";
/// Pax key overriding the content size.
pub const PAX_SIZE: &str = "size";
/// Pax key overriding the modification time.
pub const PAX_MTIME: &str = "mtime";
/// Pax key overriding the owner UID.
pub const PAX_UID: &str = "uid";
/// Pax key overriding the owner GID.
pub const PAX_GID: &str = "gid";
/// Pax key overriding the owner user name.
pub const PAX_UNAME: &str = "uname";
/// Pax key overriding the owner group name.
pub const PAX_GNAME: &str = "gname";
/// Prefix of the GNU sparse-file pax keys.
pub const PAX_GNU_SPARSE: &str = "GNU.sparse.";

/// Overrides collected from meta-entries, waiting for the next real header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingOverrides {
    /// Payload of a GNU long-name entry.
    pub long_name: Option<String>,
    /// Payload of a GNU long-link entry.
    pub long_link: Option<String>,
    /// Pax records from per-entry extended headers, later ones winning.
    pub pax: BTreeMap<String, String>,
}

impl PendingOverrides {
    /// Check if nothing has been collected.
    pub fn is_empty(&self) -> bool {
        self.long_name.is_none() && self.long_link.is_none() && self.pax.is_empty()
    }

    /// Merge pax records, replacing earlier values for the same key.
    pub fn merge_pax(&mut self, records: impl IntoIterator<Item = (String, String)>) {
        self.pax.extend(records);
    }
}

/// Decode a GNU long-name/long-link payload.
///
/// The name runs up to the first NUL; everything is kept verbatim.
pub fn parse_long_name(payload: &[u8]) -> String {
    let end = payload.iter().position(|&b| b == 0).unwrap_or(payload.len());
    String::from_utf8_lossy(&payload[..end]).into_owned()
}

/// Parse a pax extended header payload.
///
/// `offset` is the stream position of the payload and is only used in
/// errors. A record whose declared length does not end on a newline is
/// tolerated by falling back to the next newline.
pub fn parse_records(data: &[u8], offset: u64) -> Result<Vec<(String, String)>> {
    let mut records = Vec::new();
    let mut pos = 0;

    while pos < data.len() {
        // Trailing NUL padding inside the declared payload
        if data[pos..].iter().all(|&b| b == 0) {
            break;
        }
        let at = offset + pos as u64;

        let space = data[pos..]
            .iter()
            .position(|&b| b == b' ')
            .map(|p| pos + p)
            .ok_or_else(|| OxiTarError::corrupt(at, "pax record without length"))?;
        let declared: usize = std::str::from_utf8(&data[pos..space])
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|&len| len > space - pos)
            .ok_or_else(|| OxiTarError::corrupt(at, "invalid pax record length"))?;

        let mut end = pos + declared;
        if end > data.len() || data[end - 1] != b'\n' {
            end = data[space..]
                .iter()
                .position(|&b| b == b'\n')
                .map(|p| space + p + 1)
                .ok_or_else(|| OxiTarError::corrupt(at, "unterminated pax record"))?;
            warn!(
                "pax record at offset {} declares {} bytes but spans {}",
                at,
                declared,
                end - pos
            );
        }

        let record = &data[space + 1..end - 1];
        let eq = record
            .iter()
            .position(|&b| b == b'=')
            .ok_or_else(|| OxiTarError::corrupt(at, "pax record without '='"))?;
        let key = String::from_utf8_lossy(&record[..eq]).into_owned();
        let value = String::from_utf8_lossy(&record[eq + 1..]).into_owned();
        records.push((key, value));

        pos = end;
    }

    Ok(records)
}

/// Parse a pax time value: decimal seconds with an optional fraction.
pub fn parse_pax_time(value: &str) -> Option<SystemTime> {
    let (negative, digits) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value),
    };
    let (secs, frac) = match digits.split_once('.') {
        Some((secs, frac)) => (secs, frac),
        None => (digits, ""),
    };
    if secs.is_empty() || !secs.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let secs: u64 = secs.parse().ok()?;
    let mut nanos = 0u32;
    for (i, b) in frac.bytes().take(9).enumerate() {
        nanos += u32::from(b - b'0') * 10u32.pow(8 - i as u32);
    }

    let offset = Duration::new(secs, nanos);
    if negative {
        UNIX_EPOCH.checked_sub(offset)
    } else {
        UNIX_EPOCH.checked_add(offset)
    }
}

/// Convert header seconds to a timestamp.
pub fn time_from_secs(secs: i64) -> Option<SystemTime> {
    let offset = Duration::from_secs(secs.unsigned_abs());
    if secs < 0 {
        UNIX_EPOCH.checked_sub(offset)
    } else {
        UNIX_EPOCH.checked_add(offset)
    }
}
