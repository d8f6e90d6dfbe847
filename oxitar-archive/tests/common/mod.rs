//! Archive construction helpers shared by the integration tests.
//!
//! The crate only reads archives, so tests assemble the blocks by hand.

#![allow(dead_code)]

use oxitar_core::error::Result;
use oxitar_core::source::ByteSource;

pub const BLOCK_SIZE: usize = 512;

/// Byte offset of the checksum field.
pub const CHECKSUM_OFFSET: usize = 148;

/// Fixed mtime used by [`ustar_header`].
pub const MTIME: u64 = 1_600_000_000;

/// Build a ustar header block with a valid checksum.
pub fn ustar_header(name: &str, size: u64, typeflag: u8) -> [u8; BLOCK_SIZE] {
    let mut block = [0u8; BLOCK_SIZE];
    write_string(&mut block[0..100], name);
    write_octal(&mut block[100..108], 0o644);
    write_octal(&mut block[108..116], 1000);
    write_octal(&mut block[116..124], 1000);
    write_octal(&mut block[124..136], size);
    write_octal(&mut block[136..148], MTIME);
    block[156] = typeflag;
    block[257..263].copy_from_slice(b"ustar\0");
    block[263..265].copy_from_slice(b"00");
    write_string(&mut block[265..297], "builder");
    write_string(&mut block[297..329], "builder");
    seal(&mut block);
    block
}

/// Build a GNU-format header block with a valid checksum.
pub fn gnu_header(name: &str, size: u64, typeflag: u8) -> [u8; BLOCK_SIZE] {
    let mut block = ustar_header(name, size, typeflag);
    block[257..263].copy_from_slice(b"ustar ");
    block[263..265].copy_from_slice(b" \0");
    seal(&mut block);
    block
}

/// Recompute and store the header checksum.
pub fn seal(block: &mut [u8; BLOCK_SIZE]) {
    block[148..156].copy_from_slice(b"        ");
    let checksum: u32 = block.iter().map(|&b| b as u32).sum();
    let checksum_str = format!("{:06o}\0 ", checksum);
    block[148..156].copy_from_slice(checksum_str.as_bytes());
}

/// Copy as much of `s` as fits; longer names are truncated like old writers do.
fn write_string(field: &mut [u8], s: &str) {
    let bytes = s.as_bytes();
    let len = bytes.len().min(field.len());
    field[..len].copy_from_slice(&bytes[..len]);
}

fn write_octal(field: &mut [u8], value: u64) {
    let s = format!("{:0width$o}", value, width = field.len() - 1);
    field[..s.len()].copy_from_slice(s.as_bytes());
}

/// Format a single pax record: "len key=value\n".
pub fn format_pax_record(key: &str, value: &str) -> String {
    // The length counts its own digits.
    let base_len = key.len() + value.len() + 3;
    let mut total_len = base_len + 1;
    loop {
        let expected = base_len + total_len.to_string().len();
        if expected == total_len {
            break;
        }
        total_len = expected;
    }
    format!("{} {}={}\n", total_len, key, value)
}

/// Appends entries block by block.
#[derive(Default)]
pub struct TarBuilder {
    data: Vec<u8>,
}

impl TarBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a header block followed by padded content.
    pub fn raw(mut self, header: &[u8; BLOCK_SIZE], content: &[u8]) -> Self {
        self.data.extend_from_slice(header);
        self.data.extend_from_slice(content);
        let padding = (BLOCK_SIZE - content.len() % BLOCK_SIZE) % BLOCK_SIZE;
        self.data.extend(std::iter::repeat_n(0u8, padding));
        self
    }

    pub fn file(self, name: &str, content: &[u8]) -> Self {
        let header = ustar_header(name, content.len() as u64, b'0');
        self.raw(&header, content)
    }

    pub fn dir(self, name: &str) -> Self {
        let mut header = ustar_header(name, 0, b'5');
        write_octal(&mut header[100..108], 0o755);
        seal(&mut header);
        self.raw(&header, &[])
    }

    pub fn symlink(self, name: &str, target: &str) -> Self {
        let mut header = ustar_header(name, 0, b'2');
        write_string(&mut header[157..257], target);
        seal(&mut header);
        self.raw(&header, &[])
    }

    pub fn pax(self, records: &[(&str, &str)]) -> Self {
        self.pax_with_flag(records, b'x')
    }

    pub fn pax_global(self, records: &[(&str, &str)]) -> Self {
        self.pax_with_flag(records, b'g')
    }

    fn pax_with_flag(self, records: &[(&str, &str)], typeflag: u8) -> Self {
        let payload: String = records
            .iter()
            .map(|(k, v)| format_pax_record(k, v))
            .collect();
        let header = ustar_header("PaxHeader", payload.len() as u64, typeflag);
        self.raw(&header, payload.as_bytes())
    }

    pub fn gnu_long_name(self, name: &str) -> Self {
        self.gnu_meta(name, b'L')
    }

    pub fn gnu_long_link(self, target: &str) -> Self {
        self.gnu_meta(target, b'K')
    }

    fn gnu_meta(self, value: &str, typeflag: u8) -> Self {
        let mut payload = value.as_bytes().to_vec();
        payload.push(0);
        let header = gnu_header("././@LongLink", payload.len() as u64, typeflag);
        self.raw(&header, &payload)
    }

    /// Bytes so far, without an end-of-archive marker.
    pub fn bytes(&self) -> Vec<u8> {
        self.data.clone()
    }

    /// Append the two zero blocks and return the archive.
    pub fn finish(mut self) -> Vec<u8> {
        self.data.extend_from_slice(&[0u8; BLOCK_SIZE * 2]);
        self.data
    }
}

/// A source that returns at most one byte per read.
pub struct OneByte {
    data: Vec<u8>,
    pos: usize,
}

impl OneByte {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data, pos: 0 }
    }
}

impl ByteSource for OneByte {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() || self.pos >= self.data.len() {
            return Ok(0);
        }
        buf[0] = self.data[self.pos];
        self.pos += 1;
        Ok(1)
    }

    fn read_at(&mut self, buf: &mut [u8], pos: u64) -> Result<usize> {
        let pos = pos as usize;
        if buf.is_empty() || pos >= self.data.len() {
            return Ok(0);
        }
        buf[0] = self.data[pos];
        Ok(1)
    }

    fn seek(&mut self, pos: u64) -> Result<()> {
        self.pos = pos as usize;
        Ok(())
    }
}

/// A source that serves `limit` bytes and then fails every read.
pub struct FailAfter {
    data: Vec<u8>,
    pos: usize,
    limit: usize,
    failures: usize,
}

impl FailAfter {
    pub fn new(data: Vec<u8>, limit: usize) -> Self {
        Self {
            data,
            pos: 0,
            limit,
            failures: 0,
        }
    }

    /// Number of reads that returned an error.
    pub fn failures(&self) -> usize {
        self.failures
    }
}

impl ByteSource for FailAfter {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.pos >= self.limit {
            self.failures += 1;
            return Err(std::io::Error::other("device gone").into());
        }
        let n = buf.len().min(self.limit - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }

    fn read_at(&mut self, buf: &mut [u8], pos: u64) -> Result<usize> {
        let pos = pos as usize;
        if pos >= self.limit {
            self.failures += 1;
            return Err(std::io::Error::other("device gone").into());
        }
        let n = buf.len().min(self.limit - pos);
        buf[..n].copy_from_slice(&self.data[pos..pos + n]);
        Ok(n)
    }

    fn seek(&mut self, pos: u64) -> Result<()> {
        self.pos = pos as usize;
        Ok(())
    }
}
