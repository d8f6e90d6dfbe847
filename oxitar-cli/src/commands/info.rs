//! Info command implementation.

use super::{OpenOptions, open_archive};
use oxitar_core::Entry;
use std::collections::BTreeMap;
use std::path::Path;

/// Aggregate counts over an archive's entries.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ArchiveStats {
    pub by_format: BTreeMap<&'static str, usize>,
    pub by_type: BTreeMap<&'static str, usize>,
    pub total_size: u64,
    pub largest: Option<(String, u64)>,
}

impl ArchiveStats {
    pub fn from_entries(entries: &[Entry]) -> Self {
        let mut stats = Self::default();
        for entry in entries {
            *stats.by_format.entry(entry.format.name()).or_default() += 1;
            *stats.by_type.entry(entry.entry_type.name()).or_default() += 1;
            stats.total_size += entry.size;

            let is_larger = stats
                .largest
                .as_ref()
                .is_none_or(|(_, size)| entry.size > *size);
            if entry.size > 0 && is_larger {
                stats.largest = Some((entry.name.display().to_string(), entry.size));
            }
        }
        stats
    }
}

pub fn cmd_info(archive: &Path, open: &OpenOptions) -> Result<(), Box<dyn std::error::Error>> {
    let metadata = std::fs::metadata(archive)?;
    let mut reader = open_archive(archive, open)?;
    let entries = reader.collect_entries()?;
    let stats = ArchiveStats::from_entries(&entries);

    println!("Archive Information");
    println!("===================");
    println!("File: {}", archive.display());
    println!("Size: {} bytes", metadata.len());
    println!("Archive data ends at: {} bytes", reader.position());

    println!();
    println!("Contents:");
    println!("  Entries: {}", entries.len());
    println!(
        "  Files: {}",
        entries.iter().filter(|e| e.is_file()).count()
    );
    println!(
        "  Directories: {}",
        entries.iter().filter(|e| e.is_dir()).count()
    );
    println!("  Total size: {} bytes", stats.total_size);
    if let Some((name, size)) = &stats.largest {
        println!("  Largest: {} ({} bytes)", name, size);
    }

    println!();
    println!("Header formats:");
    for (format, count) in &stats.by_format {
        println!("  {}: {}", format, count);
    }

    println!();
    println!("Entry types:");
    for (kind, count) in &stats.by_type {
        println!("  {}: {}", kind, count);
    }

    let globals = reader.global_extensions();
    if !globals.is_empty() {
        println!();
        println!("Global pax records:");
        for (key, value) in globals {
            println!("  {} = {}", key, value);
        }
    }

    Ok(())
}
