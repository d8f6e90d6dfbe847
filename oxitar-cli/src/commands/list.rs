//! List command implementation.

use super::{OpenOptions, open_archive};
use crate::utils::{filter_entries, print_entries};
use oxitar_core::Entry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// JSON serializable entry data for archive listings.
#[derive(Debug, Serialize, Deserialize)]
struct EntryJson {
    name: String,
    #[serde(rename = "type")]
    entry_type: String,
    size: u64,
    mode: u32,
    uid: u32,
    gid: u32,
    #[serde(skip_serializing_if = "String::is_empty")]
    uname: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    gname: String,
    mtime: i64,
    format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    link_target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    device: Option<(u32, u32)>,
    offset: u64,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    extensions: BTreeMap<String, String>,
}

impl EntryJson {
    fn from_entry(entry: &Entry) -> Self {
        Self {
            name: entry.name.to_string_lossy().into_owned(),
            entry_type: entry.entry_type.name().to_string(),
            size: entry.size,
            mode: entry.mode,
            uid: entry.uid,
            gid: entry.gid,
            uname: entry.uname.clone(),
            gname: entry.gname.clone(),
            mtime: entry.mtime_secs(),
            format: entry.format.name().to_string(),
            link_target: entry
                .link_target()
                .map(|p| p.to_string_lossy().into_owned()),
            device: entry.device,
            offset: entry.header_offset,
            extensions: entry.extensions.clone(),
        }
    }
}

/// JSON output for archive listing.
#[derive(Debug, Serialize, Deserialize)]
struct ArchiveListJson {
    archive: String,
    entries: Vec<EntryJson>,
}

/// Options for listing archive contents.
pub struct ListOptions<'a> {
    pub verbose: bool,
    pub json: bool,
    pub include: &'a [String],
    pub exclude: &'a [String],
}

pub fn cmd_list(
    archive: &Path,
    open: &OpenOptions,
    options: &ListOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut reader = open_archive(archive, open)?;
    let entries = filter_entries(reader.collect_entries()?, options.include, options.exclude);

    if options.json {
        let output = ArchiveListJson {
            archive: archive.display().to_string(),
            entries: entries.iter().map(EntryJson::from_entry).collect(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Archive: {}", archive.display());
    println!();
    print_entries(&entries, options.verbose);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxitar_core::EntryType;

    #[test]
    fn test_entry_json_fields() {
        let mut entry = Entry::new("bin/tool", EntryType::Symlink).with_linkname("../lib/tool");
        entry.uname = "root".to_string();
        entry.extensions.insert("path".to_string(), "bin/tool".to_string());

        let json = serde_json::to_value(EntryJson::from_entry(&entry)).unwrap();
        assert_eq!(json["name"], "bin/tool");
        assert_eq!(json["type"], entry.entry_type.name());
        assert_eq!(json["link_target"], "../lib/tool");
        assert_eq!(json["uname"], "root");
        assert!(json.get("gname").is_none());
        assert!(json.get("device").is_none());
        assert_eq!(json["extensions"]["path"], "bin/tool");
    }
}
