//! Utility functions for the CLI.

use glob::Pattern;
use indicatif::{ProgressBar, ProgressStyle};
use oxitar_core::Entry;

/// Create a byte-position progress bar with standard styling.
pub fn create_progress_bar(len: u64, enable: bool) -> ProgressBar {
    if !enable {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len);
    let style = ProgressStyle::default_bar()
        .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style.progress_chars("█▓▒░ "));
    pb
}

/// Check if an entry name matches the filter patterns.
/// - If include patterns are specified, the name must match at least one
/// - If exclude patterns are specified, the name must not match any
pub fn matches_filters(name: &str, include: &[String], exclude: &[String]) -> bool {
    let matches = |pattern_str: &String| {
        Pattern::new(pattern_str)
            .map(|pattern| pattern.matches(name))
            .unwrap_or(false)
    };

    if exclude.iter().any(matches) {
        return false;
    }

    // If no include patterns, include everything (that wasn't excluded)
    include.is_empty() || include.iter().any(matches)
}

/// Check an entry against the filter patterns.
pub fn entry_matches(entry: &Entry, include: &[String], exclude: &[String]) -> bool {
    matches_filters(&entry.name.to_string_lossy(), include, exclude)
}

/// Filter entries based on include/exclude patterns.
pub fn filter_entries(entries: Vec<Entry>, include: &[String], exclude: &[String]) -> Vec<Entry> {
    if include.is_empty() && exclude.is_empty() {
        return entries;
    }

    entries
        .into_iter()
        .filter(|e| entry_matches(e, include, exclude))
        .collect()
}

/// Print entries, `ls -l` style when verbose.
pub fn print_entries(entries: &[Entry], verbose: bool) {
    if verbose {
        println!(
            "{:<10} {:>11} {:>10} {:>12}  Name",
            "Mode", "Owner", "Size", "Modified"
        );
        println!("{}", "-".repeat(72));

        let mut total_size = 0u64;
        for entry in entries {
            let owner = if entry.uname.is_empty() {
                format!("{}/{}", entry.uid, entry.gid)
            } else {
                format!("{}/{}", entry.uname, entry.gname)
            };
            print!(
                "{:<10} {:>11} {:>10} {:>12}  {}",
                entry.mode_string(),
                owner,
                entry.size,
                entry.mtime_secs(),
                entry.name.display()
            );
            match entry.link_target() {
                Some(target) => println!(" -> {}", target.display()),
                None => println!(),
            }
            total_size += entry.size;
        }

        println!("{}", "-".repeat(72));
        println!("{:>33}  {} entries", total_size, entries.len());
    } else {
        for entry in entries {
            println!("{}", entry.name.display());
        }
    }
}
