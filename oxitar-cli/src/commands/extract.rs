//! Extract command implementation.

use super::{Archive, OpenOptions, open_archive};
use crate::utils::{create_progress_bar, entry_matches};
use filetime::FileTime;
use indicatif::ProgressBar;
use log::{debug, warn};
use oxitar_archive::tar::Next;
use oxitar_core::error::OxiTarError;
use oxitar_core::{Entry, EntryType};
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Component, Path, PathBuf};

/// Options for extracting archive contents.
pub struct ExtractOptions<'a> {
    pub output: &'a Path,
    pub include: &'a [String],
    pub exclude: &'a [String],
    pub verbose: bool,
    pub progress: bool,
}

/// Counts of what an extraction produced.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtractSummary {
    pub files: usize,
    pub dirs: usize,
    pub links: usize,
    pub skipped: usize,
    pub bytes: u64,
}

pub fn cmd_extract(
    archive: &Path,
    open: &OpenOptions,
    options: &ExtractOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let total = fs::metadata(archive)?.len();
    let mut reader = open_archive(archive, open)?;

    println!(
        "Extracting {} to {}",
        archive.display(),
        options.output.display()
    );

    let pb = create_progress_bar(total, options.progress);
    pb.set_message("extracting");
    let summary = extract_all(&mut reader, options, &pb)?;
    pb.finish_with_message("Done");

    println!(
        "Extracted {} files, {} directories, {} links ({} bytes)",
        summary.files, summary.dirs, summary.links, summary.bytes
    );
    if summary.skipped > 0 {
        println!("Skipped {} entries", summary.skipped);
    }
    Ok(())
}

/// Stream every matching entry onto disk under `options.output`.
pub fn extract_all(
    reader: &mut Archive,
    options: &ExtractOptions,
    pb: &ProgressBar,
) -> Result<ExtractSummary, Box<dyn std::error::Error>> {
    fs::create_dir_all(options.output)?;

    let mut summary = ExtractSummary::default();
    let mut dir_times = Vec::new();

    while let Next::Entry(mut file) = reader.next_entry()? {
        let entry = file.entry().clone();
        if !entry_matches(&entry, options.include, options.exclude) {
            debug!("filtered out {}", entry.name.display());
            continue;
        }

        entry.validate_path()?;
        let relative = entry.sanitized_name();
        check_ancestors(options.output, &relative)?;
        let path = options.output.join(&relative);

        match entry.entry_type {
            EntryType::Directory => {
                fs::create_dir_all(&path)?;
                dir_times.push((path, entry.mtime));
                summary.dirs += 1;
                report(pb, options.verbose, format!("  Created: {}", entry.name.display()));
            }
            EntryType::Symlink => {
                if create_symlink(&entry, &path)? {
                    summary.links += 1;
                    report(pb, options.verbose, format!("  Linked: {}", entry));
                } else {
                    summary.skipped += 1;
                }
            }
            EntryType::Hardlink => {
                let source = hardlink_source(options.output, &entry)?;
                check_ancestors(options.output, &entry.linkname)?;
                prepare_parent(&path)?;
                remove_existing(&path)?;
                fs::hard_link(&source, &path)?;
                summary.links += 1;
                report(pb, options.verbose, format!("  Linked: {}", entry));
            }
            EntryType::CharDevice | EntryType::BlockDevice | EntryType::Fifo => {
                warn!("skipping {} {}", entry.entry_type, entry.name.display());
                summary.skipped += 1;
            }
            _ => {
                prepare_parent(&path)?;
                remove_existing_link(&path)?;
                let mut out = BufWriter::new(fs::File::create(&path)?);
                let written = file.copy_to(&mut out)?;
                out.flush()?;
                drop(out);

                set_mode(&path, entry.mode)?;
                filetime::set_file_mtime(&path, FileTime::from_system_time(entry.mtime))?;
                summary.files += 1;
                summary.bytes += written;
                report(
                    pb,
                    options.verbose,
                    format!("  Extracted: {} ({} bytes)", entry.name.display(), written),
                );
            }
        }

        drop(file);
        pb.set_position(reader.position());
    }

    // Children bump their parent's mtime, so directories are stamped last.
    for (path, mtime) in dir_times.iter().rev() {
        filetime::set_file_mtime(path, FileTime::from_system_time(*mtime))?;
    }

    Ok(summary)
}

fn report(pb: &ProgressBar, verbose: bool, message: String) {
    if !verbose {
        return;
    }
    if pb.is_hidden() {
        println!("{}", message);
    } else {
        pb.println(message);
    }
}

fn prepare_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) => fs::create_dir_all(parent),
        None => Ok(()),
    }
}

fn remove_existing(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Unlink `path` if it is a symlink so the new file does not write through it.
fn remove_existing_link(path: &Path) -> io::Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_symlink() => fs::remove_file(path),
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Refuse paths whose parent directories include a symlink under `root`.
///
/// Links from earlier entries can chain to a location outside the root even
/// when each target passes [`symlink_escapes`] on its own.
fn check_ancestors(root: &Path, relative: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut current = root.to_path_buf();
    let mut components = relative.components().peekable();
    while let Some(component) = components.next() {
        if components.peek().is_none() {
            break;
        }
        current.push(component);
        match fs::symlink_metadata(&current) {
            Ok(meta) if meta.file_type().is_symlink() => {
                return Err(OxiTarError::path_traversal(relative).into());
            }
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o777))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}

/// Create a symlink; returns false where the platform cannot.
fn create_symlink(entry: &Entry, path: &Path) -> Result<bool, Box<dyn std::error::Error>> {
    if symlink_escapes(&entry.name, &entry.linkname) {
        return Err(OxiTarError::path_traversal(&entry.linkname).into());
    }

    #[cfg(unix)]
    {
        prepare_parent(path)?;
        remove_existing(path)?;
        std::os::unix::fs::symlink(&entry.linkname, path)?;
        Ok(true)
    }

    #[cfg(not(unix))]
    {
        warn!(
            "symlinks are not supported here, skipping {}",
            path.display()
        );
        Ok(false)
    }
}

/// Check whether a symlink target resolves outside the extraction root.
fn symlink_escapes(name: &Path, target: &Path) -> bool {
    let mut depth = name
        .parent()
        .map(|p| {
            p.components()
                .filter(|c| matches!(c, Component::Normal(_)))
                .count()
        })
        .unwrap_or(0);

    for component in target.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return true,
            },
            Component::RootDir | Component::Prefix(_) => return true,
        }
    }
    false
}

/// Resolve a hard link's target, which names an earlier archive member.
fn hardlink_source(output: &Path, entry: &Entry) -> Result<PathBuf, OxiTarError> {
    let target = &entry.linkname;
    if target.as_os_str().is_empty() {
        return Err(OxiTarError::corrupt(
            entry.header_offset,
            format!("hard link {} has no target", entry.name.display()),
        ));
    }
    if target
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return Err(OxiTarError::path_traversal(target));
    }
    Ok(output.join(target))
}
