//! Test command implementation.

use super::{Archive, OpenOptions, open_archive};
use oxitar_archive::tar::Next;
use std::path::Path;

/// Outcome of reading an archive end to end.
#[derive(Debug, Default)]
pub struct TestReport {
    pub entries: usize,
    pub bytes: u64,
    /// First failure, with the name of the entry being read if there was one.
    pub error: Option<(String, String)>,
}

/// Read every entry to exhaustion and compare byte counts with header sizes.
///
/// Reader errors halt the archive, so the walk stops at the first failure.
pub fn verify(reader: &mut Archive, verbose: bool) -> TestReport {
    let mut report = TestReport::default();
    let mut sink = std::io::sink();

    loop {
        let mut file = match reader.next_entry() {
            Ok(Next::Entry(file)) => file,
            Ok(Next::EndOfArchive) => break,
            Err(e) => {
                report.error = Some(("<header>".to_string(), e.to_string()));
                break;
            }
        };

        let name = file.entry().name.display().to_string();
        let size = file.entry().size;
        report.entries += 1;

        match file.copy_to(&mut sink) {
            Ok(read) if read == size => {
                report.bytes += read;
                if verbose {
                    println!("  OK: {}", name);
                }
            }
            Ok(read) => {
                let message = format!("read {} bytes, header declares {}", read, size);
                report.error = Some((name, message));
                break;
            }
            Err(e) => {
                report.error = Some((name, e.to_string()));
                break;
            }
        }
    }

    report
}

pub fn cmd_test(
    archive: &Path,
    open: &OpenOptions,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut reader = open_archive(archive, open)?;
    println!("Testing {}", archive.display());

    let report = verify(&mut reader, verbose);

    println!();
    println!("Test results:");
    println!("  Entries: {}", report.entries);
    println!("  Content: {} bytes", report.bytes);

    if let Some((name, err)) = &report.error {
        println!("  FAILED: {}: {}", name, err);
        std::process::exit(2);
    }

    println!();
    println!("All entries OK");
    Ok(())
}
