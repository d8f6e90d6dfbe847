//! OxiTar CLI - streaming TAR archive tool
//!
//! Lists, tests and extracts ustar, pax and GNU tar archives.

mod commands;
mod utils;

use clap::{Parser, Subcommand};
use commands::OpenOptions;
use commands::extract::ExtractOptions;
use commands::list::ListOptions;
use oxitar_archive::tar::ReaderOptions;
use oxitar_archive::tar::reader::DEFAULT_MAX_EXTENSION_SIZE;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "oxitar")]
#[command(author, version, about = "Streaming TAR archive reader")]
#[command(long_about = "
OxiTar reads tar archives as a stream: ustar, pax extended headers,
GNU long names and base-256 numeric fields are supported.

Examples:
  oxitar list archive.tar
  oxitar list --json archive.tar
  oxitar test archive.tar
  oxitar extract archive.tar -o out/
  oxitar info archive.tar

Set RUST_LOG to control log output (default: warn).
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Show verbose output and debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Largest pax or GNU long-name payload accepted, in bytes
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_EXTENSION_SIZE)]
    max_extension_size: u64,

    /// Ignore pax global extended headers
    #[arg(long, global = true)]
    ignore_global_pax: bool,

    /// Read the archive through a memory map
    #[cfg(feature = "mmap")]
    #[arg(long, global = true)]
    mmap: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List contents of an archive
    #[command(alias = "l")]
    List {
        /// Archive file to list
        archive: PathBuf,

        /// Output as JSON (machine-readable)
        #[arg(short, long)]
        json: bool,

        /// Include only entries matching pattern (glob syntax: *.txt, src/**/*)
        #[arg(short = 'I', long)]
        include: Vec<String>,

        /// Exclude entries matching pattern (glob syntax)
        #[arg(short = 'X', long)]
        exclude: Vec<String>,
    },

    /// Extract entries from an archive
    #[command(alias = "x")]
    Extract {
        /// Archive file to extract
        archive: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Include only entries matching pattern (glob syntax: *.txt, src/**/*)
        #[arg(short = 'I', long)]
        include: Vec<String>,

        /// Exclude entries matching pattern (glob syntax)
        #[arg(short = 'X', long)]
        exclude: Vec<String>,

        /// Show progress bar
        #[arg(short = 'P', long)]
        progress: bool,
    },

    /// Read every entry and verify content sizes
    #[command(alias = "t")]
    Test {
        /// Archive file to test
        archive: PathBuf,
    },

    /// Show information about an archive
    #[command(alias = "i")]
    Info {
        /// Archive file to inspect
        archive: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let open = OpenOptions {
        reader: ReaderOptions::new()
            .with_max_extension_size(cli.max_extension_size)
            .with_ignore_global_extensions(cli.ignore_global_pax),
        #[cfg(feature = "mmap")]
        mmap: cli.mmap,
        #[cfg(not(feature = "mmap"))]
        mmap: false,
    };
    let verbose = cli.verbose;

    let result = match cli.command {
        Commands::List {
            archive,
            json,
            include,
            exclude,
        } => commands::cmd_list(
            &archive,
            &open,
            &ListOptions {
                verbose,
                json,
                include: &include,
                exclude: &exclude,
            },
        ),
        Commands::Extract {
            archive,
            output,
            include,
            exclude,
            progress,
        } => commands::cmd_extract(
            &archive,
            &open,
            &ExtractOptions {
                output: &output,
                include: &include,
                exclude: &exclude,
                verbose,
                progress,
            },
        ),
        Commands::Test { archive } => commands::cmd_test(&archive, &open, verbose),
        Commands::Info { archive } => commands::cmd_info(&archive, &open),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
