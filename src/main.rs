//! wikidump: read Wikimedia XML dumps, sequentially or in parallel via a multistream index

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{init_config, show_index, traverse_dump, TraverseOptions};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use wikidump::config::{Config, LogFormat, LoggingConfig};

#[derive(Parser)]
#[command(name = "wikidump")]
#[command(about = "Parallel reader for Wikimedia XML dumps")]
#[command(version)]
struct Cli {
    /// Configuration file path (defaults to ./wikidump.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read every page of a dump
    Traverse {
        /// Dump file (.xml, .xml.bz2, or multistream .xml.bz2)
        dump: PathBuf,

        /// Multistream index; enables parallel decoding
        index: Option<PathBuf>,

        /// Number of decoding workers
        #[arg(short, long)]
        workers: Option<usize>,

        /// Try to parse {{coord}} templates while traversing
        #[arg(long)]
        parse_coords: bool,

        /// Write pages with unparseable coordinates here (JSON lines)
        #[arg(long)]
        errors: Option<PathBuf>,

        /// Quiet mode (no progress output)
        #[arg(short, long)]
        quiet: bool,
    },

    /// Print a multistream index with offsets corrected
    Index {
        /// Index file (.txt or .txt.bz2)
        path: PathBuf,

        /// Print one `offset<TAB>count` line per segment instead of every entry
        #[arg(short, long)]
        summary: bool,
    },

    /// Write a default configuration file
    Init {
        /// Output file or directory
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

fn init_logging(logging: &LoggingConfig, verbosity: u8) -> Result<()> {
    let filter = EnvFilter::try_new(logging.filter_directive(verbosity))
        .unwrap_or_else(|_| EnvFilter::new("wikidump=info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match logging.format {
        LogFormat::Json => builder
            .json()
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to install logger: {}", e)),
        LogFormat::Text => builder
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to install logger: {}", e)),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load_or_default(cli.config.as_deref())?;
    init_logging(&config.logging, cli.verbose)?;

    match cli.command {
        Commands::Traverse {
            dump,
            index,
            workers,
            parse_coords,
            errors,
            quiet,
        } => traverse_dump(
            config,
            TraverseOptions {
                dump,
                index,
                workers,
                parse_coords,
                errors,
                quiet,
            },
        ),
        Commands::Index { path, summary } => show_index(path, summary),
        Commands::Init { path, force } => init_config(path, force),
    }
}
