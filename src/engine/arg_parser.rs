use clap::Parser;
use std::path::PathBuf;

struct DefaultArgs;

impl DefaultArgs {
    pub const DIR: &'static str = ".";
}

/// Concurrent importer for plaintext credential dumps.
#[derive(Clone, Parser)]
#[command(name = "credsink")]
#[command(
    about = "Import `identifier<delim>secret` dumps into a SQLite database; use --dry-run to count without writing."
)]
pub struct Cli {
    /// Directory tree to import. Default: current directory.
    #[arg(value_name = "DIR", default_value = DefaultArgs::DIR)]
    pub dir: PathBuf,

    /// Path to the destination database. Default: `credsink.db` in DIR.
    #[arg(long, short)]
    pub db: Option<PathBuf>,

    /// Delimiter characters; a line is split at the first one found. Default: ";:|".
    #[arg(long, short = 'D')]
    pub delimiters: Option<String>,

    /// Number of line workers. Default: 10.
    #[arg(long, short = 'c', value_parser = clap::value_parser!(u64).range(1..))]
    pub concurrency: Option<u64>,

    /// Rows per category per transaction. Default: 1000.
    #[arg(long, short = 'b', value_parser = clap::value_parser!(u64).range(1..))]
    pub batch_size: Option<u64>,

    /// Only import files whose name ends with this. Default: ".txt".
    #[arg(long)]
    pub suffix: Option<String>,

    /// Parse and classify every file, report counts, write nothing.
    #[arg(long)]
    pub dry_run: bool,

    /// Verbose output (debug logs and a progress bar).
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,

    /// Follow symbolic links.
    #[arg(long, short = 'f', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub follow_links: Option<bool>,

    /// Walk the input tree in parallel (jwalk). Helps on very wide trees.
    #[arg(long, short = 'p', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub parallel_walk: Option<bool>,

    /// Encrypt a new database with SQLCipher.
    /// Prompts for passphrase (or use CREDSINK_DB_KEY / .env).
    #[arg(long, short = 'x', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub encrypt: Option<bool>,
}
