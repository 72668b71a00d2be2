//! CLI command handler: import by default; --dry-run parses and classifies without writing.

use anyhow::Result;
use log::{debug, info, warn};

use crate::Opts;
use crate::engine::arg_parser::Cli;
use crate::engine::running_as_root;
use crate::import::{dry_run_dir, import_dir_with_opts};
use crate::utils::credsink_toml::{apply_file_to_opts, load_credsink_toml};
use crate::utils::setup_logging;

/// Defaults, then `.credsink.toml` in DIR, then command-line flags.
fn setup_opts(cli: &Cli) -> Result<Opts> {
    let mut opts = Opts::default();
    if let Some(file) = load_credsink_toml(&cli.dir)? {
        apply_file_to_opts(&file, &mut opts)?;
    }
    if let Some(db) = &cli.db {
        opts.db_path = Some(db.clone());
    }
    if let Some(d) = &cli.delimiters {
        opts.import.delimiters = d.parse()?;
    }
    if let Some(n) = cli.concurrency {
        opts.import.num_workers = usize::try_from(n)?;
    }
    if let Some(n) = cli.batch_size {
        opts.import.batch_size = usize::try_from(n)?;
    }
    if let Some(s) = &cli.suffix {
        opts.import.suffix = s.clone();
    }
    if let Some(v) = cli.follow_links {
        opts.import.follow_links = v;
    }
    if let Some(v) = cli.parallel_walk {
        opts.import.parallel_walk = v;
    }
    if let Some(v) = cli.encrypt {
        opts.encrypt = v;
    }
    if let Some(v) = cli.verbose {
        opts.verbose = v;
    }
    opts.dry_run = cli.dry_run;

    setup_logging(opts.verbose);
    opts.import.validate()?;
    debug!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_uppercase(),
        opts
    );
    Ok(opts)
}

/// Run an import (default) or a dry run. A dry run never opens the database.
pub fn handle_run(cli: &Cli) -> Result<()> {
    let opts = setup_opts(cli)?;
    if opts.dry_run {
        warn!("RUNNING IN DRY-RUN MODE. NOTHING WILL BE WRITTEN TO THE DATABASE.");
        dry_run_dir(&cli.dir, &opts)?;
        return Ok(());
    }
    if running_as_root() && !opts.encrypt {
        info!("Running as root. Consider using -x or --encrypt to protect the database.");
    }
    debug!("Importing directory...");
    import_dir_with_opts(&cli.dir, &opts)?;
    Ok(())
}
