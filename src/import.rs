//! Directory import operations (CLI flow): store, Ctrl+C, progress bar, summary.

use anyhow::{Context, Result};
use log::info;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use kdam::Animation;

use crate::engine::db_ops::{
    BatchSink, CountingSink, FailFast, SqliteSink, open_db, open_db_or_detect_encrypted,
    sqlite_version,
};
use crate::engine::progress::{
    ProgressBar, ProgressBarConfig, create_progress_bar, progress_callback, refresh_bar,
    set_bar_total,
};
use crate::engine::tools::check_root_and_canonicalize;
use crate::error::ImportError;
use crate::pipeline::{PipelineHooks, finish_pipeline, start_pipeline};
use crate::utils::{Colors, PackagePaths, get_passphrase};
use crate::{Category, ImportSummary, Opts};

/// Raise a fresh token on Ctrl+C. May only be installed once per process.
fn install_ctrlc_handler() -> Result<Arc<AtomicBool>> {
    let cancel = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&cancel);
    ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::Relaxed);
    })
    .context("set Ctrl+C handler")?;
    Ok(cancel)
}

/// Bar over files processed. Its total is unknown until discovery finishes.
fn setup_progress(verbose: bool, desc: &'static str) -> Option<ProgressBar> {
    verbose.then(|| {
        let bar = create_progress_bar(ProgressBarConfig::new(0, desc, Animation::Classic));
        refresh_bar(&bar);
        bar
    })
}

/// Run the pipeline into `sink` with the CLI's cancellation token and progress bar.
fn run_with_progress<S>(
    root: &Path,
    opts: &Opts,
    sink: S,
    desc: &'static str,
) -> Result<(ImportSummary, S)>
where
    S: BatchSink + Send + 'static,
{
    let mut import_opts = opts.import.clone();
    if import_opts.cancel.is_none() {
        import_opts.cancel = Some(install_ctrlc_handler()?);
    }

    let bar = setup_progress(opts.verbose, desc);
    let hooks = PipelineHooks {
        on_file_done: progress_callback(&bar),
    };
    let handles = start_pipeline(root, &import_opts, sink, Box::new(FailFast), hooks)?;

    // The walk sends its total once; a side thread sets the bar total so the coordinator
    // can go straight to joining.
    if let Some(bar) = bar.as_ref() {
        let bar = Arc::clone(bar);
        let path_count_rx = handles.path_count_rx.clone();
        thread::spawn(move || {
            if let Ok(total) = path_count_rx.recv() {
                set_bar_total(&bar, total);
            }
        });
    }

    let result = finish_pipeline(handles);
    if bar.is_some() {
        eprintln!();
    }
    result
}

fn log_summary(summary: &ImportSummary, verb: &str) {
    info!(
        "{} {} files ({} discovered), {} records, {} lines skipped",
        Colors::label(verb),
        Colors::count(summary.files_processed),
        summary.files_discovered,
        Colors::count(summary.records_enqueued),
        Colors::skipped(summary.lines_skipped)
    );
    for category in Category::ALL {
        let tally = summary.tally(category);
        info!(
            "  {:<5} {} rows in {} batches",
            category.table(),
            Colors::count(tally.rows),
            tally.flushes
        );
    }
    info!("Finished in {:.2?}", summary.elapsed);
}

fn cancelled_error(summary: &ImportSummary) -> anyhow::Error {
    anyhow::Error::new(ImportError::Cancelled).context(format!(
        "stopped by user after {} of {} files; batches already received were flushed",
        summary.files_processed, summary.files_discovered
    ))
}

/// Import every matching file under `root` into the database from `opts` (default
/// `credsink.db` in `root`). Creates an encrypted database when `opts.encrypt` is set and the
/// file does not exist yet; an existing encrypted database is detected and unlocked.
pub fn import_dir_with_opts(root: &Path, opts: &Opts) -> Result<ImportSummary> {
    let root = check_root_and_canonicalize(root)?;
    let db_path = opts
        .db_path
        .clone()
        .unwrap_or_else(|| root.join(PackagePaths::get().db_filename()));

    let conn = if opts.encrypt && !db_path.exists() {
        let pass = get_passphrase(&root, true)?;
        open_db(&db_path, Some(pass.as_str()))?
    } else {
        open_db_or_detect_encrypted(&db_path, &root)?.0
    };
    info!(
        "Connected to SQLite {} at {}",
        sqlite_version(&conn)?,
        db_path.display()
    );
    info!("Importing {}", root.display());

    let (summary, sink) = run_with_progress(&root, opts, SqliteSink::new(conn), "Importing")?;
    sink.close()?;
    log_summary(&summary, "Imported");

    if summary.cancelled {
        return Err(cancelled_error(&summary));
    }
    Ok(summary)
}

/// Discover, parse and classify everything under `root` without opening a database.
pub fn dry_run_dir(root: &Path, opts: &Opts) -> Result<ImportSummary> {
    let root = check_root_and_canonicalize(root)?;
    info!("Scanning {}", root.display());
    let (summary, _sink) = run_with_progress(&root, opts, CountingSink::new(), "Scanning")?;
    log_summary(&summary, "Scanned");
    if summary.cancelled {
        return Err(cancelled_error(&summary));
    }
    Ok(summary)
}
