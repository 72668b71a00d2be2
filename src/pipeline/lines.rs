//! Line workers: take a path, read the whole file, parse every line, send records on.

use anyhow::Result;
use crossbeam_channel::{Receiver, Sender};
use log::debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread::{self, JoinHandle};

use crate::engine::parse::parse_line;
use crate::engine::tools::read_input_file;
use crate::error::{ImportError, LineError};
use crate::{Credential, Delimiters};

use super::PipelineState;
use super::context::WorkerContext;

/// What one worker did over its lifetime.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WorkerReport {
    pub files: usize,
    pub records: usize,
    pub skipped: usize,
}

/// Outcome of one file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FileOutcome {
    pub records: usize,
    pub skipped: usize,
    /// The record queue was closed before the file was finished (writer gone).
    pub disconnected: bool,
}

/// Parse every line of `bytes` and send the records in line order. Blank lines are neither
/// records nor skipped lines.
pub fn process_bytes(
    bytes: &[u8],
    delimiters: &Delimiters,
    record_tx: &Sender<Credential>,
) -> FileOutcome {
    let mut outcome = FileOutcome::default();
    for raw in bytes.split(|b| *b == b'\n') {
        match parse_line(raw, delimiters) {
            Ok(record) => {
                if record_tx.send(record).is_err() {
                    outcome.disconnected = true;
                    break;
                }
                outcome.records += 1;
            }
            Err(LineError::Blank) => {}
            Err(_) => outcome.skipped += 1,
        }
    }
    outcome
}

/// Read `path` fully and process it. A read failure is fatal for the run.
pub fn process_file(
    path: &Path,
    delimiters: &Delimiters,
    record_tx: &Sender<Credential>,
) -> Result<FileOutcome> {
    let bytes = read_input_file(path).map_err(|source| ImportError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(process_bytes(&bytes, delimiters, record_tx))
}

fn record_progress(state: &PipelineState, path: &Path, outcome: &FileOutcome) {
    state.add_enqueued(outcome.records);
    state.add_skipped(outcome.skipped);
    let processed = state.add_processed();
    match state.files_total() {
        Some(total) => debug!("Read {} / {} files ({})", processed, total, path.display()),
        None => debug!("Read {} files ({})", processed, path.display()),
    }
}

/// Single worker: pull paths until the path queue is closed and drained.
fn line_worker_loop(
    path_rx: &Receiver<PathBuf>,
    record_tx: &Sender<Credential>,
    ctx: &WorkerContext,
) -> Result<WorkerReport> {
    let mut report = WorkerReport::default();
    while let Ok(path) = path_rx.recv() {
        if ctx.cancel.load(Ordering::Relaxed) {
            break;
        }
        let outcome = process_file(&path, &ctx.delimiters, record_tx)?;
        report.files += 1;
        report.records += outcome.records;
        report.skipped += outcome.skipped;
        record_progress(&ctx.state, &path, &outcome);
        if let Some(cb) = &ctx.on_file_done {
            cb(1);
        }
        if outcome.disconnected {
            debug!("worker: record queue closed, stopping");
            break;
        }
    }
    Ok(report)
}

/// Spawn `num_workers` line workers. Caller must drop its own `record_tx` after this so the
/// record queue closes once every worker has exited.
pub fn spawn_line_workers(
    path_rx: Receiver<PathBuf>,
    record_tx: &Sender<Credential>,
    ctx: WorkerContext,
    num_workers: usize,
) -> Vec<JoinHandle<Result<WorkerReport>>> {
    let ctx = Arc::new(ctx);
    (0..num_workers)
        .map(|_| {
            let path_rx = path_rx.clone();
            let record_tx = record_tx.clone();
            let ctx = Arc::clone(&ctx);
            thread::spawn(move || {
                let result = line_worker_loop(&path_rx, &record_tx, &ctx);
                // The abort mark must land before this worker's sender is dropped.
                let result = super::raise_on_error(&ctx.cancel, &ctx.state, result);
                drop(record_tx);
                result
            })
        })
        .collect()
}
