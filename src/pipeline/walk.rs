//! File discovery: walks the input root and sends matching file paths to the path queue.

use anyhow::Result;
use crossbeam_channel::Sender;
use log::debug;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::thread::{self, JoinHandle};

use crate::engine::tools::has_suffix;
use crate::error::ImportError;

use super::context::PipelineContext;

/// One result from a directory walk.
pub enum WalkOutcome {
    File(PathBuf),
    /// Directories, symlinks that are not followed, sockets and the like.
    Other,
    Err { msg: String, path: Option<PathBuf> },
}

/// Convert a jwalk result into [`WalkOutcome`].
pub fn to_outcome_jwalk(r: Result<jwalk::DirEntry<((), ())>, jwalk::Error>) -> WalkOutcome {
    match r {
        Ok(entry) if entry.file_type().is_file() => WalkOutcome::File(entry.path()),
        Ok(_) => WalkOutcome::Other,
        Err(err) => WalkOutcome::Err {
            msg: format!("{}", err),
            path: err.path().map(PathBuf::from),
        },
    }
}

/// Convert a walkdir result into [`WalkOutcome`].
pub fn to_outcome_walkdir(r: Result<walkdir::DirEntry, walkdir::Error>) -> WalkOutcome {
    match r {
        Ok(entry) if entry.file_type().is_file() => WalkOutcome::File(entry.into_path()),
        Ok(_) => WalkOutcome::Other,
        Err(err) => WalkOutcome::Err {
            msg: format!("{}", err),
            path: err.path().map(PathBuf::from),
        },
    }
}

fn jwalk_iter(ctx: &PipelineContext) -> Box<dyn Iterator<Item = WalkOutcome>> {
    use jwalk::Parallelism;
    use std::time::Duration;
    Box::new(
        jwalk::WalkDir::new(&ctx.root)
            .follow_links(ctx.follow_links)
            .parallelism(Parallelism::RayonDefaultPool {
                busy_timeout: Duration::from_secs(60),
            })
            .into_iter()
            .map(to_outcome_jwalk),
    )
}

fn walkdir_iter(ctx: &PipelineContext) -> Box<dyn Iterator<Item = WalkOutcome>> {
    use walkdir::WalkDir;
    Box::new(
        WalkDir::new(&ctx.root)
            .follow_links(ctx.follow_links)
            .into_iter()
            .map(to_outcome_walkdir),
    )
}

pub fn spawn_walk_thread(
    path_tx: Sender<PathBuf>,
    path_count_tx: Sender<usize>,
    ctx: PipelineContext,
    parallel_walk: bool,
) -> JoinHandle<Result<usize>> {
    thread::spawn(move || {
        let iter: Box<dyn Iterator<Item = WalkOutcome>> = match parallel_walk {
            true => jwalk_iter(&ctx),
            false => walkdir_iter(&ctx),
        };
        let result = run_walk_loop(&path_tx, &path_count_tx, &ctx, iter);
        // Mark the abort before the path queue closes.
        let result = super::raise_on_error(&ctx.cancel, &ctx.state, result);
        drop(path_tx);
        result
    })
}

/// Consume `iter`, send every file whose name ends with the suffix to `path_tx`.
/// Any walk error is fatal. Stops early on cancellation or when no worker is left to receive.
/// Marks discovery done and sends the count on `path_count_tx` exactly once, whichever way the
/// loop ends. The caller closes the path queue by dropping `path_tx`.
pub fn run_walk_loop<I>(
    path_tx: &Sender<PathBuf>,
    path_count_tx: &Sender<usize>,
    ctx: &PipelineContext,
    iter: I,
) -> Result<usize>
where
    I: Iterator<Item = WalkOutcome>,
{
    let mut count = 0_usize;
    let mut failure = None;
    for outcome in iter {
        if ctx.cancel.load(Ordering::Relaxed) {
            debug!("walk: cancelled after {} files", count);
            break;
        }
        match outcome {
            WalkOutcome::File(path) => {
                if !has_suffix(&path, &ctx.suffix) {
                    continue;
                }
                if path_tx.send(path).is_err() {
                    break;
                }
                count += 1;
                ctx.state.add_discovered();
            }
            WalkOutcome::Other => {}
            WalkOutcome::Err { msg, path } => {
                failure = Some(ImportError::Walk { path, reason: msg });
                break;
            }
        }
    }
    ctx.state.mark_discovery_done();
    let _ = path_count_tx.send(count);
    match failure {
        Some(err) => Err(err.into()),
        None => {
            debug!("walk: discovered {} files", count);
            Ok(count)
        }
    }
}
