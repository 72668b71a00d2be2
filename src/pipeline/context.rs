//! Pipeline context and tuning: shared data passed into the walk and worker threads.

use crossbeam_channel::{Receiver, Sender, bounded};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::thread::JoinHandle;

use crate::engine::db_ops::WriterSummary;
use crate::utils::fd_limit::max_workers_by_fd_limit;
use crate::{Credential, Delimiters, ImportOpts};

use super::PipelineState;
use super::lines::WorkerReport;

/// Worker count, walk mode and queue capacities for one run.
#[derive(Clone, Debug)]
pub struct PipelineTuning {
    pub num_workers: usize,
    pub parallel_walk: bool,
    pub path_queue_cap: usize,
    pub record_queue_cap: usize,
}

impl PipelineTuning {
    /// Take the requested values, capping workers by the FD limit.
    pub fn from_opts(opts: &ImportOpts) -> Self {
        let num_workers = match max_workers_by_fd_limit() {
            Some(fd_cap) if fd_cap < opts.num_workers => {
                log::debug!(
                    "Capping workers {} -> {} (FD limit ~80%)",
                    opts.num_workers,
                    fd_cap
                );
                fd_cap
            }
            _ => opts.num_workers,
        };
        Self {
            num_workers,
            parallel_walk: opts.parallel_walk,
            path_queue_cap: opts.path_queue_cap(),
            record_queue_cap: opts.record_queue_cap,
        }
    }
}

/// What the discoverer needs: root, filter, and the shared cancel/progress state.
pub struct PipelineContext {
    pub root: PathBuf,
    pub suffix: String,
    pub follow_links: bool,
    pub cancel: Arc<AtomicBool>,
    pub state: Arc<PipelineState>,
}

/// What each line worker needs besides its queue ends.
pub struct WorkerContext {
    pub delimiters: Delimiters,
    pub cancel: Arc<AtomicBool>,
    pub state: Arc<PipelineState>,
    /// Called with 1 after each processed file (progress bar).
    pub on_file_done: Option<Arc<dyn Fn(usize) + Send + Sync>>,
}

/// Handles returned by [`start_pipeline`](super::start_pipeline). Pass to
/// [`finish_pipeline`](super::finish_pipeline) to join the stages in order.
/// `path_count_rx`: receives the discovered file count when the walk finishes.
pub struct PipelineHandles<S> {
    pub path_count_rx: Receiver<usize>,
    pub walk_handle: JoinHandle<anyhow::Result<usize>>,
    pub worker_handles: Vec<JoinHandle<anyhow::Result<WorkerReport>>>,
    pub writer_handle: JoinHandle<anyhow::Result<(WriterSummary, S)>>,
    pub state: Arc<PipelineState>,
    pub cancel: Arc<AtomicBool>,
    pub started: std::time::Instant,
}

/// Channels and shared state for the pipeline. Walk thread gets path_tx, path_count_tx, ctx;
/// workers get path_rx, record_tx; the writer gets record_rx.
pub struct PipelineChannels {
    pub path_tx: Sender<PathBuf>,
    pub path_rx: Receiver<PathBuf>,
    pub record_tx: Sender<Credential>,
    pub record_rx: Receiver<Credential>,
    pub path_count_tx: Sender<usize>,
    pub path_count_rx: Receiver<usize>,
    pub ctx: PipelineContext,
}

pub fn create_pipeline_channels(
    root: &Path,
    opts: &ImportOpts,
    tuning: &PipelineTuning,
    cancel: &Arc<AtomicBool>,
    state: &Arc<PipelineState>,
) -> PipelineChannels {
    let (path_tx, path_rx) = bounded::<PathBuf>(tuning.path_queue_cap);
    let (record_tx, record_rx) = bounded::<Credential>(tuning.record_queue_cap);
    let (path_count_tx, path_count_rx) = bounded::<usize>(1);

    let ctx = PipelineContext {
        root: root.to_path_buf(),
        suffix: opts.suffix.clone(),
        follow_links: opts.follow_links,
        cancel: Arc::clone(cancel),
        state: Arc::clone(state),
    };

    PipelineChannels {
        path_tx,
        path_rx,
        record_tx,
        record_rx,
        path_count_tx,
        path_count_rx,
        ctx,
    }
}
