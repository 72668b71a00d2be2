use anyhow::Result;
use log::debug;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crate::engine::db_ops::{BatchSink, FlushPolicy, WriterParams, WriterSummary, run_batch_writer};
use crate::{Credential, ImportOpts, ImportSummary};

use super::PipelineState;
use super::context::{PipelineHandles, PipelineTuning, WorkerContext, create_pipeline_channels};
use super::error_handler::{join_stage, raise_on_error, report_fatal};
use super::lines::{WorkerReport, spawn_line_workers};
use super::walk::spawn_walk_thread;

/// Optional progress callbacks.
#[derive(Default)]
pub struct PipelineHooks {
    /// Called with 1 after each processed file, from worker threads.
    pub on_file_done: Option<Arc<dyn Fn(usize) + Send + Sync>>,
}

fn spawn_writer_thread<S>(
    mut sink: S,
    record_rx: crossbeam_channel::Receiver<Credential>,
    params: WriterParams,
) -> JoinHandle<Result<(WriterSummary, S)>>
where
    S: BatchSink + Send + 'static,
{
    thread::spawn(move || {
        let cancel = Arc::clone(&params.cancel);
        let state = Arc::clone(&params.state);
        let result = run_batch_writer(&mut sink, record_rx, params).map(|summary| (summary, sink));
        raise_on_error(&cancel, &state, result)
    })
}

/// Start writer, discoverer and the worker pool. Returns handles; the caller may watch
/// `path_count_rx` / `state` for progress and must pass the handles to [`finish_pipeline`].
/// Walk → path queue → line workers → record queue → writer → `sink`.
pub fn start_pipeline<S>(
    root: &Path,
    opts: &ImportOpts,
    sink: S,
    policy: Box<dyn FlushPolicy>,
    hooks: PipelineHooks,
) -> Result<PipelineHandles<S>>
where
    S: BatchSink + Send + 'static,
{
    let started = Instant::now();
    opts.validate()?;
    let tuning = PipelineTuning::from_opts(opts);
    let cancel = opts.cancel.clone().unwrap_or_default();
    let state = Arc::new(PipelineState::default());
    debug!(
        "pipeline: {} workers, path queue {}, record queue {}, batch size {}, delimiters {:?}",
        tuning.num_workers,
        tuning.path_queue_cap,
        tuning.record_queue_cap,
        opts.batch_size,
        opts.delimiters.to_string()
    );

    let channels = create_pipeline_channels(root, opts, &tuning, &cancel, &state);

    let writer_handle = spawn_writer_thread(
        sink,
        channels.record_rx,
        WriterParams {
            batch_size: opts.batch_size,
            policy,
            state: Arc::clone(&state),
            cancel: Arc::clone(&cancel),
        },
    );

    let walk_handle = spawn_walk_thread(
        channels.path_tx,
        channels.path_count_tx,
        channels.ctx,
        tuning.parallel_walk,
    );

    let worker_handles = spawn_line_workers(
        channels.path_rx,
        &channels.record_tx,
        WorkerContext {
            delimiters: opts.delimiters.clone(),
            cancel: Arc::clone(&cancel),
            state: Arc::clone(&state),
            on_file_done: hooks.on_file_done,
        },
        tuning.num_workers,
    );

    // Dropping the last sender closes the record queue once every worker has exited.
    drop(channels.record_tx);

    Ok(PipelineHandles {
        path_count_rx: channels.path_count_rx,
        walk_handle,
        worker_handles,
        writer_handle,
        state,
        cancel,
        started,
    })
}

/// Join the stages in pipeline order: discoverer (its exit closes the path queue), every worker
/// (the last exit closes the record queue), then the writer after its final flush.
/// On failure, logs the last progress and returns the first error; the sink is dropped.
pub fn finish_pipeline<S>(handles: PipelineHandles<S>) -> Result<(ImportSummary, S)> {
    let PipelineHandles {
        path_count_rx: _,
        walk_handle,
        worker_handles,
        writer_handle,
        state,
        cancel,
        started,
    } = handles;
    let mut first_error = None;

    let discovered = join_stage(
        "file discovery",
        walk_handle,
        &cancel,
        &state,
        &mut first_error,
    );
    debug!("coordinator: discovery finished ({:?} files)", discovered);

    let mut workers = WorkerReport::default();
    for h in worker_handles {
        if let Some(r) = join_stage("line worker", h, &cancel, &state, &mut first_error) {
            workers.files += r.files;
            workers.records += r.records;
            workers.skipped += r.skipped;
        }
    }
    debug!("coordinator: workers drained ({:?})", workers);

    let writer = join_stage(
        "batch writer",
        writer_handle,
        &cancel,
        &state,
        &mut first_error,
    );

    if let Some(err) = first_error {
        report_fatal(&state.snapshot(), &err);
        return Err(err);
    }
    let Some((written, sink)) = writer else {
        anyhow::bail!("batch writer returned no result");
    };

    let progress = state.snapshot();
    let summary = ImportSummary {
        files_discovered: discovered.unwrap_or(progress.files_discovered),
        files_processed: progress.files_processed,
        records_enqueued: progress.records_enqueued,
        lines_skipped: progress.lines_skipped,
        tallies: written.tallies,
        elapsed: started.elapsed(),
        cancelled: written.cancelled || cancel.load(Ordering::Relaxed),
    };
    Ok((summary, sink))
}

/// Run the whole pipeline to completion into `sink`.
pub fn run_pipeline<S>(
    root: &Path,
    opts: &ImportOpts,
    sink: S,
    policy: Box<dyn FlushPolicy>,
) -> Result<(ImportSummary, S)>
where
    S: BatchSink + Send + 'static,
{
    let handles = start_pipeline(root, opts, sink, policy, PipelineHooks::default())?;
    finish_pipeline(handles)
}
