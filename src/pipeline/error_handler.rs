use anyhow::Result;
use log::error;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use super::{PipelineState, ProgressSnapshot};

/// If a stage failed, mark the run aborted and raise the cancellation token so the other stages
/// stop at their next blocking point. Call it while the stage still holds its queue sender.
/// Returns `result` unchanged.
pub fn raise_on_error<T>(
    cancel: &AtomicBool,
    state: &PipelineState,
    result: Result<T>,
) -> Result<T> {
    if result.is_err() {
        state.mark_aborted();
        cancel.store(true, Ordering::Relaxed);
    }
    result
}

/// Join one stage. Keeps the first failure in `first_error`; later ones are only logged.
pub fn join_stage<T>(
    stage: &str,
    handle: JoinHandle<Result<T>>,
    cancel: &AtomicBool,
    state: &PipelineState,
    first_error: &mut Option<anyhow::Error>,
) -> Option<T> {
    let err = match handle.join() {
        Ok(Ok(value)) => return Some(value),
        Ok(Err(err)) => err.context(format!("{stage} failed")),
        Err(_) => anyhow::anyhow!("{stage} thread panicked"),
    };
    state.mark_aborted();
    cancel.store(true, Ordering::Relaxed);
    match first_error {
        Some(_) => log::debug!("{:#}", err),
        None => *first_error = Some(err),
    }
    None
}

/// Report a fatal error with the last known progress before the caller exits.
pub fn report_fatal(progress: &ProgressSnapshot, err: &anyhow::Error) {
    error!("Import aborted: {:#}", err);
    error!("Last progress: {}", progress);
}
