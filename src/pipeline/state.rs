//! Progress counters shared by every stage, plus the abort flag.
//!
//! The counters are for reporting only. The abort flag is the one thing a stage acts on: once a
//! stage has failed, the writer commits nothing more.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct PipelineState {
    files_discovered: AtomicUsize,
    discovery_done: AtomicBool,
    files_processed: AtomicUsize,
    records_enqueued: AtomicUsize,
    lines_skipped: AtomicUsize,
    records_committed: AtomicUsize,
    aborted: AtomicBool,
}

/// Point-in-time copy of [`PipelineState`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub files_discovered: usize,
    pub discovery_done: bool,
    pub files_processed: usize,
    pub records_enqueued: usize,
    pub lines_skipped: usize,
    pub records_committed: usize,
}

impl PipelineState {
    pub fn add_discovered(&self) -> usize {
        self.files_discovered.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn mark_discovery_done(&self) {
        self.discovery_done.store(true, Ordering::Release);
    }

    /// Returns the new processed count.
    pub fn add_processed(&self) -> usize {
        self.files_processed.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn add_enqueued(&self, n: usize) {
        self.records_enqueued.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_skipped(&self, n: usize) {
        self.lines_skipped.fetch_add(n, Ordering::Relaxed);
    }

    /// Returns the committed count before this call.
    pub fn add_committed(&self, n: usize) -> usize {
        self.records_committed.fetch_add(n, Ordering::Relaxed)
    }

    /// A stage failed. Must be called before that stage drops its queue sender.
    pub fn mark_aborted(&self) {
        self.aborted.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    /// Total files to process, once discovery has finished.
    pub fn files_total(&self) -> Option<usize> {
        self.discovery_done
            .load(Ordering::Acquire)
            .then(|| self.files_discovered.load(Ordering::Relaxed))
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            files_discovered: self.files_discovered.load(Ordering::Relaxed),
            discovery_done: self.discovery_done.load(Ordering::Acquire),
            files_processed: self.files_processed.load(Ordering::Relaxed),
            records_enqueued: self.records_enqueued.load(Ordering::Relaxed),
            lines_skipped: self.lines_skipped.load(Ordering::Relaxed),
            records_committed: self.records_committed.load(Ordering::Relaxed),
        }
    }
}

impl fmt::Display for ProgressSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = if self.discovery_done { "" } else { "+" };
        write!(
            f,
            "files {}/{}{} processed, {} records queued, {} committed, {} lines skipped",
            self.files_processed,
            self.files_discovered,
            total,
            self.records_enqueued,
            self.records_committed,
            self.lines_skipped
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_unknown_until_discovery_done() {
        let state = PipelineState::default();
        state.add_discovered();
        state.add_discovered();
        assert_eq!(state.files_total(), None);
        state.mark_discovery_done();
        assert_eq!(state.files_total(), Some(2));
    }

    #[test]
    fn abort_is_sticky() {
        let state = PipelineState::default();
        assert!(!state.is_aborted());
        state.mark_aborted();
        state.mark_aborted();
        assert!(state.is_aborted());
    }

    #[test]
    fn snapshot_display() {
        let state = PipelineState::default();
        state.add_discovered();
        state.add_processed();
        state.add_enqueued(3);
        state.add_skipped(1);
        assert_eq!(state.add_committed(2), 0);
        assert_eq!(
            state.snapshot().to_string(),
            "files 1/1+ processed, 3 records queued, 2 committed, 1 lines skipped"
        );
    }
}
