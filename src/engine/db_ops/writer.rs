//! Batch writer: the single consumer of the record queue.
//!
//! Records are grouped into one [`PendingBatch`] per [`Category`]. A batch is flushed as soon as
//! it reaches `batch_size`, and every non-empty batch is flushed once more when the queue closes
//! (in [`Category::ALL`] order). Each flush goes through a [`BatchSink`] as one all-or-nothing
//! unit; what happens after a failed flush is decided by a [`FlushPolicy`].

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::{debug, info, warn};
use rusqlite::Connection;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crate::error::ImportError;
use crate::pipeline::PipelineState;
use crate::utils::config::{COMMIT_LOG_EVERY_BATCHES, QueueConsts};
use crate::{Category, CategoryTally, Credential};

use super::insert_sql;

/// Destination of flushed batches. `flush` must be atomic: either every row lands or none does.
pub trait BatchSink {
    fn flush(&mut self, category: Category, rows: &[Credential]) -> Result<()>;
}

/// SQLite destination. One transaction per flush, one cached insert statement per category.
pub struct SqliteSink {
    conn: Connection,
}

impl SqliteSink {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Checkpoint the WAL and close the connection, surfacing close errors.
    pub fn close(self) -> Result<()> {
        if let Err(e) = self
            .conn
            .query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))
        {
            debug!("WAL checkpoint skipped: {}", e);
        }
        self.conn
            .close()
            .map_err(|(_, e)| e)
            .context("close database")
    }
}

impl BatchSink for SqliteSink {
    fn flush(&mut self, category: Category, rows: &[Credential]) -> Result<()> {
        // Dropping the transaction on an early return rolls it back.
        let tx = self.conn.transaction().context("begin transaction")?;
        {
            let mut stmt = tx
                .prepare_cached(insert_sql(category))
                .context("prepare insert")?;
            for r in rows {
                stmt.execute((r.identifier.as_str(), r.secret.as_str()))
                    .with_context(|| format!("insert row into {category}"))?;
            }
        }
        tx.commit().context("commit transaction")?;
        Ok(())
    }
}

/// Sink that stores nothing and records each flush as `(category, rows)`. Used by dry runs.
#[derive(Debug, Default)]
pub struct CountingSink {
    pub flushes: Vec<(Category, usize)>,
}

impl CountingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flush_count(&self, category: Category) -> usize {
        self.flushes.iter().filter(|(c, _)| *c == category).count()
    }

    pub fn row_count(&self, category: Category) -> usize {
        self.flushes
            .iter()
            .filter(|(c, _)| *c == category)
            .map(|(_, n)| n)
            .sum()
    }
}

impl BatchSink for CountingSink {
    fn flush(&mut self, category: Category, rows: &[Credential]) -> Result<()> {
        self.flushes.push((category, rows.len()));
        Ok(())
    }
}

/// What to do after a flush failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlushDecision {
    Abort,
    Retry(Duration),
}

/// Decision point for failed flushes. `attempt` starts at 1.
pub trait FlushPolicy: Send {
    fn on_flush_failure(
        &mut self,
        category: Category,
        attempt: u32,
        error: &anyhow::Error,
    ) -> FlushDecision;
}

/// Default policy: the first failure ends the run.
#[derive(Clone, Copy, Debug, Default)]
pub struct FailFast;

impl FlushPolicy for FailFast {
    fn on_flush_failure(&mut self, _: Category, _: u32, _: &anyhow::Error) -> FlushDecision {
        FlushDecision::Abort
    }
}

/// Retry a failed flush up to `max_attempts` times in total, doubling the delay each time.
#[derive(Clone, Copy, Debug)]
pub struct RetryWithBackoff {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl FlushPolicy for RetryWithBackoff {
    fn on_flush_failure(
        &mut self,
        category: Category,
        attempt: u32,
        error: &anyhow::Error,
    ) -> FlushDecision {
        if attempt >= self.max_attempts {
            return FlushDecision::Abort;
        }
        let delay = self.base_delay.saturating_mul(1 << (attempt - 1).min(16));
        warn!(
            "Flush into {} failed (attempt {}/{}): {:#}; retrying in {:?}",
            category, attempt, self.max_attempts, error, delay
        );
        FlushDecision::Retry(delay)
    }
}

/// Rows waiting for one category's next transaction.
#[derive(Debug)]
pub struct PendingBatch {
    category: Category,
    rows: Vec<Credential>,
    tally: CategoryTally,
}

impl PendingBatch {
    pub fn new(category: Category, batch_size: usize) -> Self {
        Self {
            category,
            rows: Vec::with_capacity(batch_size.min(64 * 1024)),
            tally: CategoryTally::default(),
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Committed so far (excludes pending rows).
    pub fn tally(&self) -> CategoryTally {
        self.tally
    }

    /// Commit pending rows through `sink`, asking `policy` after each failure.
    /// On success the batch is empty again; on abort it keeps its rows and nothing is counted.
    pub fn flush<S: BatchSink + ?Sized>(
        &mut self,
        sink: &mut S,
        policy: &mut dyn FlushPolicy,
    ) -> Result<usize> {
        let mut attempt = 0_u32;
        loop {
            attempt += 1;
            let err = match sink.flush(self.category, &self.rows) {
                Ok(()) => break,
                Err(err) => err,
            };
            match policy.on_flush_failure(self.category, attempt, &err) {
                FlushDecision::Abort => {
                    return Err(err.context(ImportError::Flush {
                        category: self.category,
                        rows: self.rows.len(),
                        attempts: attempt,
                    }));
                }
                FlushDecision::Retry(delay) => thread::sleep(delay),
            }
        }
        let n = self.rows.len();
        self.rows.clear();
        self.tally.rows += n;
        self.tally.flushes += 1;
        Ok(n)
    }
}

/// The three pending batches, indexed by [`Category::index`].
#[derive(Debug)]
pub struct CategoryBatches {
    batch_size: usize,
    batches: [PendingBatch; 3],
}

impl CategoryBatches {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size,
            batches: Category::ALL.map(|c| PendingBatch::new(c, batch_size)),
        }
    }

    /// Append a record; returns its category when that batch is now full.
    pub fn push(&mut self, record: Credential) -> Option<Category> {
        let category = record.category;
        let batch = &mut self.batches[category.index()];
        batch.rows.push(record);
        (batch.len() >= self.batch_size).then_some(category)
    }

    pub fn get_mut(&mut self, category: Category) -> &mut PendingBatch {
        &mut self.batches[category.index()]
    }

    /// Rows held across all categories, not yet flushed.
    pub fn pending(&self) -> usize {
        self.batches.iter().map(PendingBatch::len).sum()
    }

    pub fn tallies(&self) -> [CategoryTally; 3] {
        self.batches.each_ref().map(|b| b.tally())
    }
}

/// Result of [`run_batch_writer`].
#[derive(Clone, Debug, Default)]
pub struct WriterSummary {
    pub tallies: [CategoryTally; 3],
    pub received: usize,
    /// True when the writer stopped on the cancellation token rather than queue closure.
    pub cancelled: bool,
    /// True when another stage failed. Pending rows were dropped, not flushed.
    pub aborted: bool,
}

/// Parameters for [`run_batch_writer`].
pub struct WriterParams {
    pub batch_size: usize,
    pub policy: Box<dyn FlushPolicy>,
    /// Progress counters and the abort flag. Nothing is flushed once it reports an abort.
    pub state: Arc<PipelineState>,
    /// Checked after every record and whenever the queue has been idle for `WRITER_RECV_TIMEOUT`.
    pub cancel: Arc<AtomicBool>,
}

/// Drain `record_rx` into per-category batches and flush them through `sink`.
/// Returns when the queue is closed and drained, after the trailing flushes. On an external
/// cancel it flushes what it holds and returns; after a failure elsewhere it flushes nothing.
pub fn run_batch_writer<S: BatchSink + ?Sized>(
    sink: &mut S,
    record_rx: Receiver<Credential>,
    params: WriterParams,
) -> Result<WriterSummary> {
    let WriterParams {
        batch_size,
        mut policy,
        state,
        cancel,
    } = params;
    let mut batches = CategoryBatches::new(batch_size);
    let mut received = 0_usize;
    let mut cancelled = false;
    let log_every = batch_size.saturating_mul(COMMIT_LOG_EVERY_BATCHES).max(1);

    let mut commit = |batch: &mut PendingBatch, sink: &mut S| -> Result<()> {
        let n = batch.flush(sink, policy.as_mut())?;
        let before = state.add_committed(n);
        if (before + n) / log_every > before / log_every {
            info!("Committed {} rows", before + n);
        }
        Ok(())
    };

    debug!("writer: started (batch size {})", batch_size);
    loop {
        match record_rx.recv_timeout(QueueConsts::WRITER_RECV_TIMEOUT) {
            Ok(record) => {
                received += 1;
                if let Some(full) = batches.push(record)
                    && !state.is_aborted()
                {
                    commit(batches.get_mut(full), sink)?;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        if state.is_aborted() {
            break;
        }
        if cancel.load(Ordering::Relaxed) {
            info!("Import cancelled; flushing pending rows...");
            cancelled = true;
            break;
        }
    }

    // Failed stages mark the abort before dropping their sender, so a closed queue is checked
    // here too.
    let aborted = state.is_aborted();
    if aborted {
        warn!(
            "Import aborted by a failed stage; dropping {} pending rows",
            batches.pending()
        );
    } else {
        for category in Category::ALL {
            let batch = batches.get_mut(category);
            if !batch.is_empty() {
                commit(batch, sink)?;
            }
        }
    }
    debug!("writer: stopped after {} records", received);

    Ok(WriterSummary {
        tallies: batches.tallies(),
        received,
        cancelled,
        aborted,
    })
}
