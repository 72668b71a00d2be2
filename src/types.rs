//! Public and internal types for the credsink API and pipeline.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use crate::error::ImportError;
use crate::utils::config::{ImportDefaults, QueueConsts};

/// Destination bucket for a secret. Each category maps to one table `(identifier, secret)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Clear,
    Md5,
    Sha1,
}

impl Category {
    /// Every category, in the order trailing batches are flushed.
    pub const ALL: [Category; 3] = [Category::Clear, Category::Md5, Category::Sha1];

    /// Destination table name.
    pub const fn table(self) -> &'static str {
        match self {
            Category::Clear => "clear",
            Category::Md5 => "md5",
            Category::Sha1 => "sha1",
        }
    }

    /// Position in [`Category::ALL`]; used to index per-category arrays.
    pub const fn index(self) -> usize {
        match self {
            Category::Clear => 0,
            Category::Md5 => 1,
            Category::Sha1 => 2,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// One parsed and classified line: who, what, and which table it goes to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credential {
    pub identifier: String,
    pub secret: String,
    pub category: Category,
}

/// Set of delimiter characters. Only the first occurrence of any of them splits a line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delimiters(Vec<char>);

impl Delimiters {
    pub fn contains(&self, c: char) -> bool {
        self.0.contains(&c)
    }

    pub fn chars(&self) -> &[char] {
        &self.0
    }
}

impl Default for Delimiters {
    fn default() -> Self {
        Delimiters(ImportDefaults::DELIMITERS.chars().collect())
    }
}

impl FromStr for Delimiters {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars: Vec<char> = Vec::with_capacity(s.len());
        for c in s.chars() {
            if !chars.contains(&c) {
                chars.push(c);
            }
        }
        if chars.is_empty() {
            return Err(ImportError::Config(
                "at least one delimiter character is required".to_string(),
            ));
        }
        Ok(Delimiters(chars))
    }
}

impl fmt::Display for Delimiters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in &self.0 {
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

/// Lib options for [`import_dir`](crate::import_dir) and
/// [`run_pipeline`](crate::pipeline::run_pipeline).
#[derive(Clone, Debug)]
pub struct ImportOpts {
    /// Characters that separate identifier from secret.
    pub delimiters: Delimiters,
    /// Number of line workers.
    pub num_workers: usize,
    /// Rows per category per transaction.
    pub batch_size: usize,
    /// Only files whose name ends with this are imported.
    pub suffix: String,
    /// Follow symbolic links during discovery.
    pub follow_links: bool,
    /// Walk the tree with jwalk (parallel) instead of walkdir (serial).
    pub parallel_walk: bool,
    /// Path queue capacity. When None, `num_workers * PATHS_PER_WORKER`.
    pub path_queue_cap: Option<usize>,
    /// Record queue capacity.
    pub record_queue_cap: usize,
    /// External cancellation token. Raising it stops every stage at its next blocking point.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for ImportOpts {
    fn default() -> Self {
        Self {
            delimiters: Delimiters::default(),
            num_workers: ImportDefaults::CONCURRENCY,
            batch_size: ImportDefaults::BATCH_SIZE,
            suffix: ImportDefaults::SUFFIX.to_string(),
            follow_links: false,
            parallel_walk: false,
            path_queue_cap: None,
            record_queue_cap: QueueConsts::RECORD_QUEUE_CAP,
            cancel: None,
        }
    }
}

impl ImportOpts {
    /// Reject options the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ImportError> {
        if self.num_workers == 0 {
            return Err(ImportError::Config("concurrency must be at least 1".into()));
        }
        if self.batch_size == 0 {
            return Err(ImportError::Config("batch size must be at least 1".into()));
        }
        if self.suffix.is_empty() {
            return Err(ImportError::Config("file suffix must not be empty".into()));
        }
        if self.record_queue_cap == 0 || self.path_queue_cap == Some(0) {
            return Err(ImportError::Config("queue capacity must be at least 1".into()));
        }
        Ok(())
    }

    pub fn path_queue_cap(&self) -> usize {
        self.path_queue_cap
            .unwrap_or(self.num_workers.saturating_mul(QueueConsts::PATHS_PER_WORKER))
            .max(1)
    }
}

/// Full options (CLI). Use [`ImportOpts`] for lib.
#[derive(Clone, Debug, Default)]
pub struct Opts {
    /// Database path. When None, uses `root.join(<package db filename>)`.
    pub db_path: Option<PathBuf>,
    /// Encrypt a new database with SQLCipher (existing encrypted databases are detected).
    pub encrypt: bool,
    /// Debug logging and a progress bar.
    pub verbose: bool,
    /// Parse and classify everything but write nothing.
    pub dry_run: bool,
    pub import: ImportOpts,
}

/// Rows and flushes committed for one category.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CategoryTally {
    pub rows: usize,
    pub flushes: usize,
}

/// What a run did. Returned by [`import_dir`](crate::import_dir) and the pipeline.
#[derive(Clone, Debug, Default)]
pub struct ImportSummary {
    pub files_discovered: usize,
    pub files_processed: usize,
    pub records_enqueued: usize,
    pub lines_skipped: usize,
    /// Indexed by [`Category::index`].
    pub tallies: [CategoryTally; 3],
    pub elapsed: Duration,
    /// True when the run stopped early through the cancellation token.
    pub cancelled: bool,
}

impl ImportSummary {
    pub fn tally(&self, category: Category) -> CategoryTally {
        self.tallies[category.index()]
    }

    pub fn rows(&self, category: Category) -> usize {
        self.tally(category).rows
    }

    pub fn total_rows(&self) -> usize {
        self.tallies.iter().map(|t| t.rows).sum()
    }

    pub fn total_flushes(&self) -> usize {
        self.tallies.iter().map(|t| t.flushes).sum()
    }
}
