//! Application configuration constants.
//! Defaults and tuning in one place.

use std::sync::OnceLock;
use std::time::Duration;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived file names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    pkg_name: &'static str,
    db_filename: String,
    config_filename: String,
    key_env_var: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                pkg_name: pkg,
                db_filename: format!("{pkg}.db"),
                config_filename: format!(".{pkg}.toml"),
                key_env_var: format!("{}_DB_KEY", pkg.to_uppercase()),
            }
        })
    }

    pub fn pkg_name(&self) -> &str {
        self.pkg_name
    }

    /// Default database file name, created in the input root when `--db` is not given.
    pub fn db_filename(&self) -> &str {
        &self.db_filename
    }

    /// Optional settings file looked up in the input root.
    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }

    /// Environment variable holding the SQLCipher passphrase.
    pub fn key_env_var(&self) -> &str {
        &self.key_env_var
    }
}

// ---- Run defaults ----

pub struct ImportDefaults;

impl ImportDefaults {
    pub const DELIMITERS: &'static str = ";:|";
    pub const CONCURRENCY: usize = 10;
    /// Rows per category per transaction (balance transaction size vs round-trips).
    pub const BATCH_SIZE: usize = 1000;
    pub const SUFFIX: &'static str = ".txt";
}

// ---- Queues ----

pub struct QueueConsts;

impl QueueConsts {
    /// Path queue slots per line worker.
    pub const PATHS_PER_WORKER: usize = 4;
    /// Record queue capacity between the worker pool and the writer.
    pub const RECORD_QUEUE_CAP: usize = 1000;
    /// How long the writer blocks on the record queue before looking at the cancellation token.
    pub const WRITER_RECV_TIMEOUT: Duration = Duration::from_millis(200);
}

// ---- Input files ----

/// Files above this size are memory-mapped instead of read onto the heap (bytes). 64 MB.
pub const INPUT_MMAP_THRESHOLD: u64 = 64 * 1024 * 1024;

// ---- Progress ----

/// A "Committed N rows" info line is logged every `batch_size * COMMIT_LOG_EVERY_BATCHES` rows.
pub const COMMIT_LOG_EVERY_BATCHES: usize = 10;
