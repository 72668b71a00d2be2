//! credsink: concurrent importer for plaintext credential dumps
//!
//! A directory walk feeds a bounded path queue; a pool of line workers splits every line at the
//! first delimiter, classifies the secret (md5, sha1 or clear) and feeds a bounded record queue;
//! a single writer commits each category in transactions of `batch_size` rows.

pub mod engine;
pub mod error;
pub mod import;
pub mod pipeline;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use error::{ImportError, LineError};
pub use types::*;

use log::debug;
use rusqlite::Connection;
use std::path::Path;

use crate::engine::db_ops::{FailFast, SqliteSink, open_db};

/// Result alias used by public credsink API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Import every matching file under `root` into the SQLite database at `db_path` (created with
/// its schema when missing). Unencrypted; use [`import_into`] with your own connection for a
/// keyed database.
///
/// The first fatal error (unreadable entry or file, failed flush) is returned after every stage
/// has stopped. When `opts.cancel` is raised the run stops early and the summary has
/// `cancelled` set.
pub fn import_dir(root: &Path, db_path: &Path, opts: &ImportOpts) -> Result<ImportSummary> {
    let conn = open_db(db_path, None)?;
    import_into(root, conn, opts)
}

/// Like [`import_dir`], on an already open connection whose schema is in place (see
/// [`open_db`](engine::open_db) and [`open_db_in_memory`](engine::open_db_in_memory)).
/// The connection is checkpointed and closed when the run succeeds.
pub fn import_into(root: &Path, conn: Connection, opts: &ImportOpts) -> Result<ImportSummary> {
    debug!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_uppercase(),
        opts
    );
    let (summary, sink) =
        pipeline::run_pipeline(root, opts, SqliteSink::new(conn), Box::new(FailFast))?;
    sink.close()?;
    Ok(summary)
}
