//! Error types for the import pipeline.
//!
//! Fatal conditions are [`ImportError`] values carried inside `anyhow::Error` (as the error
//! itself or as context on the underlying cause), so callers can `downcast_ref` to find out
//! which stage gave up. Line-level problems are [`LineError`] and never leave a worker.

use std::path::PathBuf;
use thiserror::Error;

use crate::Category;

/// Fatal errors: any of these stops the whole run.
#[derive(Error, Debug)]
pub enum ImportError {
    /// A directory entry under the input root could not be read.
    #[error("cannot read directory entry {}: {reason}", display_opt(.path))]
    Walk {
        path: Option<PathBuf>,
        reason: String,
    },

    /// An input file could not be read.
    #[error("cannot read input file {}", .path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A category batch could not be committed; nothing from this batch was written.
    #[error("flush of {rows} rows into `{category}` failed after {attempts} attempt(s)")]
    Flush {
        category: Category,
        rows: usize,
        attempts: u32,
    },

    /// The store could not be opened or prepared before the run.
    #[error("cannot open store at {}", .path.display())]
    Store { path: PathBuf },

    /// Invalid run options.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The run was stopped through the cancellation token.
    #[error("import cancelled")]
    Cancelled,
}

fn display_opt(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<unknown>".to_string())
}

/// Why a single line was discarded.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineError {
    #[error("line is blank")]
    Blank,
    #[error("line is not valid UTF-8")]
    NotText,
    #[error("no delimiter in line")]
    NoDelimiter,
    #[error("identifier is empty")]
    EmptyIdentifier,
}
