//! Engine module: line parsing, classification, storage and the CLI surface

pub mod arg_parser;
pub mod classify;
pub mod cli;
pub mod db_ops;
pub mod parse;
pub mod progress;
pub mod tools;

// Re-export commonly used functions
pub use arg_parser::Cli;
pub use classify::classify_secret;
pub use cli::handle_run;
pub use db_ops::{
    BatchSink, CountingSink, FailFast, FlushPolicy, RetryWithBackoff, SqliteSink, count_rows,
    load_rows, open_db, open_db_in_memory, open_db_or_detect_encrypted, sqlite_version,
};
pub use parse::{parse_line, split_line};
pub use tools::{check_root_and_canonicalize, has_suffix, running_as_root};
