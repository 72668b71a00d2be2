//! Database operations: schema, open/load, per-category batch writer.

mod connection;
mod writer;

pub use connection::{
    count_rows, load_rows, open_db, open_db_in_memory, open_db_or_detect_encrypted,
    sqlite_version,
};
pub use writer::{
    BatchSink, CategoryBatches, CountingSink, FailFast, FlushDecision, FlushPolicy, PendingBatch,
    RetryWithBackoff, SqliteSink, WriterParams, WriterSummary, run_batch_writer,
};

use crate::Category;

/// WAL tuning pragmas (synchronous, autocheckpoint, size limit).
/// Use after PRAGMA journal_mode = WAL.
pub(crate) const WAL_PRAGMAS: &str = r#"
        PRAGMA synchronous = NORMAL;
        PRAGMA wal_autocheckpoint = 10000;
        PRAGMA journal_size_limit = 67108864;
        "#;

/// One two-column table per category. Rows are not deduplicated.
pub(crate) const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS clear (
    identifier TEXT NOT NULL,
    secret TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS md5 (
    identifier TEXT NOT NULL,
    secret TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS sha1 (
    identifier TEXT NOT NULL,
    secret TEXT NOT NULL
);
"#;

/// Insert statement for a category's table.
pub(crate) const fn insert_sql(category: Category) -> &'static str {
    match category {
        Category::Clear => "INSERT INTO clear (identifier, secret) VALUES (?1, ?2)",
        Category::Md5 => "INSERT INTO md5 (identifier, secret) VALUES (?1, ?2)",
        Category::Sha1 => "INSERT INTO sha1 (identifier, secret) VALUES (?1, ?2)",
    }
}
