//! DB tests: schema, SqliteSink flushes, rollback of a failed batch, and a file database.

use credsink::engine::db_ops::{BatchSink, SqliteSink};
use credsink::engine::{count_rows, load_rows, open_db, open_db_in_memory};
use credsink::{Category, Credential};

fn cred(identifier: &str, secret: &str, category: Category) -> Credential {
    Credential {
        identifier: identifier.to_string(),
        secret: secret.to_string(),
        category,
    }
}

#[test]
fn test_schema_has_empty_category_tables() {
    let conn = open_db_in_memory().unwrap();
    for category in Category::ALL {
        assert_eq!(count_rows(&conn, category).unwrap(), 0);
    }
}

#[test]
fn test_flush_inserts_into_category_table() {
    let mut sink = SqliteSink::new(open_db_in_memory().unwrap());
    let rows = [
        cred("alice", "hunter2", Category::Clear),
        cred("bob", "letmein", Category::Clear),
    ];
    sink.flush(Category::Clear, &rows).unwrap();

    let conn = sink.connection();
    assert_eq!(count_rows(conn, Category::Clear).unwrap(), 2);
    assert_eq!(count_rows(conn, Category::Md5).unwrap(), 0);
    assert_eq!(
        load_rows(conn, Category::Clear).unwrap(),
        vec![
            ("alice".to_string(), "hunter2".to_string()),
            ("bob".to_string(), "letmein".to_string()),
        ]
    );
}

#[test]
fn test_duplicates_are_kept() {
    let mut sink = SqliteSink::new(open_db_in_memory().unwrap());
    let row = cred("alice", "5f4dcc3b5aa765d61d8327deb882cf99", Category::Md5);
    sink.flush(Category::Md5, &[row.clone()]).unwrap();
    sink.flush(Category::Md5, &[row]).unwrap();
    assert_eq!(count_rows(sink.connection(), Category::Md5).unwrap(), 2);
}

#[test]
fn test_failed_flush_commits_nothing() {
    let mut sink = SqliteSink::new(open_db_in_memory().unwrap());
    sink.connection()
        .execute_batch(
            "CREATE TRIGGER reject_boom BEFORE INSERT ON clear
             WHEN NEW.secret = 'boom'
             BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
        )
        .unwrap();
    let rows = [
        cred("a", "one", Category::Clear),
        cred("b", "boom", Category::Clear),
        cred("c", "three", Category::Clear),
    ];
    assert!(sink.flush(Category::Clear, &rows).is_err());
    assert_eq!(count_rows(sink.connection(), Category::Clear).unwrap(), 0);

    // The connection is usable again after the rollback.
    sink.flush(Category::Clear, &rows[..1]).unwrap();
    assert_eq!(count_rows(sink.connection(), Category::Clear).unwrap(), 1);
}

#[test]
fn test_flush_into_missing_table_fails() {
    let mut sink = SqliteSink::new(open_db_in_memory().unwrap());
    sink.connection().execute_batch("DROP TABLE sha1").unwrap();
    let rows = [cred("a", "da39a3ee5e6b4b0d3255bfef95601890afd80709", Category::Sha1)];
    assert!(sink.flush(Category::Sha1, &rows).is_err());
}

#[test]
fn test_file_db_reopen_keeps_rows() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("credsink.db");

    let mut sink = SqliteSink::new(open_db(&db_path, None).unwrap());
    sink.flush(Category::Clear, &[cred("alice", "pw", Category::Clear)])
        .unwrap();
    sink.close().unwrap();

    // Schema creation is idempotent; reopening must not drop existing rows.
    let conn = open_db(&db_path, None).unwrap();
    assert_eq!(count_rows(&conn, Category::Clear).unwrap(), 1);
    let mode: String = conn
        .query_row("PRAGMA journal_mode", [], |r| r.get(0))
        .unwrap();
    assert_eq!(mode.to_lowercase(), "wal");
}
