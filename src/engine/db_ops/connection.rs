//! Open the destination database and read back what was imported.

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;

use crate::Category;
use crate::error::ImportError;
use crate::utils::get_passphrase;

use super::{SCHEMA, WAL_PRAGMAS};

/// Enable WAL and apply schema to an open connection (idempotent).
fn apply_wal_and_schema(conn: &Connection) -> Result<()> {
    conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))
        .context("enable WAL")?;
    conn.execute_batch(WAL_PRAGMAS).context("set WAL pragmas")?;
    conn.execute_batch(SCHEMA).context("create schema")?;
    Ok(())
}

/// Open or create the database and ensure schema + WAL.
/// If `passphrase` is Some, set the SQLCipher key before any other statement.
pub fn open_db(path: &Path, passphrase: Option<&str>) -> Result<Connection> {
    let store_err = || ImportError::Store {
        path: path.to_path_buf(),
    };
    let conn = Connection::open(path).with_context(store_err)?;

    if let Some(key) = passphrase {
        conn.pragma_update(None, "key", key)
            .context("set SQLCipher key")?;
    }

    apply_wal_and_schema(&conn).with_context(store_err)?;
    Ok(conn)
}

/// Open a database that may be encrypted: try without a key first; if the schema cannot be
/// read, load the passphrase (env → .env in `dir` → prompt) and reopen with it.
/// Returns (connection, passphrase_used).
pub fn open_db_or_detect_encrypted(path: &Path, dir: &Path) -> Result<(Connection, bool)> {
    let conn = Connection::open(path).with_context(|| ImportError::Store {
        path: path.to_path_buf(),
    })?;
    if conn
        .query_row("SELECT COUNT(*) FROM sqlite_master", [], |_| Ok(()))
        .is_ok()
    {
        apply_wal_and_schema(&conn)?;
        return Ok((conn, false));
    }
    drop(conn);
    let pass = get_passphrase(dir, false)?;
    let conn = open_db(path, Some(pass.as_str()))?;
    Ok((conn, true))
}

/// In-memory database with the same schema (tests and lib callers; no WAL).
pub fn open_db_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("open in-memory database")?;
    conn.execute_batch(SCHEMA).context("create schema")?;
    Ok(conn)
}

/// Library version of the connected SQLite (or SQLCipher) engine.
pub fn sqlite_version(conn: &Connection) -> Result<String> {
    conn.query_row("SELECT sqlite_version()", [], |row| row.get(0))
        .context("query sqlite version")
}

/// Number of rows in a category's table.
pub fn count_rows(conn: &Connection, category: Category) -> Result<usize> {
    let sql = format!("SELECT COUNT(*) FROM {}", category.table());
    let n: i64 = conn
        .query_row(&sql, [], |row| row.get(0))
        .with_context(|| format!("count rows in {category}"))?;
    Ok(n.max(0) as usize)
}

/// All (identifier, secret) rows of a category, in insertion order.
pub fn load_rows(conn: &Connection, category: Category) -> Result<Vec<(String, String)>> {
    let sql = format!(
        "SELECT identifier, secret FROM {} ORDER BY rowid",
        category.table()
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}
