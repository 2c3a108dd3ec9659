use crate::error::Result;
use crate::models::IndexedPage;
use rusqlite::{params, Connection, OpenFlags};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Stored fields of the durable index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Path,
    Name,
    Content,
}

/// Open (and create if needed) the durable index used as the write side.
pub fn open_index(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;

    create_schema(&conn)?;

    log::info!("Durable index opened at {:?}", db_path);
    Ok(conn)
}

fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS pages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            path TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            indexed_at INTEGER NOT NULL
        )",
        [],
    )?;

    // Content is tokenized for matching but never read back.
    conn.execute(
        "CREATE VIRTUAL TABLE IF NOT EXISTS pages_fts USING fts5(
            name,
            content,
            tokenize = \"unicode61 tokenchars '_'\"
        )",
        [],
    )?;

    conn.execute(
        "CREATE TRIGGER IF NOT EXISTS pages_ad AFTER DELETE ON pages BEGIN
            DELETE FROM pages_fts WHERE rowid = old.id;
        END",
        [],
    )?;

    Ok(())
}

/// Insert or replace the record stored under `page.path`.
pub fn upsert_page(conn: &Connection, page: &IndexedPage<'_>) -> Result<()> {
    conn.execute("DELETE FROM pages WHERE path = ?", params![page.path])?;

    let now = chrono::Utc::now().timestamp();
    conn.execute(
        "INSERT INTO pages (path, name, indexed_at) VALUES (?, ?, ?)",
        params![page.path, page.name, now],
    )?;
    let id = conn.last_insert_rowid();

    conn.execute(
        "INSERT INTO pages_fts (rowid, name, content) VALUES (?, ?, ?)",
        params![id, page.name, page.content],
    )?;

    Ok(())
}

/// Number of pages in the durable index.
pub fn num_docs(conn: &Connection) -> Result<usize> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM pages", [], |row| row.get(0))?;
    Ok(count as usize)
}

/// Number of pages holding at least one token in `field`.
pub fn doc_count(conn: &Connection, field: Field) -> Result<usize> {
    let sql = match field {
        Field::Path => "SELECT COUNT(*) FROM pages WHERE path <> ''",
        Field::Name => "SELECT COUNT(*) FROM pages WHERE trim(name) <> ''",
        Field::Content => "SELECT COUNT(*) FROM pages_fts WHERE trim(content) <> ''",
    };
    let count: i64 = conn.query_row(sql, [], |row| row.get(0))?;
    Ok(count as usize)
}

/// Read side of the durable index.
///
/// Holds its own connection and tracks the SQLite `data_version` so callers
/// can tell whether a commit happened since the last refresh.
pub struct SearcherManager {
    conn: Mutex<Connection>,
    seen_version: Mutex<i64>,
}

impl SearcherManager {
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            db_path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX | OpenFlags::SQLITE_OPEN_URI,
        )?;
        conn.execute_batch("PRAGMA query_only = ON;")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let version = data_version(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            seen_version: Mutex::new(version),
        })
    }

    /// Bring the view up to the latest commit. Returns true when a commit
    /// happened since the previous refresh.
    pub fn maybe_refresh_blocking(&self) -> Result<bool> {
        let conn = self.lock_conn();
        let current = data_version(&conn)?;

        let mut seen = match self.seen_version.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if *seen == current {
            return Ok(false);
        }

        log::debug!("Searcher refreshed (data_version {} -> {})", *seen, current);
        *seen = current;
        Ok(true)
    }

    /// Run `f` against the current view.
    pub fn execute<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.lock_conn();
        f(&conn)
    }

    pub fn close(self) -> Result<()> {
        let conn = match self.conn.into_inner() {
            Ok(conn) => conn,
            Err(poisoned) => poisoned.into_inner(),
        };
        conn.close().map_err(|(_, e)| e.into())
    }

    fn lock_conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        match self.conn.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn data_version(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("PRAGMA data_version", [], |row| row.get(0))?)
}
