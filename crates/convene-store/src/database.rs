//! Database connection management.
//!
//! The [`Database`] struct owns a [`rusqlite::Connection`] and guarantees that
//! migrations are run before any other operation.
//!
//! Several `Database` handles may point at the same file (one per thread or
//! process).  Every handle runs in WAL mode with a busy timeout, and
//! multi-statement writes go through [`Database::immediate`], which takes the
//! SQLite write lock up front so concurrent writers queue instead of
//! interleaving.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use rusqlite::Connection;

use crate::error::{Result, StoreError};
use crate::migrations;

/// How long a writer waits for the lock held by another connection.
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// Wrapper around a [`rusqlite::Connection`].
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the default application database.
    ///
    /// The database file is placed in the platform-appropriate data directory:
    /// - Linux:   `~/.local/share/convene/convene.db`
    /// - macOS:   `~/Library/Application Support/app.convene.convene/convene.db`
    /// - Windows: `{FOLDERID_RoamingAppData}\convene\convene\data\convene.db`
    pub fn new() -> Result<Self> {
        let project_dirs =
            ProjectDirs::from("app", "convene", "convene").ok_or(StoreError::NoDataDir)?;

        let data_dir = project_dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;

        let db_path = data_dir.join("convene.db");

        tracing::info!(path = %db_path.display(), "opening database");

        Self::open_at(&db_path)
    }

    /// Open (or create) a database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        tracing::debug!(journal_mode = %mode, "journal mode set");

        Self::prepare(conn)
    }

    /// Open a private in-memory database.  Each call yields an empty, fully
    /// migrated schema.
    pub fn open_in_memory() -> Result<Self> {
        Self::prepare(Connection::open_in_memory()?)
    }

    fn prepare(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        migrations::run_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Return a reference to the underlying `rusqlite::Connection`.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Return the filesystem path of the open database (if any).
    pub fn path(&self) -> Option<PathBuf> {
        self.conn.path().map(PathBuf::from)
    }

    /// Run `f` inside a `BEGIN IMMEDIATE` transaction.
    ///
    /// The write lock is acquired before `f` reads anything, so a
    /// read-check-write sequence inside `f` cannot interleave with another
    /// connection's writes.  `f` commits when it returns `Ok`, and rolls back
    /// otherwise.  Calls nested inside an open transaction join it.
    pub fn immediate<T, E>(
        &self,
        f: impl FnOnce(&Self) -> std::result::Result<T, E>,
    ) -> std::result::Result<T, E>
    where
        E: From<StoreError>,
    {
        if !self.conn.is_autocommit() {
            return f(self);
        }

        self.conn
            .execute_batch("BEGIN IMMEDIATE")
            .map_err(|e| E::from(StoreError::Sqlite(e)))?;

        match f(self) {
            Ok(value) => {
                self.conn
                    .execute_batch("COMMIT")
                    .map_err(|e| E::from(StoreError::Sqlite(e)))?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback) = self.conn.execute_batch("ROLLBACK") {
                    tracing::error!(error = %rollback, "rollback failed");
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INSERT_MUSIC: &str =
        "INSERT INTO categories (id, name, description, icon) VALUES ('c1', 'Music', '', '')";

    #[test]
    fn open_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");

        let db = Database::open_at(&path).expect("should open");
        assert!(db.path().is_some());

        let version: u32 = db
            .conn()
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap();
        assert_eq!(version, crate::migrations::CURRENT_VERSION);
    }

    #[test]
    fn immediate_commits_on_ok() {
        let db = Database::open_in_memory().unwrap();
        db.immediate(|db| -> Result<()> {
            db.conn().execute(INSERT_MUSIC, [])?;
            Ok(())
        })
        .unwrap();

        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM categories", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn immediate_rolls_back_on_err() {
        let db = Database::open_in_memory().unwrap();
        let result = db.immediate(|db| -> Result<()> {
            db.conn().execute(INSERT_MUSIC, [])?;
            Err(StoreError::NotFound)
        });
        assert!(matches!(result, Err(StoreError::NotFound)));

        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM categories", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
        assert!(db.conn().is_autocommit());
    }

    #[test]
    fn nested_immediate_joins_outer_transaction() {
        let db = Database::open_in_memory().unwrap();
        let result = db.immediate(|db| -> Result<()> {
            db.immediate(|db| -> Result<()> {
                db.conn().execute(INSERT_MUSIC, [])?;
                Ok(())
            })?;
            Err(StoreError::NotFound)
        });
        assert!(result.is_err());

        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM categories", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
