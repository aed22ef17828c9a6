//! Database connection management.
//!
//! The [`Database`] struct owns a [`rusqlite::Connection`] plus the
//! [`ChangeFeed`] that every write publishes to, and guarantees that
//! migrations are run before any other operation.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use rusqlite::Connection;
use studyhall_shared::constants::DB_FILE_NAME;
use studyhall_shared::ChangeEvent;
use tokio::sync::broadcast;

use crate::error::{Result, StoreError};
use crate::feed::ChangeFeed;
use crate::migrations;

/// Wrapper around a [`rusqlite::Connection`].
pub struct Database {
    conn: Connection,
    feed: ChangeFeed,
}

impl Database {
    /// Open (or create) the default application database.
    ///
    /// The database file is placed in the platform-appropriate data directory:
    /// - Linux:   `~/.local/share/studyhall/studyhall.db`
    /// - macOS:   `~/Library/Application Support/com.studyhall.studyhall/studyhall.db`
    /// - Windows: `{FOLDERID_RoamingAppData}\studyhall\studyhall\data\studyhall.db`
    pub fn new(feed_capacity: usize) -> Result<Self> {
        let project_dirs =
            ProjectDirs::from("com", "studyhall", "studyhall").ok_or(StoreError::NoDataDir)?;

        let data_dir = project_dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;

        let db_path = data_dir.join(DB_FILE_NAME);

        tracing::info!(path = %db_path.display(), "opening database");

        Self::open_at(&db_path, feed_capacity)
    }

    /// Open (or create) a database at an explicit path.
    pub fn open_at(path: &Path, feed_capacity: usize) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        tracing::debug!(journal_mode = %mode, "database opened");

        Self::init(conn, feed_capacity)
    }

    /// Open a private in-memory database. Nothing survives the handle.
    pub fn open_in_memory(feed_capacity: usize) -> Result<Self> {
        Self::init(Connection::open_in_memory()?, feed_capacity)
    }

    fn init(conn: Connection, feed_capacity: usize) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrations::run_migrations(&conn)?;

        Ok(Self {
            conn,
            feed: ChangeFeed::new(feed_capacity),
        })
    }

    /// Return a reference to the underlying `rusqlite::Connection`.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn feed(&self) -> &ChangeFeed {
        &self.feed
    }

    /// Receive every change event committed after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.feed.subscribe()
    }

    pub(crate) fn publish(&self, event: ChangeEvent) {
        self.feed.publish(event);
    }

    /// Return the filesystem path of the open database (if any).
    pub fn path(&self) -> Option<PathBuf> {
        self.conn
            .path()
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("test.db");

        let db = Database::open_at(&path, 16).expect("should open");
        assert!(db.path().is_some());
        assert!(path.exists());
    }

    #[test]
    fn reopen_keeps_schema_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");

        drop(Database::open_at(&path, 16).unwrap());
        let db = Database::open_at(&path, 16).unwrap();

        let version: u32 = db
            .conn()
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap();
        assert_eq!(version, migrations::CURRENT_VERSION);
    }
}
