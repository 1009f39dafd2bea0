use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};

use crate::query::QueryState;

/// Durable client-side storage: a small key/value table (session) plus the
/// recent-search log.
pub struct Storage {
    conn: Connection,
    path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentSearch {
    pub id: i64,
    pub title: String,
    pub location: String,
    pub platform: String,
    pub job_type: String,
    pub experience_level: String,
    pub searched_at: String,
}

impl Storage {
    pub fn open(path_override: Option<&Path>) -> Result<Self> {
        let path = match path_override {
            Some(p) => p.to_path_buf(),
            None => Self::default_path(),
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        let storage = Self { conn, path };
        storage.init()?;
        Ok(storage)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let storage = Self {
            conn: Connection::open_in_memory()?,
            path: PathBuf::from(":memory:"),
        };
        storage.init()?;
        Ok(storage)
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn default_path() -> PathBuf {
        // Use XDG data directory or fallback
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "jobhub") {
            proj_dirs.data_dir().join("jobhub.db")
        } else {
            PathBuf::from("jobhub.db")
        }
    }

    fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS recent_searches (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                location TEXT NOT NULL,
                platform TEXT NOT NULL,
                job_type TEXT NOT NULL,
                experience_level TEXT NOT NULL,
                searched_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_recent_searches_at ON recent_searches(searched_at);
            "#,
        )?;
        Ok(())
    }

    // --- Key/value ---

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()
            .with_context(|| format!("Failed to read '{}'", key))
    }

    /// Write several keys in one transaction.
    pub fn set_all(&self, entries: &[(&str, &str)]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        for (key, value) in entries {
            tx.execute(
                "INSERT INTO kv (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')",
                params![key, value],
            )?;
        }
        tx.commit().context("Failed to save settings")
    }

    /// Remove several keys in one transaction.
    pub fn remove_all(&self, keys: &[&str]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        for key in keys {
            tx.execute("DELETE FROM kv WHERE key = ?1", [key])?;
        }
        tx.commit().context("Failed to remove settings")
    }

    // --- Recent searches ---

    pub fn record_search(&self, query: &QueryState) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO recent_searches (title, location, platform, job_type, experience_level)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                query.title,
                query.location,
                query.platform.to_string(),
                query.job_type.to_string(),
                query.experience_level.to_string(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn recent_searches(&self, limit: usize) -> Result<Vec<RecentSearch>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, location, platform, job_type, experience_level, searched_at
             FROM recent_searches
             ORDER BY id DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map([limit as i64], Self::row_to_recent_search)?;
        rows.collect::<Result<Vec<_>, _>>()
            .context("Failed to list recent searches")
    }

    fn row_to_recent_search(row: &rusqlite::Row) -> rusqlite::Result<RecentSearch> {
        Ok(RecentSearch {
            id: row.get(0)?,
            title: row.get(1)?,
            location: row.get(2)?,
            platform: row.get(3)?,
            job_type: row.get(4)?,
            experience_level: row.get(5)?,
            searched_at: row.get(6)?,
        })
    }
}
