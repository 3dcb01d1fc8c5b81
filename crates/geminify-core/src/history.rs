//! Command history: every successful exchange is appended here.

use anyhow::{anyhow, Result};
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub query: String,
    pub response: String,
    pub model: String,
    pub timestamp: DateTime<Utc>,
}

/// Append-only sink the response flow writes to after a success.
pub trait HistorySink {
    fn add(&mut self, query: &str, response: &str, model: &str) -> Result<()>;
}

/// SQLite-backed history store.
pub struct SqliteHistory {
    conn: Connection,
}

impl SqliteHistory {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    /// Opens the store at its default location under the user data directory.
    pub fn open_default() -> Result<Self> {
        Self::open(&Self::default_path()?)
    }

    pub fn default_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow!("Could not determine data directory"))?;
        Ok(data_dir.join("geminify").join("history.db"))
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                query TEXT NOT NULL,
                response TEXT NOT NULL,
                model TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );",
        )?;
        Ok(Self { conn })
    }

    /// Most recent entries first.
    pub fn list(&self, limit: usize) -> Result<Vec<HistoryEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, query, response, model, created_at FROM history
             ORDER BY created_at DESC, id DESC LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (id, query, response, model, millis) = row?;
            let timestamp = Utc
                .timestamp_millis_opt(millis)
                .single()
                .ok_or_else(|| anyhow!("Invalid timestamp {} in history entry {}", millis, id))?;
            entries.push(HistoryEntry {
                id,
                query,
                response,
                model,
                timestamp,
            });
        }
        Ok(entries)
    }

    pub fn len(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM history", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn clear(&mut self) -> Result<usize> {
        Ok(self.conn.execute("DELETE FROM history", [])?)
    }
}

impl HistorySink for SqliteHistory {
    fn add(&mut self, query: &str, response: &str, model: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO history (query, response, model, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![query, response, model, Utc::now().timestamp_millis()],
        )?;
        Ok(())
    }
}

impl HistorySink for Vec<(String, String, String)> {
    fn add(&mut self, query: &str, response: &str, model: &str) -> Result<()> {
        self.push((query.to_string(), response.to_string(), model.to_string()));
        Ok(())
    }
}
