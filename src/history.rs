//! history.rs: durable trace of dispatched notifications.
//!
//! Append-only: rows are inserted, never updated or deleted.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub ts: DateTime<Utc>,
    pub source: String,
    pub title: String,
    pub permalink: String,
}

#[async_trait::async_trait]
pub trait HistoryStore: Send + Sync {
    async fn append(&self, record: &NotificationRecord) -> Result<()>;
}

/// SQLite table `results(id, date_time, source_id, item_title, item_permalink)`.
#[derive(Clone)]
pub struct SqliteHistory {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteHistory {
    /// Open (or create) the database and ensure the table exists.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("opening history db {}", path.display()))?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS results (
                id             INTEGER PRIMARY KEY AUTOINCREMENT,
                date_time      TEXT NOT NULL,
                source_id      TEXT NOT NULL,
                item_title     TEXT NOT NULL,
                item_permalink TEXT NOT NULL
            );",
        )
        .context("creating results table")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Newest first.
    pub fn recent(&self, limit: usize) -> Result<Vec<NotificationRecord>> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| anyhow::anyhow!("history connection poisoned"))?;
        let mut stmt = conn.prepare(
            "SELECT date_time, source_id, item_title, item_permalink
             FROM results ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(
            params![limit as i64],
            |row| -> rusqlite::Result<(String, String, String, String)> {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            },
        )?;
        let mut out = Vec::new();
        for row in rows {
            let (ts, source, title, permalink) = row?;
            let ts = DateTime::parse_from_rfc3339(&ts)
                .with_context(|| format!("bad date_time {ts:?} in history"))?
                .with_timezone(&Utc);
            out.push(NotificationRecord {
                ts,
                source,
                title,
                permalink,
            });
        }
        Ok(out)
    }
}

#[async_trait::async_trait]
impl HistoryStore for SqliteHistory {
    async fn append(&self, record: &NotificationRecord) -> Result<()> {
        let conn = Arc::clone(&self.conn);
        let record = record.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let conn = conn
                .lock()
                .map_err(|_| anyhow::anyhow!("history connection poisoned"))?;
            conn.execute(
                "INSERT INTO results (date_time, source_id, item_title, item_permalink)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    record.ts.to_rfc3339(),
                    record.source,
                    record.title,
                    record.permalink
                ],
            )
            .context("inserting history row")?;
            Ok(())
        })
        .await
        .context("history writer task")?
    }
}

/// In-memory store for tests and demos.
#[derive(Debug, Default)]
pub struct MemoryHistory {
    inner: Mutex<Vec<NotificationRecord>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<NotificationRecord> {
        self.inner
            .lock()
            .map(|v| v.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl HistoryStore for MemoryHistory {
    async fn append(&self, record: &NotificationRecord) -> Result<()> {
        self.inner
            .lock()
            .map_err(|_| anyhow::anyhow!("history mutex poisoned"))?
            .push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(title: &str) -> NotificationRecord {
        NotificationRecord {
            ts: Utc::now(),
            source: "rust".into(),
            title: title.into(),
            permalink: format!("/r/rust/comments/{title}/"),
        }
    }

    #[tokio::test]
    async fn sqlite_appends_and_reads_back() {
        let h = SqliteHistory::open_in_memory().unwrap();
        h.append(&rec("one")).await.unwrap();
        h.append(&rec("two")).await.unwrap();
        let rows = h.recent(10).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].title, "two");
        assert_eq!(rows[1].permalink, "/r/rust/comments/one/");
    }

    #[tokio::test]
    async fn sqlite_file_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.db");
        SqliteHistory::open(&path)
            .unwrap()
            .append(&rec("kept"))
            .await
            .unwrap();
        let again = SqliteHistory::open(&path).unwrap();
        assert_eq!(again.recent(1).unwrap()[0].title, "kept");
    }
}
