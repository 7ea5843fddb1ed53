//! Embedded SQLite store implementation for filter state.
use anyhow::Context;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::path::PathBuf;
use tokio::task;

use crate::store::Store;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS state (
        key   TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );
"#;

/// Simple key/value table:
///   state(key TEXT PRIMARY KEY, value TEXT NOT NULL)
///
/// Keys used:
///  - tweak        : u32 decimal string
///  - last_filter  : hex filterload payload (optional)
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    /// Creates/initializes the SQLite file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let conn = Self::open(path.clone())?;
        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            "#,
        )?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { path })
    }

    fn open(path: PathBuf) -> anyhow::Result<Connection> {
        let conn = Connection::open(&path)
            .with_context(|| format!("open sqlite at {}", path.display()))?;
        Ok(conn)
    }

    fn kv_get(conn: &Connection, key: &str) -> anyhow::Result<Option<String>> {
        let mut stmt = conn.prepare("SELECT value FROM state WHERE key = ?1")?;
        let mut rows = stmt.query(params![key])?;
        if let Some(row) = rows.next()? {
            let v: String = row.get(0)?;
            Ok(Some(v))
        } else {
            Ok(None)
        }
    }

    fn kv_set(conn: &Connection, key: &str, val: &str) -> anyhow::Result<()> {
        conn.execute(
            "INSERT INTO state(key,value) VALUES(?1,?2)
             ON CONFLICT(key) DO UPDATE SET value=excluded.value",
            params![key, val],
        )?;
        Ok(())
    }

    fn kv_delete(conn: &Connection, key: &str) -> anyhow::Result<()> {
        conn.execute("DELETE FROM state WHERE key = ?1", params![key])?;
        Ok(())
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn load_tweak(&self) -> anyhow::Result<Option<u32>> {
        let path = self.path.clone();
        task::spawn_blocking(move || {
            let conn = Self::open(path)?;
            Self::kv_get(&conn, "tweak")?
                .map(|s| s.parse::<u32>().context("parse tweak"))
                .transpose()
        })
        .await?
    }

    async fn save_tweak(&self, tweak: u32) -> anyhow::Result<()> {
        let path = self.path.clone();
        task::spawn_blocking(move || {
            let conn = Self::open(path)?;
            Self::kv_set(&conn, "tweak", &tweak.to_string())
        })
        .await?
    }

    async fn load_last_filter(&self) -> anyhow::Result<Option<Vec<u8>>> {
        let path = self.path.clone();
        task::spawn_blocking(move || {
            let conn = Self::open(path)?;
            Self::kv_get(&conn, "last_filter")?
                .map(|s| hex::decode(s).context("parse last_filter"))
                .transpose()
        })
        .await?
    }

    async fn save_last_filter(&self, payload: &[u8]) -> anyhow::Result<()> {
        let path = self.path.clone();
        let payload = hex::encode(payload);
        task::spawn_blocking(move || {
            let conn = Self::open(path)?;
            Self::kv_set(&conn, "last_filter", &payload)
        })
        .await?
    }

    async fn clear_last_filter(&self) -> anyhow::Result<()> {
        let path = self.path.clone();
        task::spawn_blocking(move || {
            let conn = Self::open(path)?;
            Self::kv_delete(&conn, "last_filter")
        })
        .await?
    }
}
