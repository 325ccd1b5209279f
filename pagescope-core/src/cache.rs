use async_trait::async_trait;
use chrono::Utc;
use pagescope_scanner::AnalysisResult;
use rusqlite::{Connection, OptionalExtension, params};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Cache payload is not a valid analysis result: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Cache unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, CacheError>;

/// Storage key for the analysis of `url`.
pub fn cache_key(url: &str) -> String {
    format!("webpage:{}", url)
}

/// Key-value store for finished analyses, keyed by the exact URL string.
#[async_trait]
pub trait PageCache: Send + Sync {
    async fn get(&self, url: &str) -> Result<Option<AnalysisResult>>;

    async fn set(&self, url: &str, result: &AnalysisResult, ttl: Duration) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

/// Cache used when caching is disabled. Never stores anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCache;

#[async_trait]
impl PageCache for NoopCache {
    async fn get(&self, url: &str) -> Result<Option<AnalysisResult>> {
        debug!("Cache disabled, skipping lookup for {}", url);
        Ok(None)
    }

    async fn set(&self, url: &str, _result: &AnalysisResult, _ttl: Duration) -> Result<()> {
        debug!("Cache disabled, not storing {}", url);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

fn current_timestamp() -> i64 {
    Utc::now().timestamp()
}

/// SQLite backed [`PageCache`]. Every statement runs on the blocking pool.
#[derive(Clone)]
pub struct SqliteCache {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCache {
    pub fn exists(path: &Path) -> bool {
        path.exists()
    }

    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            ",
        )?;

        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn run<T, F>(&self, operation: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|_| CacheError::Unavailable("connection lock poisoned".to_string()))?;
            operation(&conn)
        })
        .await?
    }

    /// Delete every expired entry and return how many were removed.
    pub async fn prune(&self) -> Result<usize> {
        self.run(|conn| {
            let removed = conn.execute(
                "DELETE FROM analysis_cache WHERE expires_at <= ?1",
                params![current_timestamp()],
            )?;
            Ok(removed)
        })
        .await
    }

    /// Delete every entry and return how many were removed.
    pub async fn clear(&self) -> Result<usize> {
        self.run(|conn| Ok(conn.execute("DELETE FROM analysis_cache", [])?))
            .await
    }

    /// Number of stored entries, expired ones included.
    pub async fn entry_count(&self) -> Result<usize> {
        self.run(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM analysis_cache", [], |row| row.get(0))?;
            Ok(count as usize)
        })
        .await
    }
}

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS analysis_cache (
            key TEXT PRIMARY KEY,
            payload TEXT NOT NULL,
            stored_at INTEGER NOT NULL,
            expires_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_analysis_cache_expires ON analysis_cache(expires_at);
        ",
    )
}

#[async_trait]
impl PageCache for SqliteCache {
    async fn get(&self, url: &str) -> Result<Option<AnalysisResult>> {
        let key = cache_key(url);

        self.run(move |conn| {
            let row: Option<(String, i64)> = conn
                .query_row(
                    "SELECT payload, expires_at FROM analysis_cache WHERE key = ?1",
                    params![key],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            let Some((payload, expires_at)) = row else {
                return Ok(None);
            };

            if expires_at <= current_timestamp() {
                debug!("Cache entry {} expired", key);
                conn.execute("DELETE FROM analysis_cache WHERE key = ?1", params![key])?;
                return Ok(None);
            }

            Ok(Some(serde_json::from_str(&payload)?))
        })
        .await
    }

    async fn set(&self, url: &str, result: &AnalysisResult, ttl: Duration) -> Result<()> {
        let key = cache_key(url);
        let payload = serde_json::to_string(result)?;
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);

        self.run(move |conn| {
            let stored_at = current_timestamp();
            conn.execute(
                "INSERT INTO analysis_cache (key, payload, stored_at, expires_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(key) DO UPDATE SET
                     payload = excluded.payload,
                     stored_at = excluded.stored_at,
                     expires_at = excluded.expires_at",
                params![key, payload, stored_at, stored_at.saturating_add(ttl_secs)],
            )?;
            debug!("Cached {} for {}s", key, ttl_secs);
            Ok(())
        })
        .await
    }

    async fn close(&self) -> Result<()> {
        self.run(|conn| {
            conn.execute_batch("PRAGMA wal_checkpoint(PASSIVE);")?;
            Ok(())
        })
        .await
    }
}
