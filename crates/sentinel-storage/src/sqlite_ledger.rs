use std::thread;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};
use sentinel_core::{Result, SentinelError, Signature};

use crate::errors::{classify, classify_pool};
use crate::ledger::{LedgerEntry, LedgerStore};

/// Tunables for the database connection pool and the ledger's own
/// retry/caching behavior.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub path: String,
    pub max_connections: u32,
    pub timeout: Duration,
    pub cache_ttl: Duration,
    /// Number of retries for SQLITE_BUSY/locked/timeout errors before they
    /// surface to the caller.
    pub max_retries: u32,
    /// SQLite page cache size in kibibytes, applied as `PRAGMA cache_size`
    /// on every pooled connection.
    pub cache_size_kb: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: "ledger.db".to_string(),
            max_connections: 10,
            timeout: Duration::from_secs(5),
            cache_ttl: Duration::from_secs(300),
            max_retries: 5,
            cache_size_kb: 10_000,
        }
    }
}

struct ReadAllCache {
    snapshot: Option<(Instant, Vec<LedgerEntry>)>,
}

/// The SQLite-backed `LedgerStore`. Every node and the scheduler share one
/// instance via `Arc<dyn LedgerStore>`; the pool handles serializing writers
/// and admitting concurrent readers.
pub struct SqliteLedger {
    pool: Pool<SqliteConnectionManager>,
    cache_ttl: Duration,
    max_retries: u32,
    read_all_cache: RwLock<ReadAllCache>,
}

impl SqliteLedger {
    pub fn open(config: LedgerConfig) -> Result<Self> {
        let cache_size_kb = config.cache_size_kb;
        let manager = SqliteConnectionManager::file(&config.path).with_init(move |conn| {
            conn.execute_batch(&format!(
                "PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON; PRAGMA cache_size=-{cache_size_kb};"
            ))
        });
        let pool = Pool::builder()
            .max_size(config.max_connections)
            .connection_timeout(config.timeout)
            .build(manager)
            .map_err(classify_pool)?;

        let ledger = Self {
            pool,
            cache_ttl: config.cache_ttl,
            max_retries: config.max_retries,
            read_all_cache: RwLock::new(ReadAllCache { snapshot: None }),
        };
        ledger.init_schema()?;
        Ok(ledger)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.checkout()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS signatures (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp REAL NOT NULL,
                node_id TEXT NOT NULL,
                features TEXT NOT NULL,
                confidence REAL NOT NULL,
                created_at REAL NOT NULL,
                UNIQUE(timestamp, node_id)
            );
            CREATE INDEX IF NOT EXISTS idx_signatures_timestamp ON signatures(timestamp);
            CREATE INDEX IF NOT EXISTS idx_signatures_node_id ON signatures(node_id);
            CREATE INDEX IF NOT EXISTS idx_signatures_confidence ON signatures(confidence);",
        )
        .map_err(classify)
    }

    /// Scoped connection acquisition. The `r2d2::PooledConnection` returned
    /// by the pool already releases back to the pool on drop (including on
    /// panic unwind), so this helper's only job is mapping pool-acquisition
    /// failures onto `SentinelError`.
    fn checkout(&self) -> Result<r2d2::PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(classify_pool)
    }

    /// Runs `f` against a freshly checked-out connection, retrying with
    /// bounded backoff when the error is one of the "locked"/"busy"/
    /// "timeout" transient signatures.
    fn with_retry<T>(&self, mut f: impl FnMut(&rusqlite::Connection) -> rusqlite::Result<T>) -> Result<T> {
        let mut attempt = 0;
        loop {
            let conn = self.checkout()?;
            match f(&conn) {
                Ok(v) => return Ok(v),
                Err(e) => {
                    let classified = classify(e);
                    let retryable = matches!(classified, SentinelError::Transient { .. });
                    if !retryable || attempt >= self.max_retries {
                        return Err(classified);
                    }
                    let backoff = Duration::from_millis(10u64.saturating_mul(1 << attempt.min(6)));
                    thread::sleep(backoff);
                    attempt += 1;
                }
            }
        }
    }

    fn invalidate_cache(&self) {
        self.read_all_cache.write().snapshot = None;
    }

    fn row_to_entry(
        id: i64,
        timestamp: f64,
        node_id: String,
        features_json: String,
        confidence: f64,
        created_at: f64,
    ) -> rusqlite::Result<LedgerEntry> {
        let features = serde_json::from_str(&features_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?;
        Ok(LedgerEntry {
            signature: Signature {
                id: Some(id),
                timestamp,
                node_id,
                features,
                confidence,
            },
            created_at,
        })
    }
}

impl LedgerStore for SqliteLedger {
    fn append(&self, entry: Signature) -> Result<i64> {
        entry.validate()?;
        let features_json = serde_json::to_string(&entry.features)
            .map_err(|e| SentinelError::validation(format!("could not serialize features: {e}")))?;
        let created_at = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64();

        let id = self.with_retry(|conn| {
            conn.query_row(
                "INSERT INTO signatures (timestamp, node_id, features, confidence, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 RETURNING id",
                params![entry.timestamp, entry.node_id, features_json, entry.confidence, created_at],
                |row| row.get(0),
            )
        })
        .map_err(|e| match e {
            SentinelError::Fatal { reason } if reason.contains("UNIQUE") => {
                SentinelError::validation(format!("duplicate (timestamp, nodeId): {reason}"))
            }
            other => other,
        })?;

        self.invalidate_cache();
        Ok(id)
    }

    fn read_all(&self) -> Result<Vec<LedgerEntry>> {
        {
            let cache = self.read_all_cache.read();
            if let Some((fetched_at, ref snapshot)) = cache.snapshot {
                if fetched_at.elapsed() < self.cache_ttl {
                    return Ok(snapshot.clone());
                }
            }
        }

        let rows = self.with_retry(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, timestamp, node_id, features, confidence, created_at
                 FROM signatures ORDER BY id ASC",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Self::row_to_entry(row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?)
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })?;

        self.read_all_cache.write().snapshot = Some((Instant::now(), rows.clone()));
        Ok(rows)
    }

    fn read_since(&self, last_seen_id: i64) -> Result<Vec<LedgerEntry>> {
        if last_seen_id < 0 {
            return Err(SentinelError::validation("lastSeenId must be >= 0"));
        }
        self.with_retry(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, timestamp, node_id, features, confidence, created_at
                 FROM signatures WHERE id > ?1 ORDER BY id ASC",
            )?;
            let result = stmt.query_map(params![last_seen_id], |row| {
                Self::row_to_entry(row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?)
            })?
            .collect::<rusqlite::Result<Vec<_>>>();
            result
        })
    }

    fn get_by_id(&self, id: i64) -> Result<Option<LedgerEntry>> {
        if id <= 0 {
            return Err(SentinelError::validation("id must be > 0"));
        }
        self.with_retry(|conn| {
            conn.query_row(
                "SELECT id, timestamp, node_id, features, confidence, created_at
                 FROM signatures WHERE id = ?1",
                params![id],
                |row| Self::row_to_entry(row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?),
            )
            .optional()
        })
    }

    fn get_by_node(&self, node_id: &str, limit: Option<usize>) -> Result<Vec<LedgerEntry>> {
        let limit = limit.unwrap_or(i64::MAX as usize) as i64;
        self.with_retry(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, timestamp, node_id, features, confidence, created_at
                 FROM signatures WHERE node_id = ?1 ORDER BY timestamp DESC LIMIT ?2",
            )?;
            let result = stmt.query_map(params![node_id, limit], |row| {
                Self::row_to_entry(row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?)
            })?
            .collect::<rusqlite::Result<Vec<_>>>();
            result
        })
    }

    fn prune_older_than(&self, now: f64, max_age_seconds: f64) -> Result<usize> {
        let cutoff = now - max_age_seconds;
        let deleted = self.with_retry(|conn| conn.execute("DELETE FROM signatures WHERE timestamp < ?1", params![cutoff]))?;
        self.invalidate_cache();
        Ok(deleted)
    }

    fn len(&self) -> Result<usize> {
        let count: i64 = self.with_retry(|conn| conn.query_row("SELECT COUNT(*) FROM signatures", [], |row| row.get(0)))?;
        Ok(count as usize)
    }
}
