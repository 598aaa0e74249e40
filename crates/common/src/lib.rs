//! Shared types used across every component: page/record identifiers, the
//! schema-less `Row` representation, the error kinds from spec §7, server
//! configuration, and execution statistics for `EXPLAIN ANALYZE`.

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, io, path::PathBuf, time::Duration};
use thiserror::Error;
use types::Value;

/// Identifier for a page within the single database file. Page 0 is
/// always the catalog entry point (spec §3, §9).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PageId(pub u32);

/// A row's storage location: the page holding it and its ordinal slot
/// within that page's decoded record stream. Per spec §9 this is carried
/// alongside a row during scans, never embedded as a row field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId {
    pub page_id: PageId,
    pub slot: u16,
}

/// A schema-less JSON object: the row representation throughout the
/// engine. Keyed by field name, ordered (`BTreeMap`) so that the same row
/// always serializes to the same byte string for page storage and for
/// deep-equality checks (`DISTINCT`, rollback set comparisons).
pub type Row = BTreeMap<String, Value>;

/// Build a `Row` from `(name, value)` pairs.
pub fn row_of<I, K, V>(fields: I) -> Row
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    fields.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}

/// Canonical error type shared across database subsystems, matching the
/// error kinds enumerated in spec §7. Every kind carries a single
/// human-readable message; none of these cross the wire as stack traces.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("parse error: {0}")]
    ParseError(String),
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("storage fault: {0}")]
    StorageFault(String),
    #[error("out of space")]
    OutOfSpace,
    #[error("auth error: {0}")]
    AuthError(String),
    #[error("protocol error: {0}")]
    ProtocolError(String),
    #[error("timeout")]
    Timeout,
    #[error("worker crashed: {0}")]
    WorkerCrashed(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl DbError {
    /// The message sent over the wire in an `{type: "error", error}` frame.
    pub fn wire_message(&self) -> String {
        self.to_string()
    }
}

/// Result alias that carries a `DbError`.
pub type DbResult<T> = Result<T, DbError>;

/// WAL sync policy: whether `flush()` calls `fsync` on every commit or
/// batches durability behind `checkpoint_interval`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncMode {
    Full,
    Batched,
}

impl Default for SyncMode {
    fn default() -> Self {
        Self::Full
    }
}

/// WAL-specific configuration (spec §6: `wal: {enabled, syncMode,
/// checkpointInterval}`).
#[derive(Clone, Debug, Serialize, Deserialize, bon::Builder)]
pub struct WalConfig {
    #[builder(default = true)]
    pub enabled: bool,
    #[builder(default)]
    pub sync_mode: SyncMode,
    /// Number of commits between automatic checkpoints (WAL truncation).
    #[builder(default = 100)]
    pub checkpoint_interval: u32,
}

impl Default for WalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sync_mode: SyncMode::default(),
            checkpoint_interval: 100,
        }
    }
}

/// Server-level runtime configuration (spec §6).
#[derive(Clone, Debug, Serialize, Deserialize, bon::Builder)]
pub struct Config {
    #[builder(default = 4567)]
    pub port: u16,
    #[builder(default = String::from("127.0.0.1"))]
    pub host: String,
    #[builder(default = PathBuf::from("./data"))]
    pub data_dir: PathBuf,
    /// username -> `salt:hash` (§4.H). Empty means auth is not enforced.
    #[builder(default)]
    pub auth: BTreeMap<String, String>,
    #[builder(default = 100)]
    pub max_connections: usize,
    #[builder(default = 30_000)]
    pub query_timeout_ms: u64,
    #[builder(default = String::from("info"))]
    pub log_level: String,
    #[builder(default)]
    pub wal: WalConfig,
    /// Worker count; `None` means "CPU count" (spec §4.H).
    #[builder(default)]
    pub worker_count: Option<usize>,
    /// Buffer cache capacity in pages (spec §4.A default 256).
    #[builder(default = 256)]
    pub buffer_pool_pages: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 4567,
            host: "127.0.0.1".to_string(),
            data_dir: PathBuf::from("./data"),
            auth: BTreeMap::new(),
            max_connections: 100,
            query_timeout_ms: 30_000,
            log_level: "info".to_string(),
            wal: WalConfig::default(),
            worker_count: None,
            buffer_pool_pages: 256,
        }
    }
}

impl Config {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    pub fn resolved_worker_count(&self) -> usize {
        self.worker_count
            .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1))
    }
}

/// Execution statistics collected during query execution for `EXPLAIN`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ExecutionStats {
    pub open_time: Duration,
    pub total_next_time: Duration,
    pub close_time: Duration,
    pub rows_produced: u64,
    pub rows_filtered: u64,
    pub pages_scanned: u64,
}

impl ExecutionStats {
    pub fn total_time(&self) -> Duration {
        self.open_time + self.total_next_time + self.close_time
    }

    pub fn format_duration(d: Duration) -> String {
        let micros = d.as_micros();
        if micros < 1000 {
            format!("{micros}\u{b5}s")
        } else if micros < 1_000_000 {
            format!("{:.2}ms", micros as f64 / 1000.0)
        } else {
            format!("{:.3}s", micros as f64 / 1_000_000.0)
        }
    }
}

/// Synchronous callback sink fired after DML commits (spec §9 Open
/// Question (c), SPEC_FULL §2.2). The default no-op sink is used unless a
/// caller registers its own.
pub trait TableObserver: Send + Sync {
    fn on_inserted(&self, _table: &str, _row: &Row) {}
    fn on_updated(&self, _table: &str, _old: &Row, _new: &Row) {}
    fn on_deleted(&self, _table: &str, _row: &Row) {}
}

/// No-op observer used when nothing is registered.
#[derive(Default)]
pub struct NullObserver;

impl TableObserver for NullObserver {}

/// Convenient re-exports for downstream crates.
pub mod prelude {
    pub use crate::{row_of, Config, DbError, DbResult, ExecutionStats, PageId, RecordId, Row};
    pub use types::{SqlType, Value};
}
