//! Cache gateway over the external verdict store.
//!
//! Reads fail open: any trouble reaching the store or decoding what it returns
//! is logged and reported as a miss, so the caller only ever sees a record or
//! nothing. Writes report their errors and leave it to the caller to decide
//! what a failure means (the orchestrator logs and moves on).

pub mod keepalive;
pub mod store;
pub mod migrations;
pub mod pool;

use async_trait::async_trait;
use deadpool::managed::{BuildError, PoolError};
use thiserror::Error;

use crate::verdict::StatusCode;

pub use self::keepalive::spawn_keepalive;
pub use self::store::LibsqlCache;
pub use self::pool::{LibsqlManager, LibsqlPool};

/// The stored verdict for one host. Only the status survives, never the
/// leaked bytes or the error text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheRecord {
    pub host: String,
    /// UTC unix seconds of the last write by this system.
    pub last_update: i64,
    pub status: StatusCode,
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("store query failed: {0}")]
    Store(#[from] libsql::Error),

    #[error("no store connection available: {0}")]
    Pool(#[from] PoolError<libsql::Error>),

    #[error("could not build connection pool: {0}")]
    Build(#[from] BuildError),

    #[error("bad record for {host}: {reason}")]
    Malformed { host: String, reason: String },

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait VerdictCache: Send + Sync {
    /// Look up `host`. Transport and decoding failures read as `None`.
    async fn get(&self, host: &str) -> Option<CacheRecord>;

    /// Upsert `host` with `status`, stamped with the current time.
    async fn put(&self, host: &str, status: StatusCode) -> Result<(), CacheError>;
}
