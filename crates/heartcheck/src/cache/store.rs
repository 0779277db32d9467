use std::sync::Arc;

use async_trait::async_trait;
use libsql::{Value, params};
use tracing::{debug, warn};

use super::migrations::run_migrations;
use super::pool::{LibsqlPool, build_pool, open_database};
use super::{CacheError, CacheRecord, VerdictCache};
use crate::clock::Clock;
use crate::verdict::StatusCode;

/// Verdict cache backed by a libsql database, one row per host.
pub struct LibsqlCache {
    pool: LibsqlPool,
    clock: Arc<dyn Clock>,
}

impl LibsqlCache {
    pub fn new(pool: LibsqlPool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }

    /// Open `descriptor`, pool it and migrate the schema.
    pub async fn connect(
        descriptor: &str,
        auth_token: &str,
        pool_size: usize,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, CacheError> {
        let database = open_database(descriptor, auth_token).await?;
        let pool = build_pool(database, descriptor, pool_size)?;

        let conn = pool.get().await?;
        run_migrations(&conn).await?;
        drop(conn);

        Ok(Self::new(pool, clock))
    }

    pub fn pool(&self) -> &LibsqlPool {
        &self.pool
    }

    /// Strict lookup: every anomaly is an error.
    pub async fn fetch(&self, host: &str) -> Result<Option<CacheRecord>, CacheError> {
        let conn = self.pool.get().await?;
        let mut rows = conn
            .query(
                "SELECT hostname, mtime, status FROM bleed_cache WHERE hostname = ?1",
                params![host.to_string()],
            )
            .await?;

        let Some(row) = rows.next().await? else {
            return Ok(None);
        };

        let stored_host = match row.get_value(0)? {
            Value::Text(stored) => stored,
            _ => host.to_owned(),
        };
        let last_update = numeric_field(host, "mtime", row.get_value(1)?)?;
        let status = numeric_field(host, "status", row.get_value(2)?)?;
        let status = StatusCode::from_code(status).ok_or_else(|| CacheError::Malformed {
            host: host.to_owned(),
            reason: format!("unknown status code {status}"),
        })?;

        Ok(Some(CacheRecord { host: stored_host, last_update, status }))
    }
}

#[async_trait]
impl VerdictCache for LibsqlCache {
    async fn get(&self, host: &str) -> Option<CacheRecord> {
        match self.fetch(host).await {
            Ok(record) => record,
            Err(error) => {
                warn!(host, %error, "Cache lookup failed, treating as a miss");
                None
            }
        }
    }

    async fn put(&self, host: &str, status: StatusCode) -> Result<(), CacheError> {
        let now = self.clock.now();
        let conn = self.pool.get().await?;
        conn.execute(
            "INSERT INTO bleed_cache (hostname, mtime, status) VALUES (?1, ?2, ?3)
             ON CONFLICT(hostname) DO UPDATE SET mtime = excluded.mtime, status = excluded.status",
            params![host.to_string(), now, i64::from(status.code())],
        )
        .await?;

        debug!(host, %status, mtime = now, "Cached verdict");
        Ok(())
    }
}

/// Numbers may come back as integers or as their decimal text.
fn numeric_field(host: &str, field: &str, value: Value) -> Result<i64, CacheError> {
    let malformed = |reason: String| CacheError::Malformed { host: host.to_owned(), reason };

    match value {
        Value::Integer(number) => Ok(number),
        Value::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| malformed(format!("{field} is not a number: {text:?}"))),
        Value::Null => Err(malformed(format!("{field} is missing"))),
        Value::Real(_) | Value::Blob(_) => Err(malformed(format!("{field} has a non-integer type"))),
    }
}
