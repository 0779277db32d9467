//! Periodic store ping so idle pooled connections (and remote sessions) stay
//! warm between requests.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::CacheError;
use super::pool::LibsqlPool;

/// Round-trip a trivial query through the pool.
pub async fn ping(pool: &LibsqlPool) -> Result<(), CacheError> {
    let conn = pool.get().await?;
    conn.query("SELECT 1", ())
        .await?
        .next()
        .await?
        .ok_or_else(|| CacheError::Unavailable("keepalive query returned no rows".into()))?;
    Ok(())
}

/// Start the background keepalive task.
pub fn spawn_keepalive(pool: LibsqlPool, every: Duration) -> tokio::task::JoinHandle<()> {
    info!("Launching background store keepalive every {every:?}");

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            match ping(&pool).await {
                Ok(()) => debug!("Store keepalive ok"),
                Err(e) => warn!("Store keepalive failed: {}", e),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::pool::{build_pool, open_database};

    #[tokio::test]
    async fn test_ping_and_keepalive_task() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let descriptor = dir.path().join("keepalive.db").to_string_lossy().to_string();
        let pool = build_pool(open_database(&descriptor, "").await?, &descriptor, 2)?;

        ping(&pool).await?;

        let handle = spawn_keepalive(pool, Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(35)).await;
        assert!(!handle.is_finished());
        handle.abort();
        Ok(())
    }
}
