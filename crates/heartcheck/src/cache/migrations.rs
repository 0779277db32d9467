use libsql::Connection;
use tracing::info;

use super::CacheError;

/// Schema version - increment when making schema changes
const SCHEMA_VERSION: i64 = 1;

/// Bring the store schema up to date.
pub async fn run_migrations(conn: &Connection) -> Result<(), CacheError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL,
            description TEXT
        )",
        (),
    )
    .await?;

    let current_version = current_version(conn).await?;
    if current_version >= SCHEMA_VERSION {
        info!("Cache schema is up to date (version {current_version})");
        return Ok(());
    }

    info!("Running cache migrations from version {current_version} to {SCHEMA_VERSION}");

    if current_version < 1 {
        // Loosely typed; readers validate every field.
        conn.execute(
            "CREATE TABLE IF NOT EXISTS bleed_cache (
                hostname TEXT PRIMARY KEY NOT NULL,
                mtime INTEGER,
                status INTEGER
            )",
            (),
        )
        .await?;
        record_migration(conn, 1, "Verdict cache table").await?;
    }

    Ok(())
}

async fn current_version(conn: &Connection) -> Result<i64, CacheError> {
    let mut rows = conn.query("SELECT MAX(version) FROM schema_migrations", ()).await?;

    if let Some(row) = rows.next().await? {
        let version: Option<i64> = row.get(0)?;
        Ok(version.unwrap_or(0))
    } else {
        Ok(0)
    }
}

async fn record_migration(conn: &Connection, version: i64, description: &str) -> Result<(), CacheError> {
    let now = chrono::Utc::now().timestamp();

    conn.execute(
        "INSERT INTO schema_migrations (version, applied_at, description) VALUES (?1, ?2, ?3)",
        libsql::params![version, now, description],
    )
    .await?;

    info!("Applied cache migration v{version}: {description}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_migrations_are_idempotent() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("migrate.db");
        let database = libsql::Builder::new_local(&path).build().await?;
        let conn = database.connect()?;

        run_migrations(&conn).await?;
        run_migrations(&conn).await?;

        assert_eq!(current_version(&conn).await?, SCHEMA_VERSION);
        let mut rows = conn.query("SELECT COUNT(*) FROM schema_migrations", ()).await?;
        let row = rows.next().await?.expect("count row");
        assert_eq!(row.get::<i64>(0)?, 1);
        Ok(())
    }
}
