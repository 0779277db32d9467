use std::path::Path;

use deadpool::managed::{self, Pool, RecycleResult};
use libsql::{Builder, Connection, Database, Error as LibsqlError};

use super::CacheError;

pub struct LibsqlManager {
    database: Database,
}

impl LibsqlManager {
    pub fn new(database: Database) -> Self {
        Self { database }
    }
}

impl managed::Manager for LibsqlManager {
    type Type = Connection;
    type Error = LibsqlError;

    async fn create(&self) -> Result<Self::Type, Self::Error> {
        self.database.connect()
    }

    async fn recycle(&self, conn: &mut Self::Type, _: &managed::Metrics) -> RecycleResult<Self::Error> {
        conn.query("SELECT 1", ()).await?.next().await?.ok_or(LibsqlError::QueryReturnedNoRows)?;
        Ok(())
    }
}

pub type LibsqlPool = Pool<LibsqlManager>;

const IN_MEMORY: &str = ":memory:";

/// Whether `descriptor` names a remote libsql/sqld server rather than a file.
pub fn is_remote(descriptor: &str) -> bool {
    ["libsql://", "http://", "https://"].iter().any(|scheme| descriptor.starts_with(scheme))
}

/// Open the store named by `descriptor`: a local path (or `:memory:`) or a
/// remote URL, in which case `auth_token` is sent along.
pub async fn open_database(descriptor: &str, auth_token: &str) -> Result<Database, CacheError> {
    let database = if is_remote(descriptor) {
        Builder::new_remote(descriptor.to_owned(), auth_token.to_owned()).build().await?
    } else {
        Builder::new_local(Path::new(descriptor)).build().await?
    };
    Ok(database)
}

/// Pool connections to `database`.
///
/// An in-memory database lives and dies with its connection, so it gets a
/// pool of exactly one.
pub fn build_pool(database: Database, descriptor: &str, max_size: usize) -> Result<LibsqlPool, CacheError> {
    let max_size = if descriptor == IN_MEMORY { 1 } else { max_size.max(1) };
    Ok(Pool::builder(LibsqlManager::new(database)).max_size(max_size).build()?)
}
