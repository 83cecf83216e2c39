//! Opening the book database.

use exn::ResultExt;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::time::Duration;
use tracing::instrument;

use crate::Repository;
use crate::error::{ErrorKind, Result};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
const MAX_CONNECTIONS: u32 = 5;
// SQLite has a single write lock. Writers racing on the same book wait this
// long for it instead of failing with SQLITE_BUSY, so the loser of a race
// sees an edit conflict rather than a storage failure.
const BUSY_TIMEOUT: Duration = Duration::from_millis(1500);

/// Handle on the book database.
///
/// Open it once at startup and pass it (or its [`Repository`]) to whoever
/// needs it. Clones share the same connection pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the database file at `path` and bring its
    /// schema up to date.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        Self::connect_with_limit(path, None).await
    }

    /// Same as [`connect`](Self::connect), with an explicit pool size.
    pub async fn connect_with_limit(path: impl AsRef<Path>, max_connections: Option<u32>) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true)
            // Readers don't block the writer and vice versa.
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);
        Self::open(options, max_connections.unwrap_or(MAX_CONNECTIONS)).await
    }

    /// Open a private in-memory database, mostly for tests.
    ///
    /// Not `#[cfg(test)]`, so dependent crates can use it in their tests too.
    pub async fn connect_in_memory() -> Result<Self> {
        // Every connection to ":memory:" gets a database of its own.
        Self::open(SqliteConnectOptions::new().filename(":memory:"), 1).await
    }

    async fn open(options: SqliteConnectOptions, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .or_raise(|| ErrorKind::DATABASE)?;
        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    #[instrument("migrating book database", skip(self))]
    async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await.or_raise(|| ErrorKind::MIGRATION)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// The book store backed by this database.
    pub fn books(&self) -> Repository {
        Repository::from(self)
    }

    /// Wait for borrowed connections to come back, then close them all.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
