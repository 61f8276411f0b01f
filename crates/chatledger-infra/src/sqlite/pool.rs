//! Database pool with split reader/writer connections in WAL mode.
//!
//! SQLite allows only one writer at a time. This module provides a `DatabasePool`
//! with a multi-connection reader pool for concurrent reads and a single-connection
//! writer pool for serialized writes. Both use WAL journal mode and enforce foreign keys.
//!
//! Every write goes through [`DatabasePool::with_transaction`], which is what
//! makes per-session sequence numbers collision-free: the single writer
//! serializes the read-max-then-insert step.

use std::str::FromStr;
use std::time::Duration;

use chatledger_types::config::DatabaseConfig;
use chatledger_types::error::StoreError;
use futures_util::future::BoxFuture;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, SqliteConnection};
use tracing::warn;

use super::sqlite_error;

/// Split read/write pool for SQLite with WAL mode.
///
/// - `reader`: Multi-connection pool for concurrent SELECT queries, sized by
///   `DatabaseConfig::max_connections`.
/// - `writer`: Single-connection pool for serialized INSERT/UPDATE/DELETE.
#[derive(Clone)]
pub struct DatabasePool {
    pub reader: SqlitePool,
    pub writer: SqlitePool,
}

impl DatabasePool {
    /// Create a new DatabasePool with split reader/writer connections.
    ///
    /// Runs migrations automatically on the writer pool before the reader
    /// pool is opened.
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let base_opts = SqliteConnectOptions::from_str(&config.url)?
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(config.busy_timeout_secs))
            .create_if_missing(true);

        let read_opts = base_opts.clone().read_only(true);
        let write_opts = base_opts;

        let writer = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_with(write_opts)
            .await?;

        sqlx::migrate!("../../migrations").run(&writer).await?;

        let reader = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .connect_with(read_opts)
            .await?;

        Ok(Self { reader, writer })
    }

    /// Connect with default pool settings.
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        Self::new(&DatabaseConfig {
            url: database_url.to_string(),
            ..Default::default()
        })
        .await
    }

    /// Scoped read connection, returned to the pool on drop.
    ///
    /// Waits up to the acquire timeout when the pool is at its ceiling.
    pub async fn acquire(&self) -> Result<PoolConnection<Sqlite>, StoreError> {
        self.reader.acquire().await.map_err(sqlite_error)
    }

    /// Run `f` inside a transaction on the writer connection.
    ///
    /// Commits when `f` returns `Ok`, rolls back when it returns `Err` and
    /// hands the error back unchanged. The connection is released on every
    /// path, including cancellation (the transaction rolls back on drop).
    pub async fn with_transaction<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send,
        F: for<'c> FnOnce(&'c mut SqliteConnection) -> BoxFuture<'c, Result<T, StoreError>>
            + Send,
    {
        let mut tx = self.writer.begin().await.map_err(sqlite_error)?;

        match f(&mut *tx).await {
            Ok(value) => {
                tx.commit().await.map_err(sqlite_error)?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "Transaction rollback failed");
                }
                Err(err)
            }
        }
    }

    /// `SELECT 1` round-trip.
    pub async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.reader)
            .await
            .map_err(sqlite_error)?;
        Ok(())
    }

    /// Close both pools, waiting for checked-out connections to return.
    pub async fn close(&self) {
        self.writer.close().await;
        self.reader.close().await;
    }
}
