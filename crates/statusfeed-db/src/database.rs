use std::str::FromStr;

use sqlx::postgres::PgPoolOptions;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use statusfeed_core::AppError;
use statusfeed_core::lock::LeaseConfig;

use crate::catalog_repository::CatalogRepository;
use crate::config::DatabaseConfig;
use crate::feed_repository::FeedRepository;
use crate::fingerprint_repository::FingerprintRepository;
use crate::lock_repository::LockRepository;
use crate::pool::{Backend, DbPool, db_error};
use crate::status_repository::StatusRepository;

/// Central database facade: owns the connection pool, runs migrations,
/// and vends repository instances.
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Connect to PostgreSQL or SQLite depending on the configured URL.
    /// SQLite files are created when missing.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        let pool = match config.backend {
            Backend::Postgres => PgPoolOptions::new()
                .max_connections(config.max_connections)
                .connect(&config.url)
                .await
                .map(DbPool::Postgres),
            Backend::Sqlite => {
                let options = match config.sqlite_path() {
                    Some(path) => SqliteConnectOptions::new()
                        .filename(path)
                        .create_if_missing(true)
                        .journal_mode(SqliteJournalMode::Wal),
                    None => SqliteConnectOptions::from_str(&config.url).map_err(|e| {
                        AppError::ConfigError(format!("Invalid SQLite URL '{}': {e}", config.url))
                    })?,
                };
                // Every connection to :memory: opens its own empty database.
                let max_connections = if config.is_memory() {
                    1
                } else {
                    config.max_connections
                };
                SqlitePoolOptions::new()
                    .max_connections(max_connections)
                    .connect_with(options)
                    .await
                    .map(DbPool::Sqlite)
            }
        }
        .map_err(|e| AppError::DatabaseError(format!("Failed to connect: {e}")))?;

        tracing::debug!(backend = %config.backend, "Database connected");
        Ok(Self { pool })
    }

    /// Create a `Database` from an existing pool (useful for testing).
    pub fn from_pool(pool: impl Into<DbPool>) -> Self {
        Self { pool: pool.into() }
    }

    pub fn backend(&self) -> Backend {
        self.pool.backend()
    }

    /// Run all pending migrations for the connected backend.
    pub async fn migrate(&self) -> Result<(), AppError> {
        match &self.pool {
            DbPool::Postgres(pool) => sqlx::migrate!("../../migrations/postgres").run(pool).await,
            DbPool::Sqlite(pool) => sqlx::migrate!("../../migrations/sqlite").run(pool).await,
        }
        .map_err(|e| AppError::DatabaseError(format!("Migration failed: {e}")))?;
        Ok(())
    }

    pub fn catalog_repo(&self) -> CatalogRepository {
        CatalogRepository::new(self.pool.clone())
    }

    pub fn fingerprint_repo(&self) -> FingerprintRepository {
        FingerprintRepository::new(self.pool.clone())
    }

    pub fn feed_repo(&self) -> FeedRepository {
        FeedRepository::new(self.pool.clone())
    }

    /// Fingerprint and feed together, with atomic change recording.
    pub fn status_repo(&self) -> StatusRepository {
        StatusRepository::new(self.pool.clone())
    }

    /// Get a [`LockRepository`] that takes leases as described by `config`.
    pub fn lock(&self, config: LeaseConfig) -> LockRepository {
        LockRepository::new(self.pool.clone(), config)
    }

    /// Check database connectivity.
    pub async fn health_check(&self) -> Result<(), AppError> {
        match &self.pool {
            DbPool::Postgres(pool) => sqlx::query("SELECT 1").execute(pool).await.map(drop),
            DbPool::Sqlite(pool) => sqlx::query("SELECT 1").execute(pool).await.map(drop),
        }
        .map_err(db_error)
    }

    /// Get a reference to the underlying pool.
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}
