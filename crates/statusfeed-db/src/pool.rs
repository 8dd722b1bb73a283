use std::fmt;

use sqlx::{PgPool, SqlitePool};
use statusfeed_core::AppError;

/// Database engine behind a connection string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Postgres,
    Sqlite,
}

impl Backend {
    /// Detect the engine from a connection string: `postgres://` and
    /// `postgresql://` select PostgreSQL; `sqlite:` and `file:` select SQLite.
    pub fn from_url(url: &str) -> Result<Self, AppError> {
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Ok(Backend::Postgres)
        } else if url.starts_with("sqlite:") || url.starts_with("file:") {
            Ok(Backend::Sqlite)
        } else {
            Err(AppError::ConfigError(
                "DATABASE_URL must start with postgres://, postgresql://, sqlite: or file:".into(),
            ))
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Postgres => "postgres",
            Backend::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection pool for either supported engine. Repositories match on it
/// and run the SQL dialect of the engine they got.
#[derive(Debug, Clone)]
pub enum DbPool {
    Postgres(PgPool),
    Sqlite(SqlitePool),
}

impl DbPool {
    pub fn backend(&self) -> Backend {
        match self {
            DbPool::Postgres(_) => Backend::Postgres,
            DbPool::Sqlite(_) => Backend::Sqlite,
        }
    }
}

impl From<PgPool> for DbPool {
    fn from(pool: PgPool) -> Self {
        DbPool::Postgres(pool)
    }
}

impl From<SqlitePool> for DbPool {
    fn from(pool: SqlitePool) -> Self {
        DbPool::Sqlite(pool)
    }
}

pub(crate) fn db_error(e: sqlx::Error) -> AppError {
    AppError::DatabaseError(e.to_string())
}
