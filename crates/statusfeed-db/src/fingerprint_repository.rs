use chrono::{DateTime, Utc};
use sqlx::postgres::PgExecutor;
use sqlx::sqlite::SqliteExecutor;
use statusfeed_core::error::AppError;
use statusfeed_core::models::FingerprintRecord;
use statusfeed_core::traits::FingerprintStore;

use crate::pool::{DbPool, db_error};

/// Repository for the singleton `last_status` row.
#[derive(Clone)]
pub struct FingerprintRepository {
    pool: DbPool,
}

impl FingerprintRepository {
    pub fn new(pool: impl Into<DbPool>) -> Self {
        Self { pool: pool.into() }
    }
}

#[derive(sqlx::FromRow)]
struct FingerprintRow {
    digest: String,
    updated_at: DateTime<Utc>,
}

impl From<FingerprintRow> for FingerprintRecord {
    fn from(row: FingerprintRow) -> Self {
        FingerprintRecord {
            digest: row.digest,
            updated_at: row.updated_at,
        }
    }
}

fn missing_record() -> AppError {
    AppError::DatabaseError("No fingerprint record to update".to_string())
}

pub(crate) async fn create_pg<'e>(
    exec: impl PgExecutor<'e>,
    digest: &str,
) -> Result<FingerprintRecord, AppError> {
    let row = sqlx::query_as::<_, FingerprintRow>(
        r#"
        INSERT INTO last_status (id, digest, updated_at)
        VALUES (1, $1, NOW())
        RETURNING digest, updated_at
        "#,
    )
    .bind(digest)
    .fetch_one(exec)
    .await
    .map_err(db_error)?;

    Ok(row.into())
}

pub(crate) async fn update_pg<'e>(
    exec: impl PgExecutor<'e>,
    digest: &str,
) -> Result<FingerprintRecord, AppError> {
    let row = sqlx::query_as::<_, FingerprintRow>(
        r#"
        UPDATE last_status
        SET digest = $1, updated_at = NOW()
        WHERE id = 1
        RETURNING digest, updated_at
        "#,
    )
    .bind(digest)
    .fetch_optional(exec)
    .await
    .map_err(db_error)?;

    row.map(Into::into).ok_or_else(missing_record)
}

pub(crate) async fn create_sqlite<'e>(
    exec: impl SqliteExecutor<'e>,
    digest: &str,
) -> Result<FingerprintRecord, AppError> {
    let row = sqlx::query_as::<_, FingerprintRow>(
        r#"
        INSERT INTO last_status (id, digest, updated_at)
        VALUES (1, ?1, ?2)
        RETURNING digest, updated_at
        "#,
    )
    .bind(digest)
    .bind(Utc::now())
    .fetch_one(exec)
    .await
    .map_err(db_error)?;

    Ok(row.into())
}

pub(crate) async fn update_sqlite<'e>(
    exec: impl SqliteExecutor<'e>,
    digest: &str,
) -> Result<FingerprintRecord, AppError> {
    let row = sqlx::query_as::<_, FingerprintRow>(
        r#"
        UPDATE last_status
        SET digest = ?1, updated_at = ?2
        WHERE id = 1
        RETURNING digest, updated_at
        "#,
    )
    .bind(digest)
    .bind(Utc::now())
    .fetch_optional(exec)
    .await
    .map_err(db_error)?;

    row.map(Into::into).ok_or_else(missing_record)
}

impl FingerprintStore for FingerprintRepository {
    async fn load(&self) -> Result<Option<FingerprintRecord>, AppError> {
        const SQL: &str = "SELECT digest, updated_at FROM last_status WHERE id = 1";
        let row = match &self.pool {
            DbPool::Postgres(pool) => {
                sqlx::query_as::<_, FingerprintRow>(SQL)
                    .fetch_optional(pool)
                    .await
            }
            DbPool::Sqlite(pool) => {
                sqlx::query_as::<_, FingerprintRow>(SQL)
                    .fetch_optional(pool)
                    .await
            }
        }
        .map_err(db_error)?;

        Ok(row.map(Into::into))
    }

    async fn create(&self, digest: &str) -> Result<FingerprintRecord, AppError> {
        match &self.pool {
            DbPool::Postgres(pool) => create_pg(pool, digest).await,
            DbPool::Sqlite(pool) => create_sqlite(pool, digest).await,
        }
    }

    async fn update(&self, digest: &str) -> Result<FingerprintRecord, AppError> {
        match &self.pool {
            DbPool::Postgres(pool) => update_pg(pool, digest).await,
            DbPool::Sqlite(pool) => update_sqlite(pool, digest).await,
        }
    }
}
