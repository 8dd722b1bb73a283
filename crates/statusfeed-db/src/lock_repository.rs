use chrono::{DateTime, Utc};
use statusfeed_core::error::AppError;
use statusfeed_core::lock::LeaseConfig;
use statusfeed_core::models::LockLease;
use statusfeed_core::traits::ExecutionLock;

use crate::pool::{DbPool, db_error};

/// Execution lock backed by the `cron_locks` table.
///
/// Mutual exclusion comes from the primary key on `key`: acquiring is a
/// single `INSERT ... ON CONFLICT` statement that only overwrites a row whose
/// lease has already expired. On PostgreSQL lease deadlines use the database
/// clock so that holders on different hosts agree on expiry; SQLite is
/// single-host and uses the local clock.
#[derive(Clone)]
pub struct LockRepository {
    pool: DbPool,
    config: LeaseConfig,
}

impl LockRepository {
    pub fn new(pool: impl Into<DbPool>, config: LeaseConfig) -> Self {
        Self {
            pool: pool.into(),
            config,
        }
    }

    pub fn holder(&self) -> &str {
        &self.config.holder
    }

    /// TTL as fractional seconds; `NULL` in SQL keeps `expires_at` empty.
    fn ttl_secs(&self) -> Option<f64> {
        self.config
            .ttl
            .map(|ttl| ttl.num_milliseconds() as f64 / 1000.0)
    }

    fn expires_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.config.ttl.and_then(|ttl| now.checked_add_signed(ttl))
    }

    /// The current record for `key`, if any, expired or not.
    pub async fn current(&self, key: &str) -> Result<Option<LockLease>, AppError> {
        const SQL: &str =
            "SELECT key, holder, acquired_at, expires_at FROM cron_locks WHERE key = $1";
        let row = match &self.pool {
            DbPool::Postgres(pool) => {
                sqlx::query_as::<_, LockRow>(SQL)
                    .bind(key)
                    .fetch_optional(pool)
                    .await
            }
            DbPool::Sqlite(pool) => {
                sqlx::query_as::<_, LockRow>(SQL)
                    .bind(key)
                    .fetch_optional(pool)
                    .await
            }
        }
        .map_err(db_error)?;

        Ok(row.map(Into::into))
    }

    /// Delete the record for `key` whoever holds it. For operators clearing a
    /// lock left behind by a crashed process; cycles release by lease.
    pub async fn force_release(&self, key: &str) -> Result<bool, AppError> {
        const SQL: &str = "DELETE FROM cron_locks WHERE key = $1";
        let affected = match &self.pool {
            DbPool::Postgres(pool) => {
                sqlx::query(SQL)
                    .bind(key)
                    .execute(pool)
                    .await
                    .map(|r| r.rows_affected())
            }
            DbPool::Sqlite(pool) => {
                sqlx::query(SQL)
                    .bind(key)
                    .execute(pool)
                    .await
                    .map(|r| r.rows_affected())
            }
        }
        .map_err(db_error)?;

        if affected > 0 {
            tracing::warn!(%key, "Lock record removed by force");
        }
        Ok(affected > 0)
    }
}

#[derive(sqlx::FromRow)]
struct LockRow {
    key: String,
    holder: String,
    acquired_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
}

impl From<LockRow> for LockLease {
    fn from(row: LockRow) -> Self {
        LockLease {
            key: row.key,
            holder: row.holder,
            acquired_at: row.acquired_at,
            expires_at: row.expires_at,
        }
    }
}

impl ExecutionLock for LockRepository {
    async fn acquire(&self, key: &str) -> Result<LockLease, AppError> {
        let row = match &self.pool {
            DbPool::Postgres(pool) => {
                sqlx::query_as::<_, LockRow>(
                    r#"
                    INSERT INTO cron_locks (key, holder, acquired_at, expires_at)
                    VALUES ($1, $2, NOW(), NOW() + $3::float8 * INTERVAL '1 second')
                    ON CONFLICT (key) DO UPDATE
                    SET holder = EXCLUDED.holder,
                        acquired_at = EXCLUDED.acquired_at,
                        expires_at = EXCLUDED.expires_at
                    WHERE cron_locks.expires_at IS NOT NULL AND cron_locks.expires_at <= NOW()
                    RETURNING key, holder, acquired_at, expires_at
                    "#,
                )
                .bind(key)
                .bind(&self.config.holder)
                .bind(self.ttl_secs())
                .fetch_optional(pool)
                .await
            }
            DbPool::Sqlite(pool) => {
                let now = Utc::now();
                // Stored timestamps are RFC 3339 text; julianday compares them
                // as instants.
                sqlx::query_as::<_, LockRow>(
                    r#"
                    INSERT INTO cron_locks (key, holder, acquired_at, expires_at)
                    VALUES (?1, ?2, ?3, ?4)
                    ON CONFLICT (key) DO UPDATE
                    SET holder = excluded.holder,
                        acquired_at = excluded.acquired_at,
                        expires_at = excluded.expires_at
                    WHERE cron_locks.expires_at IS NOT NULL
                      AND julianday(cron_locks.expires_at) <= julianday(?3)
                    RETURNING key, holder, acquired_at, expires_at
                    "#,
                )
                .bind(key)
                .bind(&self.config.holder)
                .bind(now)
                .bind(self.expires_at(now))
                .fetch_optional(pool)
                .await
            }
        }
        .map_err(db_error)?;

        row.map(Into::into)
            .ok_or_else(|| AppError::LockHeld(key.to_string()))
    }

    async fn extend(&self, lease: &LockLease) -> Result<LockLease, AppError> {
        let row = match &self.pool {
            DbPool::Postgres(pool) => {
                sqlx::query_as::<_, LockRow>(
                    r#"
                    UPDATE cron_locks
                    SET expires_at = NOW() + $3::float8 * INTERVAL '1 second'
                    WHERE key = $1 AND holder = $2
                    RETURNING key, holder, acquired_at, expires_at
                    "#,
                )
                .bind(&lease.key)
                .bind(&lease.holder)
                .bind(self.ttl_secs())
                .fetch_optional(pool)
                .await
            }
            DbPool::Sqlite(pool) => {
                sqlx::query_as::<_, LockRow>(
                    r#"
                    UPDATE cron_locks
                    SET expires_at = ?3
                    WHERE key = ?1 AND holder = ?2
                    RETURNING key, holder, acquired_at, expires_at
                    "#,
                )
                .bind(&lease.key)
                .bind(&lease.holder)
                .bind(self.expires_at(Utc::now()))
                .fetch_optional(pool)
                .await
            }
        }
        .map_err(db_error)?;

        row.map(Into::into)
            .ok_or_else(|| AppError::LockLost(lease.key.clone()))
    }

    /// Delete the record only while `lease.holder` still owns it. A record
    /// that expired and was reclaimed by another holder is left alone.
    async fn release(&self, lease: &LockLease) -> Result<(), AppError> {
        const SQL: &str = "DELETE FROM cron_locks WHERE key = $1 AND holder = $2";
        let affected = match &self.pool {
            DbPool::Postgres(pool) => {
                sqlx::query(SQL)
                    .bind(&lease.key)
                    .bind(&lease.holder)
                    .execute(pool)
                    .await
                    .map(|r| r.rows_affected())
            }
            DbPool::Sqlite(pool) => {
                sqlx::query(SQL)
                    .bind(&lease.key)
                    .bind(&lease.holder)
                    .execute(pool)
                    .await
                    .map(|r| r.rows_affected())
            }
        }
        .map_err(db_error)?;

        if affected == 0 {
            tracing::debug!(
                key = %lease.key,
                holder = %lease.holder,
                "Release found no owned lock record"
            );
        }
        Ok(())
    }
}
