use chrono::{DateTime, Utc};
use sqlx::postgres::PgExecutor;
use sqlx::sqlite::SqliteExecutor;
use statusfeed_core::error::AppError;
use statusfeed_core::models::{FeedEntry, NewFeedEntry};
use statusfeed_core::traits::FeedStore;

use crate::pool::{DbPool, db_error};

/// Append-only feed log.
#[derive(Clone)]
pub struct FeedRepository {
    pool: DbPool,
}

impl FeedRepository {
    pub fn new(pool: impl Into<DbPool>) -> Self {
        Self { pool: pool.into() }
    }
}

// -- Internal row type for sqlx deserialization --

#[derive(sqlx::FromRow)]
struct FeedEntryRow {
    id: i64,
    title: String,
    description: String,
    published_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl From<FeedEntryRow> for FeedEntry {
    fn from(row: FeedEntryRow) -> Self {
        FeedEntry {
            id: row.id,
            title: row.title,
            description: row.description,
            published_at: row.published_at,
            created_at: row.created_at,
        }
    }
}

pub(crate) async fn insert_pg<'e>(
    exec: impl PgExecutor<'e>,
    entry: &NewFeedEntry,
) -> Result<FeedEntry, AppError> {
    let row = sqlx::query_as::<_, FeedEntryRow>(
        r#"
        INSERT INTO feed_entries (title, description, published_at)
        VALUES ($1, $2, $3)
        RETURNING id, title, description, published_at, created_at
        "#,
    )
    .bind(&entry.title)
    .bind(&entry.description)
    .bind(entry.published_at)
    .fetch_one(exec)
    .await
    .map_err(db_error)?;

    Ok(row.into())
}

pub(crate) async fn insert_sqlite<'e>(
    exec: impl SqliteExecutor<'e>,
    entry: &NewFeedEntry,
) -> Result<FeedEntry, AppError> {
    let row = sqlx::query_as::<_, FeedEntryRow>(
        r#"
        INSERT INTO feed_entries (title, description, published_at, created_at)
        VALUES (?1, ?2, ?3, ?4)
        RETURNING id, title, description, published_at, created_at
        "#,
    )
    .bind(&entry.title)
    .bind(&entry.description)
    .bind(entry.published_at)
    .bind(Utc::now())
    .fetch_one(exec)
    .await
    .map_err(db_error)?;

    Ok(row.into())
}

impl FeedStore for FeedRepository {
    async fn append(&self, entry: &NewFeedEntry) -> Result<FeedEntry, AppError> {
        match &self.pool {
            DbPool::Postgres(pool) => insert_pg(pool, entry).await,
            DbPool::Sqlite(pool) => insert_sqlite(pool, entry).await,
        }
    }

    async fn recent(&self, limit: i64) -> Result<Vec<FeedEntry>, AppError> {
        const ALL: &str = "SELECT id, title, description, published_at, created_at \
                           FROM feed_entries ORDER BY published_at DESC, id DESC";
        const LIMITED_PG: &str = "SELECT id, title, description, published_at, created_at \
                                  FROM feed_entries ORDER BY published_at DESC, id DESC LIMIT $1";
        const LIMITED_SQLITE: &str = "SELECT id, title, description, published_at, created_at \
                                      FROM feed_entries ORDER BY published_at DESC, id DESC LIMIT ?1";

        let rows = match (&self.pool, limit > 0) {
            (DbPool::Postgres(pool), true) => {
                sqlx::query_as::<_, FeedEntryRow>(LIMITED_PG)
                    .bind(limit)
                    .fetch_all(pool)
                    .await
            }
            (DbPool::Sqlite(pool), true) => {
                sqlx::query_as::<_, FeedEntryRow>(LIMITED_SQLITE)
                    .bind(limit)
                    .fetch_all(pool)
                    .await
            }
            (DbPool::Postgres(pool), false) => {
                sqlx::query_as::<_, FeedEntryRow>(ALL).fetch_all(pool).await
            }
            (DbPool::Sqlite(pool), false) => {
                sqlx::query_as::<_, FeedEntryRow>(ALL).fetch_all(pool).await
            }
        }
        .map_err(db_error)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
