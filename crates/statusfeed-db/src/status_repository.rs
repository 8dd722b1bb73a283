use statusfeed_core::error::AppError;
use statusfeed_core::models::{FeedEntry, FingerprintRecord, NewFeedEntry};
use statusfeed_core::traits::{FeedStore, FingerprintStore, StatusStore};

use crate::feed_repository::{self, FeedRepository};
use crate::fingerprint_repository::{self, FingerprintRepository};
use crate::pool::{DbPool, db_error};

/// Fingerprint and feed behind one pool.
///
/// [`StatusStore::record_change`] writes the feed entry and the new digest
/// in a single transaction: either both become visible or neither does.
#[derive(Clone)]
pub struct StatusRepository {
    pool: DbPool,
    fingerprints: FingerprintRepository,
    feed: FeedRepository,
}

impl StatusRepository {
    pub fn new(pool: impl Into<DbPool>) -> Self {
        let pool = pool.into();
        Self {
            fingerprints: FingerprintRepository::new(pool.clone()),
            feed: FeedRepository::new(pool.clone()),
            pool,
        }
    }
}

impl FingerprintStore for StatusRepository {
    async fn load(&self) -> Result<Option<FingerprintRecord>, AppError> {
        self.fingerprints.load().await
    }

    async fn create(&self, digest: &str) -> Result<FingerprintRecord, AppError> {
        self.fingerprints.create(digest).await
    }

    async fn update(&self, digest: &str) -> Result<FingerprintRecord, AppError> {
        self.fingerprints.update(digest).await
    }
}

impl FeedStore for StatusRepository {
    async fn append(&self, entry: &NewFeedEntry) -> Result<FeedEntry, AppError> {
        self.feed.append(entry).await
    }

    async fn recent(&self, limit: i64) -> Result<Vec<FeedEntry>, AppError> {
        self.feed.recent(limit).await
    }
}

impl StatusStore for StatusRepository {
    async fn record_change(
        &self,
        digest: &str,
        first_run: bool,
        entry: &NewFeedEntry,
    ) -> Result<(FingerprintRecord, FeedEntry), AppError> {
        // Dropping an uncommitted transaction rolls it back, so every `?`
        // below leaves both tables untouched.
        match &self.pool {
            DbPool::Postgres(pool) => {
                let mut tx = pool.begin().await.map_err(db_error)?;
                let appended = feed_repository::insert_pg(&mut *tx, entry).await?;
                let record = if first_run {
                    fingerprint_repository::create_pg(&mut *tx, digest).await?
                } else {
                    fingerprint_repository::update_pg(&mut *tx, digest).await?
                };
                tx.commit().await.map_err(db_error)?;
                Ok((record, appended))
            }
            DbPool::Sqlite(pool) => {
                let mut tx = pool.begin().await.map_err(db_error)?;
                let appended = feed_repository::insert_sqlite(&mut *tx, entry).await?;
                let record = if first_run {
                    fingerprint_repository::create_sqlite(&mut *tx, digest).await?
                } else {
                    fingerprint_repository::update_sqlite(&mut *tx, digest).await?
                };
                tx.commit().await.map_err(db_error)?;
                Ok((record, appended))
            }
        }
    }
}
