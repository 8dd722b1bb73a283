use std::future::Future;

use crate::catalog::Catalog;
use crate::error::AppError;
use crate::models::{FeedEntry, FingerprintRecord, LockLease, NewFeedEntry, ObservedStatus};

/// Fetches the raw HTML of the status page.
pub trait Fetcher: Send + Sync + Clone {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// Turns a status page document into (service, status) pairs.
///
/// Implementations must return one pair per catalog service or fail with
/// [`AppError::StructuralMismatch`]; no partial results. Parsing is
/// synchronous and runs on the blocking pool.
pub trait StatusParser: Send + Sync + Clone + 'static {
    fn parse(&self, html: &str, catalog: &Catalog) -> Result<Vec<ObservedStatus>, AppError>;
}

/// Persists the singleton fingerprint record.
pub trait FingerprintStore: Send + Sync + Clone {
    /// Returns `None` before the first successful run.
    fn load(&self) -> impl Future<Output = Result<Option<FingerprintRecord>, AppError>> + Send;

    /// Create the record on the first run.
    fn create(
        &self,
        digest: &str,
    ) -> impl Future<Output = Result<FingerprintRecord, AppError>> + Send;

    /// Replace the digest of the existing record.
    fn update(
        &self,
        digest: &str,
    ) -> impl Future<Output = Result<FingerprintRecord, AppError>> + Send;
}

/// Append-only log of feed entries.
pub trait FeedStore: Send + Sync + Clone {
    fn append(
        &self,
        entry: &NewFeedEntry,
    ) -> impl Future<Output = Result<FeedEntry, AppError>> + Send;

    /// Newest entries first. `limit <= 0` returns everything.
    fn recent(&self, limit: i64) -> impl Future<Output = Result<Vec<FeedEntry>, AppError>> + Send;
}

/// Fingerprint and feed storage behind one handle, so a detected change can
/// be written as a unit.
pub trait StatusStore: FingerprintStore + FeedStore {
    /// Append `entry` and store `digest` as the current fingerprint; both
    /// writes happen or neither does. `first_run` selects create over update.
    fn record_change(
        &self,
        digest: &str,
        first_run: bool,
        entry: &NewFeedEntry,
    ) -> impl Future<Output = Result<(FingerprintRecord, FeedEntry), AppError>> + Send;
}

/// Cross-process mutual exclusion keyed by name.
///
/// Implementations must rely on the store's uniqueness guarantee for the
/// check-then-insert in `acquire`, never on an application-level read.
pub trait ExecutionLock: Send + Sync + Clone {
    /// Take the lock, or fail with [`AppError::LockHeld`].
    fn acquire(&self, key: &str) -> impl Future<Output = Result<LockLease, AppError>> + Send;

    /// Push the lease deadline forward. Fails with [`AppError::LockLost`] if
    /// the lease no longer belongs to this holder.
    fn extend(
        &self,
        lease: &LockLease,
    ) -> impl Future<Output = Result<LockLease, AppError>> + Send;

    /// Delete the lock record for `lease.key` if it is still owned by
    /// `lease.holder`. A record reclaimed by another holder is left alone.
    fn release(&self, lease: &LockLease) -> impl Future<Output = Result<(), AppError>> + Send;
}
