//! Test utilities: mock implementations of all core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls. Enabled for other crates through the
//! `testutil` feature.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{TimeDelta, Utc};

use crate::catalog::Catalog;
use crate::error::AppError;
use crate::lock::LeaseConfig;
use crate::models::{
    FeedEntry, FingerprintRecord, LockLease, NewFeedEntry, ObservedStatus, Service, StatusKind,
};
use crate::observe::{JobEvent, JobReporter};
use crate::traits::{ExecutionLock, FeedStore, Fetcher, FingerprintStore, StatusParser, StatusStore};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub const TEST_SERVICES: [&str; 3] = ["Admin", "Checkout", "Storefront"];

pub fn operational() -> StatusKind {
    StatusKind::new("Operational", "text-green", false)
}

pub fn degraded() -> StatusKind {
    StatusKind::new("Degraded performance", "text-yellow", true)
}

pub fn outage() -> StatusKind {
    StatusKind::new("Major outage", "text-red", true)
}

/// Three services, one non-error and two error status kinds.
pub fn test_catalog() -> Catalog {
    Catalog::new(
        TEST_SERVICES.iter().map(|s| Service::new(*s)).collect(),
        vec![operational(), degraded(), outage()],
    )
    .unwrap()
}

pub fn all_operational() -> Vec<ObservedStatus> {
    TEST_SERVICES
        .iter()
        .map(|name| ObservedStatus {
            service: Service::new(*name),
            status: operational(),
        })
        .collect()
}

/// Every test service operational except `down`, which has a major outage.
pub fn one_down(down: &str) -> Vec<ObservedStatus> {
    TEST_SERVICES
        .iter()
        .map(|name| ObservedStatus {
            service: Service::new(*name),
            status: if *name == down { outage() } else { operational() },
        })
        .collect()
}

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Mock fetcher that returns a configurable response.
#[derive(Clone)]
pub struct MockFetcher {
    /// Queue of responses. Each call pops the first element.
    /// If empty, returns a default HTML string.
    responses: Arc<Mutex<Vec<Result<String, AppError>>>>,
    calls: Arc<Mutex<usize>>,
    delay: Option<Duration>,
}

impl MockFetcher {
    pub fn new(html: &str) -> Self {
        Self::with_responses(vec![Ok(html.to_string())])
    }

    pub fn with_error(error: AppError) -> Self {
        Self::with_responses(vec![Err(error)])
    }

    pub fn with_responses(responses: Vec<Result<String, AppError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            calls: Arc::new(Mutex::new(0)),
            delay: None,
        }
    }

    /// Sleep before answering, to exercise deadlines.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, _url: &str) -> Result<String, AppError> {
        *self.calls.lock().unwrap() += 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok("<html><body>default</body></html>".to_string())
        } else {
            responses.remove(0)
        }
    }
}

// ---------------------------------------------------------------------------
// MockParser
// ---------------------------------------------------------------------------

/// Mock parser that ignores the document and returns canned observations.
#[derive(Clone)]
pub struct MockParser {
    results: Arc<Mutex<Vec<Result<Vec<ObservedStatus>, AppError>>>>,
}

impl MockParser {
    pub fn new(statuses: Vec<ObservedStatus>) -> Self {
        Self::with_results(vec![Ok(statuses)])
    }

    pub fn with_error(error: AppError) -> Self {
        Self::with_results(vec![Err(error)])
    }

    pub fn with_results(results: Vec<Result<Vec<ObservedStatus>, AppError>>) -> Self {
        Self {
            results: Arc::new(Mutex::new(results)),
        }
    }
}

impl StatusParser for MockParser {
    fn parse(&self, _html: &str, _catalog: &Catalog) -> Result<Vec<ObservedStatus>, AppError> {
        let mut results = self.results.lock().unwrap();
        if results.is_empty() {
            Err(AppError::Generic("MockParser has no more results".into()))
        } else {
            results.remove(0)
        }
    }
}

// ---------------------------------------------------------------------------
// MockFingerprintStore
// ---------------------------------------------------------------------------

/// In-memory singleton fingerprint record.
#[derive(Clone)]
pub struct MockFingerprintStore {
    record: Arc<Mutex<Option<FingerprintRecord>>>,
    creates: Arc<Mutex<usize>>,
    updates: Arc<Mutex<usize>>,
    load_error: Arc<Mutex<Option<AppError>>>,
}

impl MockFingerprintStore {
    /// No record yet, as before the first run.
    pub fn empty() -> Self {
        Self {
            record: Arc::new(Mutex::new(None)),
            creates: Arc::new(Mutex::new(0)),
            updates: Arc::new(Mutex::new(0)),
            load_error: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_digest(digest: &str) -> Self {
        let store = Self::empty();
        *store.record.lock().unwrap() = Some(FingerprintRecord {
            digest: digest.to_string(),
            updated_at: Utc::now(),
        });
        store
    }

    /// Store whose next `load` fails.
    pub fn with_load_error(error: AppError) -> Self {
        let store = Self::empty();
        *store.load_error.lock().unwrap() = Some(error);
        store
    }

    pub fn current(&self) -> Option<FingerprintRecord> {
        self.record.lock().unwrap().clone()
    }

    pub fn creates(&self) -> usize {
        *self.creates.lock().unwrap()
    }

    pub fn updates(&self) -> usize {
        *self.updates.lock().unwrap()
    }
}

impl FingerprintStore for MockFingerprintStore {
    async fn load(&self) -> Result<Option<FingerprintRecord>, AppError> {
        if let Some(e) = self.load_error.lock().unwrap().take() {
            return Err(e);
        }
        Ok(self.current())
    }

    async fn create(&self, digest: &str) -> Result<FingerprintRecord, AppError> {
        let mut record = self.record.lock().unwrap();
        if record.is_some() {
            return Err(AppError::DatabaseError(
                "fingerprint record already exists".into(),
            ));
        }
        let created = FingerprintRecord {
            digest: digest.to_string(),
            updated_at: Utc::now(),
        };
        *record = Some(created.clone());
        *self.creates.lock().unwrap() += 1;
        Ok(created)
    }

    async fn update(&self, digest: &str) -> Result<FingerprintRecord, AppError> {
        let mut record = self.record.lock().unwrap();
        let Some(existing) = record.as_mut() else {
            return Err(AppError::DatabaseError("no fingerprint record to update".into()));
        };
        existing.digest = digest.to_string();
        existing.updated_at = Utc::now();
        *self.updates.lock().unwrap() += 1;
        Ok(existing.clone())
    }
}

// ---------------------------------------------------------------------------
// MockFeedStore
// ---------------------------------------------------------------------------

/// In-memory append-only feed.
#[derive(Clone)]
pub struct MockFeedStore {
    entries: Arc<Mutex<Vec<FeedEntry>>>,
    append_error: Arc<Mutex<Option<AppError>>>,
}

impl MockFeedStore {
    pub fn empty() -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
            append_error: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_append_error(error: AppError) -> Self {
        let store = Self::empty();
        *store.append_error.lock().unwrap() = Some(error);
        store
    }

    /// All entries in insertion order.
    pub fn entries(&self) -> Vec<FeedEntry> {
        self.entries.lock().unwrap().clone()
    }

    fn take_append_error(&self) -> Option<AppError> {
        self.append_error.lock().unwrap().take()
    }
}

impl FeedStore for MockFeedStore {
    async fn append(&self, entry: &NewFeedEntry) -> Result<FeedEntry, AppError> {
        if let Some(e) = self.take_append_error() {
            return Err(e);
        }
        let mut entries = self.entries.lock().unwrap();
        let stored = FeedEntry {
            id: entries.len() as i64 + 1,
            title: entry.title.clone(),
            description: entry.description.clone(),
            published_at: entry.published_at,
            created_at: Utc::now(),
        };
        entries.push(stored.clone());
        Ok(stored)
    }

    async fn recent(&self, limit: i64) -> Result<Vec<FeedEntry>, AppError> {
        let mut entries = self.entries();
        entries.sort_by(|a, b| {
            b.published_at
                .cmp(&a.published_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        if limit > 0 {
            entries.truncate(limit as usize);
        }
        Ok(entries)
    }
}

// ---------------------------------------------------------------------------
// MockStatusStore
// ---------------------------------------------------------------------------

/// Pairs the fingerprint and feed mocks. `record_change` checks for a
/// pending append failure before writing anything, so a failed change
/// leaves both halves untouched.
#[derive(Clone)]
pub struct MockStatusStore {
    pub fingerprints: MockFingerprintStore,
    pub feed: MockFeedStore,
}

impl MockStatusStore {
    pub fn new(fingerprints: MockFingerprintStore, feed: MockFeedStore) -> Self {
        Self { fingerprints, feed }
    }

    pub fn empty() -> Self {
        Self::new(MockFingerprintStore::empty(), MockFeedStore::empty())
    }
}

impl FingerprintStore for MockStatusStore {
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

impl FeedStore for MockStatusStore {
    async fn append(&self, entry: &NewFeedEntry) -> Result<FeedEntry, AppError> {
        self.feed.append(entry).await
    }

    async fn recent(&self, limit: i64) -> Result<Vec<FeedEntry>, AppError> {
        self.feed.recent(limit).await
    }
}

impl StatusStore for MockStatusStore {
    async fn record_change(
        &self,
        digest: &str,
        first_run: bool,
        entry: &NewFeedEntry,
    ) -> Result<(FingerprintRecord, FeedEntry), AppError> {
        if let Some(e) = self.feed.take_append_error() {
            return Err(e);
        }
        let record = if first_run {
            self.fingerprints.create(digest).await?
        } else {
            self.fingerprints.update(digest).await?
        };
        let stored = self.feed.append(entry).await?;
        Ok((record, stored))
    }
}

// ---------------------------------------------------------------------------
// MockLock
// ---------------------------------------------------------------------------

/// In-memory lock table. The mutex makes check-then-insert atomic, the way a
/// unique index does for the database implementation.
#[derive(Clone)]
pub struct MockLock {
    records: Arc<Mutex<HashMap<String, LockLease>>>,
    config: LeaseConfig,
    extend_error: Arc<Mutex<Option<AppError>>>,
    release_error: Arc<Mutex<Option<AppError>>>,
}

impl Default for MockLock {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLock {
    pub fn new() -> Self {
        Self::with_config(LeaseConfig::default())
    }

    pub fn with_config(config: LeaseConfig) -> Self {
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
            config,
            extend_error: Arc::new(Mutex::new(None)),
            release_error: Arc::new(Mutex::new(None)),
        }
    }

    /// Another handle on the same lock table, acting as a different process.
    pub fn as_holder(&self, holder: &str) -> Self {
        Self {
            records: Arc::clone(&self.records),
            config: self.config.clone().with_holder(holder),
            extend_error: Arc::new(Mutex::new(None)),
            release_error: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_extend_error(self, error: AppError) -> Self {
        *self.extend_error.lock().unwrap() = Some(error);
        self
    }

    pub fn with_release_error(self, error: AppError) -> Self {
        *self.release_error.lock().unwrap() = Some(error);
        self
    }

    /// Insert a non-expiring record for `key` owned by `holder`.
    pub fn hold(&self, key: &str, holder: &str) {
        let lease = LockLease {
            key: key.to_string(),
            holder: holder.to_string(),
            acquired_at: Utc::now(),
            expires_at: None,
        };
        self.records.lock().unwrap().insert(key.to_string(), lease);
    }

    /// Insert a record for `key` whose lease has already run out.
    pub fn hold_expired(&self, key: &str, holder: &str) {
        let now = Utc::now();
        let lease = LockLease {
            key: key.to_string(),
            holder: holder.to_string(),
            acquired_at: now - TimeDelta::minutes(10),
            expires_at: Some(now - TimeDelta::minutes(5)),
        };
        self.records.lock().unwrap().insert(key.to_string(), lease);
    }

    pub fn is_held(&self, key: &str) -> bool {
        self.records.lock().unwrap().contains_key(key)
    }

    pub fn holder_of(&self, key: &str) -> Option<String> {
        self.records
            .lock()
            .unwrap()
            .get(key)
            .map(|lease| lease.holder.clone())
    }
}

impl ExecutionLock for MockLock {
    async fn acquire(&self, key: &str) -> Result<LockLease, AppError> {
        let now = Utc::now();
        let mut records = self.records.lock().unwrap();
        if let Some(existing) = records.get(key)
            && !existing.is_expired(now)
        {
            return Err(AppError::LockHeld(key.to_string()));
        }
        let lease = self.config.lease(key, now);
        records.insert(key.to_string(), lease.clone());
        Ok(lease)
    }

    async fn extend(&self, lease: &LockLease) -> Result<LockLease, AppError> {
        if let Some(e) = self.extend_error.lock().unwrap().take() {
            return Err(e);
        }
        let mut records = self.records.lock().unwrap();
        match records.get_mut(&lease.key) {
            Some(current) if current.holder == lease.holder => {
                current.expires_at = self.config.deadline(Utc::now());
                Ok(current.clone())
            }
            _ => Err(AppError::LockLost(lease.key.clone())),
        }
    }

    async fn release(&self, lease: &LockLease) -> Result<(), AppError> {
        if let Some(e) = self.release_error.lock().unwrap().take() {
            return Err(e);
        }
        let mut records = self.records.lock().unwrap();
        if records
            .get(&lease.key)
            .is_some_and(|current| current.holder == lease.holder)
        {
            records.remove(&lease.key);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockReporter
// ---------------------------------------------------------------------------

/// Mock job reporter that records event labels.
#[derive(Default)]
pub struct MockReporter {
    pub events: Arc<Mutex<Vec<String>>>,
}

impl MockReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Labels of the events that matter for control flow; progress events
    /// (`Fetched`, `Parsed`, `Unchanged`, `Published`) are left out.
    pub fn labels(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl JobReporter for MockReporter {
    fn report(&self, event: JobEvent<'_>) {
        let label = match &event {
            JobEvent::LockAcquired { .. } => "LockAcquired",
            JobEvent::LockHeld { .. } => "LockHeld",
            JobEvent::Failed { .. } => "Failed",
            JobEvent::ReleaseFailed { .. } => "ReleaseFailed",
            JobEvent::Released { .. } => "Released",
            JobEvent::Fetched { .. }
            | JobEvent::Parsed { .. }
            | JobEvent::Unchanged { .. }
            | JobEvent::Published { .. } => return,
        };
        self.events.lock().unwrap().push(label.to_string());
    }
}
