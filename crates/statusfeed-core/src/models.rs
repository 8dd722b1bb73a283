use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A service listed on the status page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
}

impl Service {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// One kind of status a service can be in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusKind {
    /// Display text, e.g. "Operational" or "Major outage".
    pub name: String,
    /// Classification token found on the indicator element (a CSS class).
    /// Used for fingerprinting, independent of the display text.
    pub token: String,
    pub is_error: bool,
}

impl StatusKind {
    pub fn new(name: impl Into<String>, token: impl Into<String>, is_error: bool) -> Self {
        Self {
            name: name.into(),
            token: token.into(),
            is_error,
        }
    }
}

/// A single (service, status) pair from one parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedStatus {
    pub service: Service,
    pub status: StatusKind,
}

/// Structured snapshot of the status page.
///
/// Entries are always kept sorted by service name so that anything derived
/// from an observation does not depend on page layout order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    statuses: Vec<ObservedStatus>,
    captured_at: DateTime<Utc>,
}

impl Observation {
    pub fn new(mut statuses: Vec<ObservedStatus>, captured_at: DateTime<Utc>) -> Self {
        // `sort_by` is stable
        statuses.sort_by(|a, b| a.service.name.cmp(&b.service.name));
        Self {
            statuses,
            captured_at,
        }
    }

    pub fn statuses(&self) -> &[ObservedStatus] {
        &self.statuses
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.statuses.iter().any(|s| s.status.is_error)
    }

    /// Entries whose status kind is flagged as an error.
    pub fn errors(&self) -> impl Iterator<Item = &ObservedStatus> {
        self.statuses.iter().filter(|s| s.status.is_error)
    }
}

/// The singleton record holding the digest of the last distinct observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FingerprintRecord {
    pub digest: String,
    pub updated_at: DateTime<Utc>,
}

/// A published feed entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedEntry {
    pub id: i64,
    pub title: String,
    /// HTML summary of the observation.
    pub description: String,
    pub published_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// DTO for appending a new entry to the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewFeedEntry {
    pub title: String,
    pub description: String,
    pub published_at: DateTime<Utc>,
}

/// Proof of holding an execution lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockLease {
    pub key: String,
    /// Identifier of the process that holds the lock.
    pub holder: String,
    pub acquired_at: DateTime<Utc>,
    /// `None` means the lock never expires on its own.
    pub expires_at: Option<DateTime<Utc>>,
}
