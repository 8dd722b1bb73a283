use std::fmt;
use std::time::Duration;

use url::Url;

use crate::error::AppError;
use crate::feed::EntryKind;
use crate::lock::{DEFAULT_LOCK_KEY, LeaseConfig, ttl_from_secs};
use crate::models::FeedEntry;
use crate::scheduler::{Cadence, DEFAULT_CRON_SCHEDULE};

pub const DEFAULT_STATUS_PAGE_URL: &str = "https://my.shopifystatus.com";

/// Result of one observation cycle. The job never returns an error to its
/// trigger; failures are reported through [`CycleOutcome::Failed`].
#[derive(Debug)]
pub enum CycleOutcome {
    /// A new feed entry was written.
    Published {
        entry: FeedEntry,
        kind: EntryKind,
        digest: String,
        first_run: bool,
    },
    /// The page matches the last recorded fingerprint.
    Unchanged { digest: String },
    /// Another process holds the lock; nothing was done.
    Skipped,
    Failed(AppError),
}

impl CycleOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleOutcome::Published { .. } => "published",
            CycleOutcome::Unchanged { .. } => "unchanged",
            CycleOutcome::Skipped => "skipped",
            CycleOutcome::Failed(_) => "failed",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, CycleOutcome::Failed(_))
    }
}

impl fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleOutcome::Published { entry, .. } => write!(f, "published: {}", entry.title),
            CycleOutcome::Unchanged { digest } => {
                write!(f, "unchanged ({})", digest.get(..8).unwrap_or(digest))
            }
            CycleOutcome::Skipped => write!(f, "skipped: lock held elsewhere"),
            CycleOutcome::Failed(e) => write!(f, "failed: {e}"),
        }
    }
}

/// Settings for the observation job and its schedule.
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub status_page_url: String,
    /// Name used in feed entry headings.
    pub site_name: String,
    pub lock_key: String,
    /// Deadline covering fetch and parse together.
    pub fetch_timeout: Duration,
    /// When cycles after the startup run happen.
    pub cadence: Cadence,
    pub lease: LeaseConfig,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            status_page_url: DEFAULT_STATUS_PAGE_URL.to_string(),
            site_name: "Shopify".to_string(),
            lock_key: DEFAULT_LOCK_KEY.to_string(),
            fetch_timeout: Duration::from_secs(10),
            cadence: Cadence::cron(DEFAULT_CRON_SCHEDULE)
                .unwrap_or(Cadence::Every(Duration::from_secs(30 * 60))),
            lease: LeaseConfig::default(),
        }
    }
}

impl JobConfig {
    /// Read configuration from environment variables.
    ///
    /// - `STATUS_PAGE_URL` (defaults to the Shopify status page)
    /// - `STATUSFEED_SITE_NAME` (defaults to "Shopify")
    /// - `STATUSFEED_LOCK_KEY` (defaults to "check-status")
    /// - `STATUSFEED_FETCH_TIMEOUT_SECS` (defaults to 10)
    /// - `CRON_SCHEDULE` (defaults to `*/30 * * * *`)
    /// - `STATUSFEED_INTERVAL_SECS` (fixed interval, overrides `CRON_SCHEDULE`)
    /// - `STATUSFEED_LOCK_TTL_SECS` (defaults to 300, 0 disables expiry,
    ///   at most one day)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let defaults = Self::default();

        let status_page_url = lookup("STATUS_PAGE_URL").unwrap_or(defaults.status_page_url);
        validate_page_url(&status_page_url)?;

        let site_name = lookup("STATUSFEED_SITE_NAME").unwrap_or(defaults.site_name);
        let lock_key = lookup("STATUSFEED_LOCK_KEY").unwrap_or(defaults.lock_key);
        if lock_key.trim().is_empty() {
            return Err(AppError::ConfigError(
                "STATUSFEED_LOCK_KEY must not be empty".into(),
            ));
        }

        let fetch_timeout = match parse_secs(&lookup, "STATUSFEED_FETCH_TIMEOUT_SECS")? {
            Some(0) => {
                return Err(AppError::ConfigError(
                    "STATUSFEED_FETCH_TIMEOUT_SECS must be at least 1".into(),
                ));
            }
            Some(secs) => Duration::from_secs(secs),
            None => defaults.fetch_timeout,
        };

        let cadence = match parse_secs(&lookup, "STATUSFEED_INTERVAL_SECS")? {
            Some(0) => {
                return Err(AppError::ConfigError(
                    "STATUSFEED_INTERVAL_SECS must be at least 1".into(),
                ));
            }
            Some(secs) => Cadence::Every(Duration::from_secs(secs)),
            None => Cadence::cron(
                lookup("CRON_SCHEDULE")
                    .as_deref()
                    .unwrap_or(DEFAULT_CRON_SCHEDULE),
            )?,
        };

        let lease = match parse_secs(&lookup, "STATUSFEED_LOCK_TTL_SECS")? {
            Some(secs) => defaults.lease.with_ttl(ttl_from_secs(secs)?),
            None => defaults.lease,
        };

        Ok(Self {
            status_page_url,
            site_name,
            lock_key,
            fetch_timeout,
            cadence,
            lease,
        })
    }

    pub fn with_status_page_url(mut self, url: impl Into<String>) -> Self {
        self.status_page_url = url.into();
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_cadence(mut self, cadence: Cadence) -> Self {
        self.cadence = cadence;
        self
    }
}

fn parse_secs(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<u64>, AppError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse().map(Some).map_err(|_| {
            AppError::ConfigError(format!(
                "Invalid {key} '{raw}': must be a non-negative integer"
            ))
        }),
    }
}

/// The status page must be an absolute http(s) URL.
pub fn validate_page_url(raw: &str) -> Result<(), AppError> {
    let parsed = Url::parse(raw)
        .map_err(|e| AppError::ConfigError(format!("Invalid status page URL '{raw}': {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(AppError::ConfigError(format!(
            "Status page URL scheme '{scheme}' is not allowed (only http/https)"
        ))),
    }
}
