//! Lease settings shared by every [`ExecutionLock`](crate::traits::ExecutionLock)
//! implementation.
//!
//! A lock record carries an optional expiry. An expired record is treated as
//! absent by `acquire`, so a process that crashed while holding the lock does
//! not strand it forever. With no TTL the record only goes away through
//! `release` (or `statusfeed unlock`).

use chrono::{DateTime, TimeDelta, Utc};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::LockLease;

/// Key used to serialize status checks across processes.
pub const DEFAULT_LOCK_KEY: &str = "check-status";

/// Longest lease accepted from configuration.
pub const MAX_LOCK_TTL_SECS: u64 = 24 * 60 * 60;

/// Lease length for a TTL given in seconds; `0` disables expiry.
pub fn ttl_from_secs(secs: u64) -> Result<Option<TimeDelta>, AppError> {
    if secs == 0 {
        return Ok(None);
    }
    if secs > MAX_LOCK_TTL_SECS {
        return Err(AppError::ConfigError(format!(
            "Lock TTL of {secs} seconds exceeds the maximum of {MAX_LOCK_TTL_SECS}"
        )));
    }
    i64::try_from(secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .map(Some)
        .ok_or_else(|| AppError::ConfigError(format!("Lock TTL of {secs} seconds is out of range")))
}

#[derive(Debug, Clone)]
pub struct LeaseConfig {
    /// Identifies this process in lock records.
    pub holder: String,
    /// Lease length; `None` disables expiry.
    pub ttl: Option<TimeDelta>,
}

impl Default for LeaseConfig {
    fn default() -> Self {
        Self {
            holder: format!("statusfeed-{}", &Uuid::new_v4().to_string()[..8]),
            ttl: Some(TimeDelta::minutes(5)),
        }
    }
}

impl LeaseConfig {
    pub fn with_holder(mut self, holder: impl Into<String>) -> Self {
        self.holder = holder.into();
        self
    }

    pub fn with_ttl(mut self, ttl: Option<TimeDelta>) -> Self {
        self.ttl = ttl;
        self
    }

    /// Expiry for a lease taken or renewed at `now`.
    pub fn deadline(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.ttl.map(|ttl| now + ttl)
    }

    /// A fresh lease on `key` held by this process.
    pub fn lease(&self, key: &str, now: DateTime<Utc>) -> LockLease {
        LockLease {
            key: key.to_string(),
            holder: self.holder.clone(),
            acquired_at: now,
            expires_at: self.deadline(now),
        }
    }
}

impl LockLease {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}
