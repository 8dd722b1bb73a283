use chrono::Utc;

use crate::catalog::Catalog;
use crate::error::AppError;
use crate::feed::{EntryKind, FeedWriter};
use crate::fingerprint::{fingerprint, has_changed};
use crate::job::{CycleOutcome, JobConfig};
use crate::models::{FeedEntry, LockLease, Observation};
use crate::traits::{ExecutionLock, Fetcher, StatusParser, StatusStore};

/// Events emitted by the observation job for monitoring/logging.
#[derive(Debug, Clone)]
pub enum JobEvent<'a> {
    LockAcquired {
        lease: &'a LockLease,
    },
    LockHeld {
        key: &'a str,
    },
    Fetched {
        url: &'a str,
        bytes: usize,
    },
    Parsed {
        services: usize,
        has_errors: bool,
    },
    Unchanged {
        digest: &'a str,
    },
    Published {
        entry: &'a FeedEntry,
        kind: EntryKind,
        first_run: bool,
    },
    Failed {
        error: &'a AppError,
    },
    ReleaseFailed {
        key: &'a str,
        error: &'a AppError,
    },
    Released {
        key: &'a str,
    },
}

/// Trait for receiving job events (decoupled logging).
pub trait JobReporter: Send + Sync {
    fn report(&self, event: JobEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingJobReporter;

impl JobReporter for TracingJobReporter {
    fn report(&self, event: JobEvent<'_>) {
        match event {
            JobEvent::LockAcquired { lease } => {
                tracing::debug!(key = %lease.key, holder = %lease.holder, expires_at = ?lease.expires_at, "Lock acquired");
            }
            JobEvent::LockHeld { key } => {
                tracing::info!(%key, "Lock held by another process, skipping this cycle");
            }
            JobEvent::Fetched { url, bytes } => {
                tracing::debug!(%url, %bytes, "Fetched status page");
            }
            JobEvent::Parsed {
                services,
                has_errors,
            } => {
                tracing::debug!(%services, %has_errors, "Parsed status page");
            }
            JobEvent::Unchanged { digest } => {
                tracing::info!(digest = %digest.get(..8).unwrap_or(digest), "No changes detected in status page");
            }
            JobEvent::Published {
                entry,
                kind,
                first_run,
            } => {
                tracing::info!(id = entry.id, kind = kind.as_str(), %first_run, title = %entry.title, "Wrote feed entry");
            }
            JobEvent::Failed { error } => match error {
                AppError::StructuralMismatch { .. } => {
                    tracing::error!(%error, "Status page no longer matches the catalog");
                }
                e if e.is_fetch_failure() || e.is_contention() => {
                    tracing::warn!(%error, "Status check failed");
                }
                _ => {
                    tracing::error!(%error, "Status check failed");
                }
            },
            JobEvent::ReleaseFailed { key, error } => {
                tracing::error!(%key, %error, "Failed to release lock");
            }
            JobEvent::Released { key } => {
                tracing::debug!(%key, "Lock released");
            }
        }
    }
}

/// Orchestrates one status check: lock → fetch → parse → fingerprint →
/// compare → persist → publish → unlock.
///
/// Generic over every collaborator so tests can run it against in-memory
/// stores and canned pages.
pub struct ObservationJob<F, P, S, L>
where
    F: Fetcher,
    P: StatusParser,
    S: StatusStore,
    L: ExecutionLock,
{
    fetcher: F,
    parser: P,
    store: S,
    lock: L,
    catalog: Catalog,
    writer: FeedWriter,
    config: JobConfig,
}

impl<F, P, S, L> ObservationJob<F, P, S, L>
where
    F: Fetcher,
    P: StatusParser,
    S: StatusStore,
    L: ExecutionLock,
{
    pub fn new(
        fetcher: F,
        parser: P,
        store: S,
        lock: L,
        catalog: Catalog,
        config: JobConfig,
    ) -> Self {
        Self {
            fetcher,
            parser,
            store,
            lock,
            catalog,
            writer: FeedWriter::new(config.site_name.clone()),
            config,
        }
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    /// Run one cycle. Never returns an error: every failure is reported and
    /// folded into [`CycleOutcome::Failed`] so the trigger is unaffected.
    pub async fn run<R: JobReporter>(&self, reporter: &R) -> CycleOutcome {
        let key = self.config.lock_key.as_str();

        let lease = match self.lock.acquire(key).await {
            Ok(lease) => lease,
            Err(AppError::LockHeld(_)) => {
                reporter.report(JobEvent::LockHeld { key });
                return CycleOutcome::Skipped;
            }
            Err(e) => {
                reporter.report(JobEvent::Failed { error: &e });
                return CycleOutcome::Failed(e);
            }
        };
        reporter.report(JobEvent::LockAcquired { lease: &lease });

        let result = self.check(&lease, reporter).await;

        // Release on every path so the next cycle is not starved. The release
        // is scoped to our lease and leaves a reclaimed record alone.
        match self.lock.release(&lease).await {
            Ok(()) => reporter.report(JobEvent::Released { key }),
            Err(e) => reporter.report(JobEvent::ReleaseFailed { key, error: &e }),
        }

        match result {
            Ok(outcome) => outcome,
            Err(e) => {
                reporter.report(JobEvent::Failed { error: &e });
                CycleOutcome::Failed(e)
            }
        }
    }

    /// The part of the cycle that runs under the lock.
    async fn check<R: JobReporter>(
        &self,
        lease: &LockLease,
        reporter: &R,
    ) -> Result<CycleOutcome, AppError> {
        let observation = self.observe(reporter).await?;
        let digest = fingerprint(&observation);

        // Renew before reading state so a holder whose lease was reclaimed
        // stops here instead of writing.
        self.lock.extend(lease).await?;

        let previous = self.store.load().await?;
        let first_run = match &previous {
            None => true,
            Some(record) if !has_changed(&record.digest, &digest) => {
                reporter.report(JobEvent::Unchanged { digest: &digest });
                return Ok(CycleOutcome::Unchanged { digest });
            }
            Some(_) => false,
        };

        let kind = EntryKind::for_observation(&observation);
        let (_, entry) = self
            .store
            .record_change(&digest, first_run, &self.writer.entry_for(&observation))
            .await?;
        reporter.report(JobEvent::Published {
            entry: &entry,
            kind,
            first_run,
        });

        Ok(CycleOutcome::Published {
            entry,
            kind,
            digest,
            first_run,
        })
    }

    /// Fetch and parse the page under a single deadline. Parsing runs on the
    /// blocking pool so the deadline also bounds it.
    async fn observe<R: JobReporter>(&self, reporter: &R) -> Result<Observation, AppError> {
        let url = self.config.status_page_url.as_str();
        let deadline = self.config.fetch_timeout;

        let observed = tokio::time::timeout(deadline, async {
            let html = self.fetcher.fetch(url).await?;
            reporter.report(JobEvent::Fetched {
                url,
                bytes: html.len(),
            });

            let parser = self.parser.clone();
            let catalog = self.catalog.clone();
            tokio::task::spawn_blocking(move || parser.parse(&html, &catalog))
                .await
                .map_err(|e| AppError::Generic(format!("Parser task failed: {e}")))?
        })
        .await
        .map_err(|_| AppError::Timeout(deadline.as_secs()))??;

        let observation = Observation::new(observed, Utc::now());
        reporter.report(JobEvent::Parsed {
            services: observation.len(),
            has_errors: observation.has_errors(),
        });
        Ok(observation)
    }
}
