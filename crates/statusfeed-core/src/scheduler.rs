use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::error::AppError;
use crate::job::CycleOutcome;
use crate::observe::{JobReporter, ObservationJob};
use crate::traits::{ExecutionLock, Fetcher, StatusParser, StatusStore};

pub const DEFAULT_CRON_SCHEDULE: &str = "*/30 * * * *";

/// Anything the scheduler can trigger. Must not fail: errors are part of
/// the returned outcome.
pub trait ScheduledJob: Send + Sync {
    fn run_cycle<R: JobReporter>(&self, reporter: &R)
    -> impl Future<Output = CycleOutcome> + Send;
}

impl<F, P, S, L> ScheduledJob for ObservationJob<F, P, S, L>
where
    F: Fetcher,
    P: StatusParser,
    S: StatusStore,
    L: ExecutionLock,
{
    async fn run_cycle<R: JobReporter>(&self, reporter: &R) -> CycleOutcome {
        self.run(reporter).await
    }
}

/// When cycles after the first one run.
#[derive(Debug, Clone)]
pub enum Cadence {
    /// Fixed pause between the end of one cycle and the start of the next.
    Every(Duration),
    /// Wall-clock slots of a cron expression, in UTC.
    Cron {
        expression: String,
        schedule: cron::Schedule,
    },
}

impl Cadence {
    /// Parse a cron expression.
    ///
    /// Five-field expressions (`*/30 * * * *`) fire at second zero; six or
    /// seven fields are passed through with a leading seconds field.
    pub fn cron(expression: &str) -> Result<Self, AppError> {
        let trimmed = expression.trim();
        let fields = trimmed.split_whitespace().count();
        let full = match fields {
            5 => format!("0 {trimmed}"),
            6 | 7 => trimmed.to_string(),
            _ => {
                return Err(AppError::ConfigError(format!(
                    "Invalid cron schedule '{expression}': expected 5 to 7 fields, found {fields}"
                )));
            }
        };

        let schedule = cron::Schedule::from_str(&full).map_err(|e| {
            AppError::ConfigError(format!("Invalid cron schedule '{expression}': {e}"))
        })?;

        Ok(Cadence::Cron {
            expression: trimmed.to_string(),
            schedule,
        })
    }

    /// Time to wait after `now` before the next cycle. `None` when the
    /// schedule has no further occurrences.
    pub fn next_delay(&self, now: DateTime<Utc>) -> Option<Duration> {
        match self {
            Cadence::Every(interval) => Some(*interval),
            Cadence::Cron { schedule, .. } => {
                let next = schedule.after(&now).next()?;
                Some((next - now).to_std().unwrap_or(Duration::ZERO))
            }
        }
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cadence::Every(interval) => write!(f, "every {}s", interval.as_secs()),
            Cadence::Cron { expression, .. } => write!(f, "cron '{expression}'"),
        }
    }
}

/// Runs a job once at startup and then on its cadence.
///
/// Cycles run one after another on the calling task, so a slow cycle pushes
/// the next one back instead of overlapping it. Cancellation only cuts the
/// wait between cycles: a cycle that has started always runs to completion
/// and releases its lock.
#[derive(Debug, Clone)]
pub struct Scheduler {
    cadence: Cadence,
}

impl Scheduler {
    pub fn new(cadence: Cadence) -> Self {
        Self { cadence }
    }

    /// Run until cancellation. Returns the number of cycles executed.
    pub async fn run<J: ScheduledJob, R: JobReporter>(
        &self,
        job: &J,
        reporter: &R,
        cancel_token: CancellationToken,
    ) -> u64 {
        tracing::info!(cadence = %self.cadence, "Scheduler started");
        let mut cycles = 0u64;

        while !cancel_token.is_cancelled() {
            let outcome = job.run_cycle(reporter).await;
            cycles += 1;
            tracing::debug!(cycle = cycles, outcome = outcome.as_str(), "Cycle finished");

            let Some(delay) = self.cadence.next_delay(Utc::now()) else {
                tracing::warn!(cadence = %self.cadence, "Schedule has no further runs");
                break;
            };

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = cancel_token.cancelled() => break,
            }
        }

        tracing::info!(%cycles, "Scheduler stopped");
        cycles
    }
}
