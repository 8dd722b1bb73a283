pub mod catalog;
pub mod error;
pub mod feed;
pub mod fingerprint;
pub mod job;
pub mod lock;
pub mod models;
pub mod observe;
pub mod scheduler;
pub mod traits;
pub mod util;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use catalog::{Catalog, CatalogFile};
pub use error::AppError;
pub use feed::{EntryKind, FeedWriter};
pub use fingerprint::{fingerprint, has_changed};
pub use job::{CycleOutcome, JobConfig};
pub use lock::LeaseConfig;
pub use models::{
    FeedEntry, FingerprintRecord, LockLease, NewFeedEntry, Observation, ObservedStatus, Service,
    StatusKind,
};
pub use observe::{JobReporter, ObservationJob, TracingJobReporter};
pub use scheduler::{Cadence, ScheduledJob, Scheduler};
pub use traits::{ExecutionLock, FeedStore, Fetcher, FingerprintStore, StatusParser, StatusStore};
