pub mod catalog_repository;
pub mod config;
pub mod database;
pub mod feed_repository;
pub mod fingerprint_repository;
pub mod lock_repository;
pub mod pool;
pub mod status_repository;

pub use catalog_repository::{CatalogRepository, SeedSummary};
pub use config::{DEFAULT_DATABASE_URL, DatabaseConfig};
pub use database::Database;
pub use feed_repository::FeedRepository;
pub use fingerprint_repository::FingerprintRepository;
pub use lock_repository::LockRepository;
pub use pool::{Backend, DbPool};
pub use status_repository::StatusRepository;
