use thiserror::Error;

/// Application-wide error types for statusfeed.
#[derive(Error, Debug)]
pub enum AppError {
    /// HTTP request failed or the status page answered with a non-success code.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Fetch or parse exceeded its deadline.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// The page no longer lines up with the catalog.
    #[error(
        "Status page structure changed: expected {expected} services, found {services} service names and {indicators} status indicators"
    )]
    StructuralMismatch {
        expected: usize,
        services: usize,
        indicators: usize,
    },

    /// Another holder owns the execution lock.
    #[error("Lock '{0}' is already held")]
    LockHeld(String),

    /// The lease was reclaimed by another holder while we were working.
    #[error("Lock '{0}' is no longer held by this process")]
    LockLost(String),

    /// Catalog is empty or inconsistent.
    #[error("Catalog error: {0}")]
    CatalogError(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Database operation failed.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Returns true for errors raised while getting the page off the network.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            AppError::HttpError(_) | AppError::NetworkError(_) | AppError::Timeout(_)
        )
    }

    /// Returns true for outcomes that are part of normal multi-instance contention
    /// rather than something an operator has to look at.
    pub fn is_contention(&self) -> bool {
        matches!(self, AppError::LockHeld(_) | AppError::LockLost(_))
    }
}
