use statusfeed_core::AppError;

use crate::pool::Backend;

/// SQLite file used when `DATABASE_URL` is not set.
pub const DEFAULT_DATABASE_URL: &str = "file:./shopify-status-rss.db";

/// Configuration for the database connection pool.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub backend: Backend,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Result<Self, AppError> {
        let url = url.into();
        let backend = Backend::from_url(&url)?;
        Ok(Self {
            url,
            backend,
            max_connections: 5,
        })
    }

    /// Read configuration from environment variables.
    ///
    /// - `DATABASE_URL` (optional, PostgreSQL or SQLite, defaults to
    ///   [`DEFAULT_DATABASE_URL`])
    /// - `DATABASE_MAX_CONNECTIONS` (optional, defaults to 5)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let url = lookup("DATABASE_URL")
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let mut config = Self::new(url)?;

        if let Some(raw) = lookup("DATABASE_MAX_CONNECTIONS") {
            let parsed: u32 = raw.parse().map_err(|_| {
                AppError::ConfigError(format!(
                    "Invalid DATABASE_MAX_CONNECTIONS '{raw}': must be a positive integer"
                ))
            })?;
            if parsed == 0 {
                return Err(AppError::ConfigError(
                    "DATABASE_MAX_CONNECTIONS must be at least 1".into(),
                ));
            }
            config.max_connections = parsed;
        }

        Ok(config)
    }

    /// Path of the SQLite database file, or `None` for PostgreSQL and
    /// in-memory SQLite URLs. `file:` URLs may carry a query string, which
    /// is ignored.
    pub fn sqlite_path(&self) -> Option<&str> {
        if self.backend != Backend::Sqlite || self.is_memory() {
            return None;
        }
        let rest = self
            .url
            .strip_prefix("file:")
            .or_else(|| self.url.strip_prefix("sqlite://"))
            .or_else(|| self.url.strip_prefix("sqlite:"))?;
        let path = rest.split('?').next().unwrap_or(rest);
        (!path.is_empty()).then_some(path)
    }

    pub fn is_memory(&self) -> bool {
        self.backend == Backend::Sqlite && self.url.contains(":memory:")
    }
}
