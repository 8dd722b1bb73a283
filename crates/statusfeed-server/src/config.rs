use std::str::FromStr;

use statusfeed_core::AppError;

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

impl FromStr for LogFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(AppError::ConfigError(format!(
                "Invalid LOG_FORMAT '{other}': expected 'text' or 'json'"
            ))),
        }
    }
}

/// HTTP-side settings of the server binary.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Entries served by `/status.rss`; 0 serves the whole feed.
    pub feed_limit: i64,
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            feed_limit: 10,
            log_format: LogFormat::Text,
        }
    }
}

impl ServerConfig {
    /// Read configuration from environment variables.
    ///
    /// - `STATUSFEED_PORT` (defaults to 3000)
    /// - `STATUSFEED_FEED_LIMIT` (defaults to 10)
    /// - `LOG_FORMAT` (`text` or `json`, defaults to `text`)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let mut config = Self::default();

        if let Some(raw) = lookup("STATUSFEED_PORT") {
            config.port = raw.trim().parse().map_err(|_| {
                AppError::ConfigError(format!("Invalid STATUSFEED_PORT '{raw}'"))
            })?;
        }

        if let Some(raw) = lookup("STATUSFEED_FEED_LIMIT") {
            let limit: i64 = raw.trim().parse().map_err(|_| {
                AppError::ConfigError(format!("Invalid STATUSFEED_FEED_LIMIT '{raw}'"))
            })?;
            if limit < 0 {
                return Err(AppError::ConfigError(
                    "STATUSFEED_FEED_LIMIT must not be negative".into(),
                ));
            }
            config.feed_limit = limit;
        }

        if let Some(raw) = lookup("LOG_FORMAT") {
            config.log_format = raw.parse()?;
        }

        Ok(config)
    }
}
