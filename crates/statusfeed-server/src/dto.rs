use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use statusfeed_core::models::FeedEntry;

// ---------------------------------------------------------------------------
// Feed
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct FeedQuery {
    /// Maximum number of entries (defaults to the server's feed limit)
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct FeedEntryResponse {
    pub id: i64,
    pub title: String,
    /// HTML summary of the observation
    pub description: String,
    pub published_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<FeedEntry> for FeedEntryResponse {
    fn from(entry: FeedEntry) -> Self {
        Self {
            id: entry.id,
            title: entry.title,
            description: entry.description,
            published_at: entry.published_at,
            created_at: entry.created_at,
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct FeedResponse {
    pub entries: Vec<FeedEntryResponse>,
    pub total: usize,
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: &'static str,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
