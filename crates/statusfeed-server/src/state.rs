use statusfeed_db::Database;

use crate::rss::Channel;

/// Shared application state, available to all route handlers via `State<Arc<AppState>>`.
pub struct AppState {
    pub db: Database,
    /// Number of entries served by the feed routes.
    pub feed_limit: i64,
    pub channel: Channel,
}
