use std::sync::Arc;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::get;
use statusfeed_core::traits::FeedStore;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::dto::{FeedEntryResponse, FeedQuery, FeedResponse, HealthResponse};
use crate::error::ApiError;
use crate::openapi::ApiDoc;
use crate::rss;
use crate::state::AppState;

pub const RSS_CONTENT_TYPE: &str = "application/xml; charset=utf-8";

/// Build the full router with all routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/status.rss", get(status_rss))
        .route("/v1/feed", get(list_feed))
        .route("/health", get(health))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Feed
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/status.rss",
    responses(
        (status = 200, description = "RSS 2.0 document, newest entries first", content_type = "application/xml", body = String),
        (status = 503, description = "Database unavailable", body = crate::dto::ErrorResponse),
    ),
    tag = "feed"
)]
pub async fn status_rss(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let entries = state.db.feed_repo().recent(state.feed_limit).await?;
    let body = rss::render(&state.channel, &entries);

    Ok(([(header::CONTENT_TYPE, RSS_CONTENT_TYPE)], body))
}

#[utoipa::path(
    get,
    path = "/v1/feed",
    params(FeedQuery),
    responses(
        (status = 200, description = "Recent feed entries, newest first", body = FeedResponse),
        (status = 503, description = "Database unavailable", body = crate::dto::ErrorResponse),
    ),
    tag = "feed"
)]
pub async fn list_feed(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FeedQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = query.limit.unwrap_or(state.feed_limit);
    let entries: Vec<FeedEntryResponse> = state
        .db
        .feed_repo()
        .recent(limit)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    let total = entries.len();
    Ok(axum::Json(FeedResponse { entries, total }))
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Database unreachable", body = HealthResponse),
    ),
    tag = "system"
)]
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let db_status = match state.db.health_check().await {
        Ok(()) => "ok",
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed");
            "error"
        }
    };

    let status = if db_status == "ok" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = HealthResponse {
        status: if db_status == "ok" {
            "healthy"
        } else {
            "unhealthy"
        },
        database: db_status,
    };

    (status, axum::Json(response))
}
