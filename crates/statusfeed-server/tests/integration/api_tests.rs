use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::{TimeDelta, Utc};
use http_body_util::BodyExt;
use tower::ServiceExt;

use statusfeed_core::models::NewFeedEntry;
use statusfeed_core::traits::FeedStore;

use crate::integration::common::{TEST_FEED_LIMIT, TestApp, setup_test_app};

async fn seed_entries(app: &TestApp, count: i64) {
    let repo = app.db.feed_repo();
    for i in 0..count {
        repo.append(&NewFeedEntry {
            title: format!("entry {i}"),
            description: format!("<h2>Shopify Is Operational</h2><p>{i} &amp; more</p>"),
            published_at: Utc::now() - TimeDelta::minutes(count - i),
        })
        .await
        .unwrap();
    }
}

async fn get(app: &TestApp, uri: &str) -> (StatusCode, Option<String>, String) {
    let response = app
        .router
        .clone()
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, content_type, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn health_returns_200() {
    let app = setup_test_app().await;

    let (status, _, body) = get(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["database"], "ok");
}

#[tokio::test]
async fn empty_feed_renders_channel_only() {
    let app = setup_test_app().await;

    let (status, content_type, body) = get(&app, "/status.rss").await;

    assert_eq!(status, StatusCode::OK);
    assert!(content_type.unwrap().starts_with("application/xml"));
    assert!(body.contains("<title>Shopify Services Status</title>"));
    assert!(!body.contains("<item>"));
}

#[tokio::test]
async fn feed_is_newest_first_and_limited() {
    let app = setup_test_app().await;
    seed_entries(&app, 5).await;

    let (status, _, body) = get(&app, "/status.rss").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.matches("<item>").count(), TEST_FEED_LIMIT as usize);
    let newest = body.find("<title>entry 4</title>").unwrap();
    let older = body.find("<title>entry 2</title>").unwrap();
    assert!(newest < older);
    assert!(!body.contains("<title>entry 1</title>"));
    // Stored HTML is escaped once more inside the XML.
    assert!(body.contains("&lt;h2&gt;Shopify Is Operational&lt;/h2&gt;"));
    assert!(body.contains("&amp;amp; more"));
}

#[tokio::test]
async fn json_feed_honours_limit_query() {
    let app = setup_test_app().await;
    seed_entries(&app, 5).await;

    let (status, _, body) = get(&app, "/v1/feed?limit=2").await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["total"], 2);
    assert_eq!(json["entries"][0]["title"], "entry 4");

    let (_, _, body) = get(&app, "/v1/feed?limit=0").await;
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["total"], 5);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = setup_test_app().await;

    let (status, _, body) = get(&app, "/api-docs/openapi.json").await;

    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["info"]["title"], "statusfeed API");
    assert!(json["paths"]["/v1/feed"].is_object());
}
