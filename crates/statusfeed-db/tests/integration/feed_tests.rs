use chrono::{TimeDelta, Utc};
use statusfeed_core::models::NewFeedEntry;
use statusfeed_core::traits::FeedStore;

use crate::integration::common::setup_test_db;

fn entry(title: &str, minutes_ago: i64) -> NewFeedEntry {
    NewFeedEntry {
        title: title.to_string(),
        description: format!("<p>{title}</p>"),
        published_at: Utc::now() - TimeDelta::minutes(minutes_ago),
    }
}

#[tokio::test]
async fn append_returns_stored_entry() {
    let (db, _container) = setup_test_db().await;
    let repo = db.feed_repo();

    let new = entry("All services appear to be operational", 0);
    let stored = repo.append(&new).await.unwrap();

    assert!(stored.id > 0);
    assert_eq!(stored.title, new.title);
    assert_eq!(stored.description, new.description);
    assert_eq!(
        stored.published_at.timestamp_micros(),
        new.published_at.timestamp_micros()
    );
}

#[tokio::test]
async fn recent_is_newest_first_with_limit() {
    let (db, _container) = setup_test_db().await;
    let repo = db.feed_repo();

    repo.append(&entry("oldest", 30)).await.unwrap();
    repo.append(&entry("newest", 0)).await.unwrap();
    repo.append(&entry("middle", 10)).await.unwrap();

    let titles: Vec<String> = repo
        .recent(2)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.title)
        .collect();
    assert_eq!(titles, vec!["newest", "middle"]);
}

#[tokio::test]
async fn recent_breaks_ties_by_insertion() {
    let (db, _container) = setup_test_db().await;
    let repo = db.feed_repo();

    let at = Utc::now();
    for title in ["first", "second"] {
        repo.append(&NewFeedEntry {
            title: title.to_string(),
            description: String::new(),
            published_at: at,
        })
        .await
        .unwrap();
    }

    let entries = repo.recent(10).await.unwrap();
    assert_eq!(entries[0].title, "second");
    assert_eq!(entries[1].title, "first");
}

#[tokio::test]
async fn recent_zero_is_unbounded() {
    let (db, _container) = setup_test_db().await;
    let repo = db.feed_repo();

    for i in 0..15 {
        repo.append(&entry(&format!("entry {i}"), i)).await.unwrap();
    }

    assert_eq!(repo.recent(0).await.unwrap().len(), 15);
    assert_eq!(repo.recent(-1).await.unwrap().len(), 15);
    // Each call is a fresh query.
    assert_eq!(repo.recent(5).await.unwrap().len(), 5);
    assert_eq!(repo.recent(5).await.unwrap().len(), 5);
}
