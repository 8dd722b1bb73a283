use chrono::{TimeDelta, Utc};
use statusfeed_core::AppError;
use statusfeed_core::catalog::CatalogFile;
use statusfeed_core::feed::OPERATIONAL_TITLE;
use statusfeed_core::job::{CycleOutcome, JobConfig};
use statusfeed_core::lock::LeaseConfig;
use statusfeed_core::models::{LockLease, NewFeedEntry, StatusKind};
use statusfeed_core::observe::ObservationJob;
use statusfeed_core::testutil::{
    MockFetcher, MockParser, MockReporter, all_operational, one_down, test_catalog,
};
use statusfeed_core::traits::{ExecutionLock, FeedStore, FingerprintStore, StatusStore};
use statusfeed_db::{Backend, Database, DatabaseConfig};

use crate::integration::common::setup_sqlite_db;

const KEY: &str = "check-status";

fn entry(title: &str, minutes_ago: i64) -> NewFeedEntry {
    NewFeedEntry {
        title: title.to_string(),
        description: format!("<p>{title}</p>"),
        published_at: Utc::now() - TimeDelta::minutes(minutes_ago),
    }
}

#[tokio::test]
async fn file_url_creates_database() {
    let (db, dir) = setup_sqlite_db().await;
    assert_eq!(db.backend(), Backend::Sqlite);
    assert!(dir.path().join("statusfeed.db").exists());
    db.health_check().await.unwrap();

    // Migrations are idempotent.
    db.migrate().await.unwrap();
}

#[tokio::test]
async fn memory_url_is_usable() {
    let db = Database::connect(&DatabaseConfig::new("sqlite::memory:").unwrap())
        .await
        .unwrap();
    db.migrate().await.unwrap();
    assert!(db.fingerprint_repo().load().await.unwrap().is_none());
}

#[tokio::test]
async fn catalog_seed_and_load() {
    let (db, _dir) = setup_sqlite_db().await;
    let file = CatalogFile {
        services: vec!["Storefront".into(), "Admin".into()],
        statuses: vec![
            StatusKind::new("Operational", "text-green", false),
            StatusKind::new("Major outage", "text-red", true),
        ],
    };

    let summary = db.catalog_repo().seed(&file).await.unwrap();
    assert_eq!((summary.services, summary.statuses), (2, 2));
    let again = db.catalog_repo().seed(&file).await.unwrap();
    assert_eq!((again.services, again.statuses), (0, 0));

    let catalog = db.catalog_repo().load().await.unwrap();
    assert_eq!(catalog.service_count(), 2);
    assert!(catalog.statuses()[1].is_error);
    assert!(!catalog.statuses()[0].is_error);
}

#[tokio::test]
async fn fingerprint_singleton() {
    let (db, _dir) = setup_sqlite_db().await;
    let repo = db.fingerprint_repo();

    assert!(repo.update("digest").await.is_err());
    let created = repo.create("first").await.unwrap();
    assert!(repo.create("again").await.is_err());

    let updated = repo.update("second").await.unwrap();
    assert!(updated.updated_at >= created.updated_at);
    assert_eq!(repo.load().await.unwrap().unwrap().digest, "second");
}

#[tokio::test]
async fn feed_order_and_limit() {
    let (db, _dir) = setup_sqlite_db().await;
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
    assert_eq!(repo.recent(0).await.unwrap().len(), 3);
}

#[tokio::test]
async fn failed_digest_write_rolls_back_entry() {
    let (db, _dir) = setup_sqlite_db().await;
    let repo = db.status_repo();
    repo.create("existing").await.unwrap();

    assert!(
        repo.record_change("other", true, &entry("lost", 0))
            .await
            .is_err()
    );
    assert!(repo.recent(0).await.unwrap().is_empty());
    assert_eq!(repo.load().await.unwrap().unwrap().digest, "existing");
}

#[tokio::test]
async fn lock_lifecycle() {
    let (db, _dir) = setup_sqlite_db().await;
    let a = db.lock(LeaseConfig::default().with_holder("process-a"));
    let b = db.lock(LeaseConfig::default().with_holder("process-b"));

    let lease = a.acquire(KEY).await.unwrap();
    assert!(lease.expires_at.is_some());
    assert!(matches!(b.acquire(KEY).await, Err(AppError::LockHeld(_))));

    let renewed = a.extend(&lease).await.unwrap();
    assert!(renewed.expires_at >= lease.expires_at);

    // Releasing someone else's lease is a no-op.
    let foreign = LockLease {
        holder: "process-b".into(),
        ..lease.clone()
    };
    b.release(&foreign).await.unwrap();
    assert_eq!(b.current(KEY).await.unwrap().unwrap().holder, "process-a");

    a.release(&lease).await.unwrap();
    assert_eq!(b.acquire(KEY).await.unwrap().holder, "process-b");
}

#[tokio::test]
async fn expired_lock_is_reclaimed() {
    let (db, _dir) = setup_sqlite_db().await;
    let stale = db.lock(
        LeaseConfig::default()
            .with_holder("crashed")
            .with_ttl(Some(TimeDelta::milliseconds(50))),
    );
    let fresh = db.lock(LeaseConfig::default().with_holder("process-b"));

    let old = stale.acquire(KEY).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    assert_eq!(fresh.acquire(KEY).await.unwrap().holder, "process-b");

    assert!(matches!(
        stale.extend(&old).await,
        Err(AppError::LockLost(_))
    ));
    stale.release(&old).await.unwrap();
    assert_eq!(fresh.current(KEY).await.unwrap().unwrap().holder, "process-b");
}

#[tokio::test]
async fn lock_without_ttl_never_expires() {
    let (db, _dir) = setup_sqlite_db().await;
    let forever = db.lock(LeaseConfig::default().with_holder("a").with_ttl(None));

    let lease = forever.acquire(KEY).await.unwrap();
    assert!(lease.expires_at.is_none());
    assert!(
        db.lock(LeaseConfig::default().with_holder("b"))
            .acquire(KEY)
            .await
            .is_err()
    );

    assert!(forever.force_release(KEY).await.unwrap());
    assert!(forever.current(KEY).await.unwrap().is_none());
}

#[tokio::test]
async fn job_cycles_publish_only_on_change() {
    let (db, _dir) = setup_sqlite_db().await;
    let config = JobConfig::default();
    let key = config.lock_key.clone();

    let job = ObservationJob::new(
        MockFetcher::with_responses(vec![
            Ok(String::new()),
            Ok(String::new()),
            Ok(String::new()),
        ]),
        MockParser::with_results(vec![
            Ok(all_operational()),
            Ok(all_operational()),
            Ok(one_down("Checkout")),
        ]),
        db.status_repo(),
        db.lock(LeaseConfig::default()),
        test_catalog(),
        config,
    );
    let reporter = MockReporter::new();

    assert!(matches!(
        job.run(&reporter).await,
        CycleOutcome::Published {
            first_run: true,
            ..
        }
    ));
    assert!(matches!(
        job.run(&reporter).await,
        CycleOutcome::Unchanged { .. }
    ));
    assert!(matches!(
        job.run(&reporter).await,
        CycleOutcome::Published {
            first_run: false,
            ..
        }
    ));

    let entries = db.feed_repo().recent(0).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].title, OPERATIONAL_TITLE);
    assert!(
        db.lock(LeaseConfig::default())
            .current(&key)
            .await
            .unwrap()
            .is_none()
    );
}
