use statusfeed_core::feed::OPERATIONAL_TITLE;
use statusfeed_core::job::{CycleOutcome, JobConfig};
use statusfeed_core::lock::LeaseConfig;
use statusfeed_core::observe::ObservationJob;
use statusfeed_core::testutil::{
    MockFetcher, MockParser, MockReporter, all_operational, one_down, test_catalog,
};
use statusfeed_core::traits::{ExecutionLock, FeedStore, FingerprintStore};

use crate::integration::common::setup_test_db;

#[tokio::test]
async fn cycles_against_postgres_publish_only_on_change() {
    let (db, _container) = setup_test_db().await;
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
    assert!(entries[0].title.starts_with("1 "));

    assert!(db.fingerprint_repo().load().await.unwrap().is_some());
    assert!(
        db.lock(LeaseConfig::default())
            .current(&key)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn cycle_is_skipped_while_another_process_holds_the_lock() {
    let (db, _container) = setup_test_db().await;
    let config = JobConfig::default();
    let other = db.lock(LeaseConfig::default().with_holder("other"));
    other.acquire(&config.lock_key).await.unwrap();

    let fetcher = MockFetcher::new("");
    let job = ObservationJob::new(
        fetcher.clone(),
        MockParser::new(all_operational()),
        db.status_repo(),
        db.lock(LeaseConfig::default()),
        test_catalog(),
        config,
    );

    assert!(matches!(
        job.run(&MockReporter::new()).await,
        CycleOutcome::Skipped
    ));
    assert_eq!(fetcher.calls(), 0);
    assert!(db.feed_repo().recent(0).await.unwrap().is_empty());
}
