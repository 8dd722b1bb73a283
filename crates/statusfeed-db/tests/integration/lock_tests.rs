use chrono::TimeDelta;
use statusfeed_core::AppError;
use statusfeed_core::lock::LeaseConfig;
use statusfeed_core::traits::ExecutionLock;

use crate::integration::common::setup_test_db;

const KEY: &str = "check-status";

fn config(holder: &str) -> LeaseConfig {
    LeaseConfig::default().with_holder(holder)
}

#[tokio::test]
async fn concurrent_acquire_has_one_winner() {
    let (db, _container) = setup_test_db().await;
    let a = db.lock(config("process-a"));
    let b = db.lock(config("process-b"));

    let (ra, rb) = tokio::join!(a.acquire(KEY), b.acquire(KEY));

    let wins = [&ra, &rb].iter().filter(|r| r.is_ok()).count();
    assert_eq!(wins, 1);
    let loser = if ra.is_ok() { rb } else { ra };
    assert!(matches!(loser, Err(AppError::LockHeld(ref k)) if k == KEY));
}

#[tokio::test]
async fn release_makes_key_available() {
    let (db, _container) = setup_test_db().await;
    let a = db.lock(config("process-a"));
    let b = db.lock(config("process-b"));

    let lease = a.acquire(KEY).await.unwrap();
    assert_eq!(lease.holder, "process-a");
    assert!(lease.expires_at.is_some());
    assert!(b.acquire(KEY).await.is_err());

    a.release(&lease).await.unwrap();
    let lease = b.acquire(KEY).await.unwrap();
    assert_eq!(lease.holder, "process-b");
}

#[tokio::test]
async fn release_without_record_is_ok() {
    let (db, _container) = setup_test_db().await;
    let lock = db.lock(config("process-a"));
    let lease = lock.acquire(KEY).await.unwrap();
    lock.release(&lease).await.unwrap();
    lock.release(&lease).await.unwrap();
}

#[tokio::test]
async fn stale_release_leaves_new_holder_in_place() {
    let (db, _container) = setup_test_db().await;
    let stale = db.lock(config("process-a").with_ttl(Some(TimeDelta::milliseconds(50))));
    let fresh = db.lock(config("process-b"));

    let old = stale.acquire(KEY).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    fresh.acquire(KEY).await.unwrap();

    // The first holder finishes late and releases its lease.
    stale.release(&old).await.unwrap();

    let current = fresh.current(KEY).await.unwrap().unwrap();
    assert_eq!(current.holder, "process-b");
    assert!(matches!(
        db.lock(config("process-c")).acquire(KEY).await,
        Err(AppError::LockHeld(_))
    ));
}

#[tokio::test]
async fn force_release_removes_any_holder() {
    let (db, _container) = setup_test_db().await;
    db.lock(config("crashed").with_ttl(None))
        .acquire(KEY)
        .await
        .unwrap();

    let operator = db.lock(config("operator"));
    assert!(operator.force_release(KEY).await.unwrap());
    assert!(!operator.force_release(KEY).await.unwrap());
    assert!(operator.current(KEY).await.unwrap().is_none());
    assert!(operator.acquire(KEY).await.is_ok());
}

#[tokio::test]
async fn expired_lease_is_reclaimed() {
    let (db, _container) = setup_test_db().await;
    let stale = db.lock(config("crashed").with_ttl(Some(TimeDelta::milliseconds(50))));
    let fresh = db.lock(config("process-b"));

    let old = stale.acquire(KEY).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    let lease = fresh.acquire(KEY).await.unwrap();
    assert_eq!(lease.holder, "process-b");

    // The old holder must not be able to renew after losing the record.
    let err = stale.extend(&old).await.unwrap_err();
    assert!(matches!(err, AppError::LockLost(_)));
}

#[tokio::test]
async fn lease_without_ttl_never_expires() {
    let (db, _container) = setup_test_db().await;
    let forever = db.lock(config("process-a").with_ttl(None));
    let other = db.lock(config("process-b"));

    let lease = forever.acquire(KEY).await.unwrap();
    assert!(lease.expires_at.is_none());
    assert!(matches!(
        other.acquire(KEY).await,
        Err(AppError::LockHeld(_))
    ));

    let current = other.current(KEY).await.unwrap().unwrap();
    assert_eq!(current.holder, "process-a");
}

#[tokio::test]
async fn extend_pushes_deadline_forward() {
    let (db, _container) = setup_test_db().await;
    let lock = db.lock(config("process-a"));

    let lease = lock.acquire(KEY).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    let renewed = lock.extend(&lease).await.unwrap();

    assert_eq!(renewed.holder, lease.holder);
    assert!(renewed.expires_at.unwrap() > lease.expires_at.unwrap());
}
