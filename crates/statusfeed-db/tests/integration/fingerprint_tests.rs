use statusfeed_core::traits::FingerprintStore;

use crate::integration::common::{pg_pool, setup_test_db};

#[tokio::test]
async fn load_is_none_before_first_run() {
    let (db, _container) = setup_test_db().await;
    assert!(db.fingerprint_repo().load().await.unwrap().is_none());
}

#[tokio::test]
async fn create_then_update_keeps_single_row() {
    let (db, _container) = setup_test_db().await;
    let repo = db.fingerprint_repo();

    let created = repo.create(&"a".repeat(64)).await.unwrap();
    assert_eq!(created.digest, "a".repeat(64));

    let updated = repo.update(&"b".repeat(64)).await.unwrap();
    assert_eq!(updated.digest, "b".repeat(64));
    assert!(updated.updated_at >= created.updated_at);

    let loaded = repo.load().await.unwrap().unwrap();
    assert_eq!(loaded.digest, "b".repeat(64));

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM last_status")
        .fetch_one(pg_pool(&db))
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn second_create_is_rejected() {
    let (db, _container) = setup_test_db().await;
    let repo = db.fingerprint_repo();

    repo.create("first").await.unwrap();
    assert!(repo.create("second").await.is_err());
    assert_eq!(repo.load().await.unwrap().unwrap().digest, "first");
}

#[tokio::test]
async fn update_without_record_fails() {
    let (db, _container) = setup_test_db().await;
    assert!(db.fingerprint_repo().update("digest").await.is_err());
}

#[tokio::test]
async fn singleton_constraint_rejects_other_ids() {
    let (db, _container) = setup_test_db().await;
    let result = sqlx::query("INSERT INTO last_status (id, digest) VALUES (2, 'x')")
        .execute(pg_pool(&db))
        .await;
    assert!(result.is_err());
}
