use statusfeed_core::AppError;
use statusfeed_core::catalog::CatalogFile;
use statusfeed_core::models::StatusKind;

use crate::integration::common::setup_test_db;

fn catalog_file() -> CatalogFile {
    CatalogFile {
        services: vec!["Storefront".into(), "Admin".into(), "Checkout".into()],
        statuses: vec![
            StatusKind::new("Operational", "text-green", false),
            StatusKind::new("Degraded performance", "text-yellow", true),
            StatusKind::new("Major outage", "text-red", true),
        ],
    }
}

#[tokio::test]
async fn empty_catalog_fails_to_load() {
    let (db, _container) = setup_test_db().await;
    let err = db.catalog_repo().load().await.unwrap_err();
    assert!(matches!(err, AppError::CatalogError(_)));
}

#[tokio::test]
async fn seed_then_load() {
    let (db, _container) = setup_test_db().await;
    let repo = db.catalog_repo();

    let summary = repo.seed(&catalog_file()).await.unwrap();
    assert_eq!(summary.services, 3);
    assert_eq!(summary.statuses, 3);

    let catalog = repo.load().await.unwrap();
    let names: Vec<&str> = catalog.services().iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Admin", "Checkout", "Storefront"]);

    let tokens: Vec<&str> = catalog.statuses().iter().map(|s| s.token.as_str()).collect();
    assert_eq!(tokens, vec!["text-green", "text-yellow", "text-red"]);
    assert!(catalog.statuses()[2].is_error);
}

#[tokio::test]
async fn seed_is_idempotent() {
    let (db, _container) = setup_test_db().await;
    let repo = db.catalog_repo();

    repo.seed(&catalog_file()).await.unwrap();
    let again = repo.seed(&catalog_file()).await.unwrap();
    assert_eq!(again.services, 0);
    assert_eq!(again.statuses, 0);

    assert_eq!(repo.load().await.unwrap().service_count(), 3);
}

#[tokio::test]
async fn seed_rejects_invalid_file() {
    let (db, _container) = setup_test_db().await;
    let mut file = catalog_file();
    file.services.push("Admin".into());

    assert!(db.catalog_repo().seed(&file).await.is_err());
    assert!(db.catalog_repo().load().await.is_err());
}
