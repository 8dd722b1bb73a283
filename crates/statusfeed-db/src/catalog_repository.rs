use statusfeed_core::catalog::{Catalog, CatalogFile};
use statusfeed_core::error::AppError;
use statusfeed_core::models::{Service, StatusKind};

use crate::pool::{DbPool, db_error};

/// Rows inserted by [`CatalogRepository::seed`]. Already-present rows are
/// not counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeedSummary {
    pub services: u64,
    pub statuses: u64,
}

/// Read access to the catalog tables, plus idempotent seeding.
#[derive(Clone)]
pub struct CatalogRepository {
    pool: DbPool,
}

const SELECT_SERVICES: &str = "SELECT name FROM services ORDER BY name";
const SELECT_STATUSES: &str = "SELECT name, token, is_error FROM status_kinds ORDER BY id";
// `ON CONFLICT DO NOTHING` without a target is valid in both engines.
const INSERT_SERVICE: &str = "INSERT INTO services (name) VALUES ($1) ON CONFLICT DO NOTHING";
const INSERT_STATUS: &str = r#"
    INSERT INTO status_kinds (name, token, is_error)
    VALUES ($1, $2, $3)
    ON CONFLICT DO NOTHING
"#;

impl CatalogRepository {
    pub fn new(pool: impl Into<DbPool>) -> Self {
        Self { pool: pool.into() }
    }

    /// Load and validate the catalog. Status kinds keep their insertion
    /// order, which decides which kind wins when an indicator carries
    /// several known tokens.
    pub async fn load(&self) -> Result<Catalog, AppError> {
        let (services, statuses) = match &self.pool {
            DbPool::Postgres(pool) => {
                let services: Vec<(String,)> = sqlx::query_as(SELECT_SERVICES)
                    .fetch_all(pool)
                    .await
                    .map_err(db_error)?;
                let statuses = sqlx::query_as::<_, StatusKindRow>(SELECT_STATUSES)
                    .fetch_all(pool)
                    .await
                    .map_err(db_error)?;
                (services, statuses)
            }
            DbPool::Sqlite(pool) => {
                let services: Vec<(String,)> = sqlx::query_as(SELECT_SERVICES)
                    .fetch_all(pool)
                    .await
                    .map_err(db_error)?;
                let statuses = sqlx::query_as::<_, StatusKindRow>(SELECT_STATUSES)
                    .fetch_all(pool)
                    .await
                    .map_err(db_error)?;
                (services, statuses)
            }
        };

        Catalog::new(
            services.into_iter().map(|(name,)| Service::new(name)).collect(),
            statuses.into_iter().map(Into::into).collect(),
        )
    }

    /// Insert every service and status kind in `file` that is not already
    /// present, in one transaction.
    pub async fn seed(&self, file: &CatalogFile) -> Result<SeedSummary, AppError> {
        // Reject files that could never form a valid catalog.
        file.clone().into_catalog()?;

        let mut summary = SeedSummary::default();

        match &self.pool {
            DbPool::Postgres(pool) => {
                let mut tx = pool.begin().await.map_err(db_error)?;
                for name in &file.services {
                    let result = sqlx::query(INSERT_SERVICE)
                        .bind(name)
                        .execute(&mut *tx)
                        .await
                        .map_err(db_error)?;
                    summary.services += result.rows_affected();
                }
                for kind in &file.statuses {
                    let result = sqlx::query(INSERT_STATUS)
                        .bind(&kind.name)
                        .bind(&kind.token)
                        .bind(kind.is_error)
                        .execute(&mut *tx)
                        .await
                        .map_err(db_error)?;
                    summary.statuses += result.rows_affected();
                }
                tx.commit().await.map_err(db_error)?;
            }
            DbPool::Sqlite(pool) => {
                let mut tx = pool.begin().await.map_err(db_error)?;
                for name in &file.services {
                    let result = sqlx::query(INSERT_SERVICE)
                        .bind(name)
                        .execute(&mut *tx)
                        .await
                        .map_err(db_error)?;
                    summary.services += result.rows_affected();
                }
                for kind in &file.statuses {
                    let result = sqlx::query(INSERT_STATUS)
                        .bind(&kind.name)
                        .bind(&kind.token)
                        .bind(kind.is_error)
                        .execute(&mut *tx)
                        .await
                        .map_err(db_error)?;
                    summary.statuses += result.rows_affected();
                }
                tx.commit().await.map_err(db_error)?;
            }
        }

        tracing::info!(
            services = summary.services,
            statuses = summary.statuses,
            "Catalog seeded"
        );
        Ok(summary)
    }
}

#[derive(sqlx::FromRow)]
struct StatusKindRow {
    name: String,
    token: String,
    is_error: bool,
}

impl From<StatusKindRow> for StatusKind {
    fn from(row: StatusKindRow) -> Self {
        StatusKind::new(row.name, row.token, row.is_error)
    }
}
