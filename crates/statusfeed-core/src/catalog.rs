use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::{Service, StatusKind};

/// The fixed reference set of services and status kinds a status page is
/// checked against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    services: Vec<Service>,
    statuses: Vec<StatusKind>,
}

impl Catalog {
    /// Build a catalog, rejecting empty or ambiguous contents.
    ///
    /// Status tokens must be unique since the parser picks the first kind
    /// whose token matches an indicator.
    pub fn new(services: Vec<Service>, statuses: Vec<StatusKind>) -> Result<Self, AppError> {
        if services.is_empty() {
            return Err(AppError::CatalogError("catalog has no services".into()));
        }
        if statuses.is_empty() {
            return Err(AppError::CatalogError("catalog has no status kinds".into()));
        }

        let mut seen = HashSet::new();
        for service in &services {
            if service.name.trim().is_empty() {
                return Err(AppError::CatalogError("service name is empty".into()));
            }
            if !seen.insert(service.name.as_str()) {
                return Err(AppError::CatalogError(format!(
                    "duplicate service '{}'",
                    service.name
                )));
            }
        }

        let mut names = HashSet::new();
        let mut tokens = HashSet::new();
        for status in &statuses {
            if status.token.trim().is_empty() {
                return Err(AppError::CatalogError(format!(
                    "status '{}' has an empty token",
                    status.name
                )));
            }
            if !names.insert(status.name.as_str()) {
                return Err(AppError::CatalogError(format!(
                    "duplicate status '{}'",
                    status.name
                )));
            }
            if !tokens.insert(status.token.as_str()) {
                return Err(AppError::CatalogError(format!(
                    "duplicate status token '{}'",
                    status.token
                )));
            }
        }

        Ok(Self { services, statuses })
    }

    /// Load a catalog from a JSON file shaped like [`CatalogFile`].
    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        CatalogFile::load(path)?.into_catalog()
    }

    pub fn services(&self) -> &[Service] {
        &self.services
    }

    pub fn statuses(&self) -> &[StatusKind] {
        &self.statuses
    }

    pub fn service_count(&self) -> usize {
        self.services.len()
    }

    pub fn service(&self, name: &str) -> Option<&Service> {
        self.services.iter().find(|s| s.name == name)
    }
}

/// On-disk representation of a catalog, used for seeding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogFile {
    pub services: Vec<String>,
    pub statuses: Vec<StatusKind>,
}

impl CatalogFile {
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::CatalogError(format!(
                "Failed to read catalog file {}: {e}",
                path.display()
            ))
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn into_catalog(self) -> Result<Catalog, AppError> {
        Catalog::new(
            self.services.into_iter().map(Service::new).collect(),
            self.statuses,
        )
    }
}
