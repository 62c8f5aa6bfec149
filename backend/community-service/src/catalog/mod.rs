/// City Catalog collaborator
///
/// Read-only reference data keyed by city identifier. The community core only
/// asks whether a city exists (and occasionally for its metadata); fares, zones
/// and apps stay in the catalog.
pub mod http_catalog;
pub mod static_catalog;

pub use http_catalog::HttpCityCatalog;
pub use static_catalog::StaticCityCatalog;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{CatalogConfig, CatalogSource};

/// City metadata as exposed by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    pub id: String,
    pub name: String,
    pub country: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authority: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("city catalog request failed: {0}")]
    Transport(String),

    #[error("city catalog returned unexpected status {0}")]
    UnexpectedStatus(u16),

    #[error("city catalog data invalid: {0}")]
    InvalidData(String),
}

#[async_trait]
pub trait CityCatalog: Send + Sync {
    /// Whether `city_id` resolves. Identifiers are exact-match tokens.
    async fn exists(&self, city_id: &str) -> Result<bool, CatalogError>;

    async fn get(&self, city_id: &str) -> Result<Option<City>, CatalogError>;

    /// Readiness check.
    async fn ping(&self) -> Result<(), CatalogError> {
        Ok(())
    }
}

/// Builds the catalog selected by configuration.
pub fn from_config(config: &CatalogConfig) -> Result<Arc<dyn CityCatalog>, CatalogError> {
    let catalog: Arc<dyn CityCatalog> = match &config.source {
        CatalogSource::Bundled => Arc::new(StaticCityCatalog::bundled()?),
        CatalogSource::File { path } => Arc::new(StaticCityCatalog::from_path(path)?),
        CatalogSource::Http { base_url } => Arc::new(HttpCityCatalog::new(
            base_url.clone(),
            Duration::from_millis(config.dependency_timeout_ms),
        )?),
    };
    Ok(catalog)
}
