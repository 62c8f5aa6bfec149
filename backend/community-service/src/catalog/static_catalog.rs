use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;

use super::{CatalogError, City, CityCatalog};

const BUNDLED_CITIES: &str = include_str!("../../data/cities.json");

/// In-process catalog loaded once from a JSON array of cities.
#[derive(Debug, Clone, Default)]
pub struct StaticCityCatalog {
    cities: HashMap<String, City>,
}

impl StaticCityCatalog {
    pub fn new(cities: impl IntoIterator<Item = City>) -> Self {
        Self {
            cities: cities.into_iter().map(|c| (c.id.clone(), c)).collect(),
        }
    }

    /// The cities shipped with the service.
    pub fn bundled() -> Result<Self, CatalogError> {
        Self::from_json_str(BUNDLED_CITIES)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, CatalogError> {
        let cities: Vec<City> =
            serde_json::from_str(raw).map_err(|e| CatalogError::InvalidData(e.to_string()))?;
        Ok(Self::new(cities))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            CatalogError::InvalidData(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&raw)
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }
}

#[async_trait]
impl CityCatalog for StaticCityCatalog {
    async fn exists(&self, city_id: &str) -> Result<bool, CatalogError> {
        Ok(self.cities.contains_key(city_id))
    }

    async fn get(&self, city_id: &str) -> Result<Option<City>, CatalogError> {
        Ok(self.cities.get(city_id).cloned())
    }
}
