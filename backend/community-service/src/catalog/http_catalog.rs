use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;

use super::{CatalogError, City, CityCatalog};

/// Catalog backed by the city API (`GET {base}/api/cities/{id}`).
///
/// 200 means the city exists, 404 means it does not; anything else is reported
/// as a catalog failure so callers never confuse "unknown" with "unreachable".
#[derive(Debug, Clone)]
pub struct HttpCityCatalog {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCityCatalog {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, CatalogError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CatalogError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn city_url(&self, city_id: &str) -> String {
        format!(
            "{}/api/cities/{}",
            self.base_url,
            urlencoding::encode(city_id)
        )
    }
}

#[async_trait]
impl CityCatalog for HttpCityCatalog {
    async fn exists(&self, city_id: &str) -> Result<bool, CatalogError> {
        Ok(self.get(city_id).await?.is_some())
    }

    async fn get(&self, city_id: &str) -> Result<Option<City>, CatalogError> {
        let resp = self
            .client
            .get(self.city_url(city_id))
            .send()
            .await
            .map_err(|e| CatalogError::Transport(e.to_string()))?;

        match resp.status() {
            StatusCode::OK => {
                let city = resp
                    .json::<City>()
                    .await
                    .map_err(|e| CatalogError::InvalidData(e.to_string()))?;
                Ok(Some(city))
            }
            StatusCode::NOT_FOUND => Ok(None),
            status => Err(CatalogError::UnexpectedStatus(status.as_u16())),
        }
    }

    async fn ping(&self) -> Result<(), CatalogError> {
        let resp = self
            .client
            .get(format!("{}/api/cities", self.base_url))
            .send()
            .await
            .map_err(|e| CatalogError::Transport(e.to_string()))?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(CatalogError::UnexpectedStatus(resp.status().as_u16()))
        }
    }
}
