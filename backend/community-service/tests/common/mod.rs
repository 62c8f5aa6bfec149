#![allow(dead_code)]

use actix_http::Request;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::{test, web, App};
use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use std::sync::Arc;
use std::time::Duration;

use community_service::catalog::{CatalogError, City, CityCatalog, StaticCityCatalog};
use community_service::handlers::{self, AppState};
use community_service::identity::{Claims, IdentityResolver, JwtIdentityProvider};
use community_service::models::Role;
use community_service::services::{RateLimitConfig, UpvotePolicy};
use community_service::store::ContentStore;

pub const SECRET: &str = "integration-test-secret";

/// Mints a bearer token the way the external identity provider would.
pub fn token(sub: &str, name: &str, role: Role) -> String {
    let now = chrono::Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: sub.to_string(),
        name: name.to_string(),
        role,
        exp: now + 3600,
        iat: now,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .expect("encode token")
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}

pub fn state_with(catalog: Arc<dyn CityCatalog>, policy: UpvotePolicy) -> web::Data<AppState> {
    web::Data::new(AppState::new(
        Arc::new(ContentStore::new()),
        catalog,
        Duration::from_millis(200),
        policy,
    ))
}

pub fn default_state() -> web::Data<AppState> {
    state_with(
        Arc::new(StaticCityCatalog::bundled().expect("bundled catalog")),
        UpvotePolicy::default(),
    )
}

/// Default state with per-caller rate limits switched on.
pub fn limited_state(limits: RateLimitConfig) -> web::Data<AppState> {
    web::Data::new(
        AppState::new(
            Arc::new(ContentStore::new()),
            Arc::new(StaticCityCatalog::bundled().expect("bundled catalog")),
            Duration::from_millis(200),
            UpvotePolicy::default(),
        )
        .with_rate_limits(&limits),
    )
}

pub fn identity() -> web::Data<IdentityResolver> {
    web::Data::new(IdentityResolver::new(
        Arc::new(JwtIdentityProvider::new(SECRET)),
        Duration::from_millis(200),
    ))
}

pub async fn init_app(
    state: web::Data<AppState>,
) -> impl Service<Request, Response = ServiceResponse, Error = actix_web::Error> {
    test::init_service(
        App::new()
            .app_data(state)
            .app_data(identity())
            .configure(handlers::configure),
    )
    .await
}

/// Catalog that never answers in time.
pub struct StalledCatalog;

#[async_trait]
impl CityCatalog for StalledCatalog {
    async fn exists(&self, _city_id: &str) -> Result<bool, CatalogError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(true)
    }

    async fn get(&self, _city_id: &str) -> Result<Option<City>, CatalogError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(None)
    }
}

/// Catalog whose backend is down.
pub struct BrokenCatalog;

#[async_trait]
impl CityCatalog for BrokenCatalog {
    async fn exists(&self, _city_id: &str) -> Result<bool, CatalogError> {
        Err(CatalogError::UnexpectedStatus(502))
    }

    async fn get(&self, _city_id: &str) -> Result<Option<City>, CatalogError> {
        Err(CatalogError::UnexpectedStatus(502))
    }

    async fn ping(&self) -> Result<(), CatalogError> {
        Err(CatalogError::Transport("connection refused".to_string()))
    }
}
