/// HTTP handlers for community-service
///
/// - content: submit, list, read, upvote and delete contributions
/// - moderation: verify contributions and read the moderation queue
/// - health: liveness and readiness checks
pub mod content;
pub mod health;
pub mod moderation;

pub use content::{create_content, delete_content, get_content, list_content, upvote_content};
pub use health::{health_summary, liveness_check, readiness_summary};
pub use moderation::{list_pending, verify_content};

use actix_web::web;
use std::sync::Arc;
use std::time::Duration;

use crate::catalog::CityCatalog;
use crate::error::AppError;
use crate::services::{
    CityGuard, ContentQuery, ContentService, ModerationEngine, RateLimitConfig, RateLimits,
    UpvotePolicy,
};
use crate::store::ContentStore;

/// Shared services handed to every handler.
pub struct AppState {
    pub contents: Arc<ContentService>,
    pub moderation: Arc<ModerationEngine>,
    pub queries: Arc<ContentQuery>,
    pub cities: CityGuard,
    pub store: Arc<ContentStore>,
    pub limits: Arc<RateLimits>,
}

impl AppState {
    pub fn new(
        store: Arc<ContentStore>,
        catalog: Arc<dyn CityCatalog>,
        dependency_timeout: Duration,
        upvotes: UpvotePolicy,
    ) -> Self {
        let cities = CityGuard::new(catalog, dependency_timeout);
        let moderation = Arc::new(ModerationEngine::new(store.clone()));
        let contents = Arc::new(ContentService::new(store.clone(), cities.clone(), upvotes));
        let queries = Arc::new(ContentQuery::new(
            store.clone(),
            cities.clone(),
            moderation.clone(),
        ));

        Self {
            contents,
            moderation,
            queries,
            cities,
            store,
            limits: Arc::new(RateLimits::default()),
        }
    }

    /// Enables per-caller limits on create and upvote.
    pub fn with_rate_limits(mut self, config: &RateLimitConfig) -> Self {
        self.limits = Arc::new(RateLimits::new(config));
        self
    }
}

/// Registers every community route. Expects `web::Data<AppState>` and
/// `web::Data<IdentityResolver>` in app data.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(query_config())
        .app_data(path_config())
        .route("/api/v1/health", web::get().to(health_summary))
        .route("/api/v1/health/ready", web::get().to(readiness_summary))
        .route("/api/v1/health/live", web::get().to(liveness_check))
        .service(
            web::scope("/api/v1")
                .service(
                    web::resource("/cities/{city_id}/content")
                        .route(web::get().to(list_content))
                        .route(web::post().to(create_content)),
                )
                .service(
                    web::resource("/content/{content_id}")
                        .route(web::get().to(get_content))
                        .route(web::delete().to(delete_content)),
                )
                .route(
                    "/content/{content_id}/upvote",
                    web::post().to(upvote_content),
                )
                .service(
                    web::scope("/admin")
                        .route(
                            "/content/{content_id}/verify",
                            web::post().to(verify_content),
                        )
                        .route("/pending", web::get().to(list_pending)),
                ),
        );
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(64 * 1024)
        .error_handler(|err, _req| {
            AppError::invalid_content("decode_request", err.to_string()).into()
        })
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        AppError::invalid_content("decode_query", err.to_string()).into()
    })
}

fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|_err, req| {
        AppError::MalformedId {
            operation: "resolve_path",
            path: req.path().to_string(),
        }
        .into()
    })
}
