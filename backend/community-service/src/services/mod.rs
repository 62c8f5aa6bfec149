/// Business logic layer for community-service
///
/// - `content`: create, read, upvote and delete contributions
/// - `moderation`: verification state machine and moderation queue
/// - `query`: read-only filtered views per city
/// - `rate_limit`: per-caller limits on submissions and upvotes
pub mod content;
pub mod moderation;
pub mod query;
pub mod rate_limit;

pub use content::{ContentService, NewContentRequest, UpvoteMode, UpvotePolicy};
pub use moderation::ModerationEngine;
pub use query::{ContentFilter, ContentQuery};
pub use rate_limit::{ActionLimiter, RateLimitConfig, RateLimits};

use std::sync::Arc;
use std::time::Duration;

use crate::catalog::CityCatalog;
use crate::error::{AppError, Result};
use crate::metrics::DEPENDENCY_FAILURES_TOTAL;

/// City Catalog access with a bounded wait.
///
/// A catalog that cannot answer yields `DependencyUnavailable`, never
/// `UnknownCity`, and the lookup is not retried.
#[derive(Clone)]
pub struct CityGuard {
    catalog: Arc<dyn CityCatalog>,
    timeout: Duration,
}

impl CityGuard {
    pub fn new(catalog: Arc<dyn CityCatalog>, timeout: Duration) -> Self {
        Self { catalog, timeout }
    }

    pub async fn ensure_exists(&self, operation: &'static str, city_id: &str) -> Result<()> {
        match tokio::time::timeout(self.timeout, self.catalog.exists(city_id)).await {
            Ok(Ok(true)) => Ok(()),
            Ok(Ok(false)) => Err(AppError::UnknownCity {
                operation,
                city_id: city_id.to_string(),
            }),
            Ok(Err(e)) => Err(self.unavailable(operation, e.to_string())),
            Err(_) => Err(self.unavailable(operation, self.timed_out())),
        }
    }

    pub async fn ping(&self) -> Result<()> {
        match tokio::time::timeout(self.timeout, self.catalog.ping()).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(self.unavailable("readiness", e.to_string())),
            Err(_) => Err(self.unavailable("readiness", self.timed_out())),
        }
    }

    fn timed_out(&self) -> String {
        format!("timed out after {:?}", self.timeout)
    }

    fn unavailable(&self, operation: &'static str, message: String) -> AppError {
        DEPENDENCY_FAILURES_TOTAL
            .with_label_values(&["city_catalog"])
            .inc();
        tracing::warn!(operation, error = %message, "City catalog lookup failed");
        AppError::DependencyUnavailable {
            operation,
            dependency: "city_catalog",
            message,
        }
    }
}
