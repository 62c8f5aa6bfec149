//! Prometheus metrics for community-service.
//!
//! Exposes content lifecycle collectors and an HTTP handler for the `/metrics` endpoint.

use actix_web::HttpResponse;
use lazy_static::lazy_static;
use prometheus::{
    register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec,
    TextEncoder,
};

lazy_static! {
    /// Content items created, segmented by kind.
    pub static ref CONTENT_CREATED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "community_content_created_total",
        "Community content items created segmented by kind",
        &["kind"]
    )
    .expect("failed to register community_content_created_total");

    /// Accepted upvotes.
    pub static ref CONTENT_UPVOTES_TOTAL: IntCounter = register_int_counter!(
        "community_content_upvotes_total",
        "Accepted upvotes on community content"
    )
    .expect("failed to register community_content_upvotes_total");

    /// Unverified to verified transitions. Repeat verifies are not counted.
    pub static ref CONTENT_VERIFIED_TOTAL: IntCounter = register_int_counter!(
        "community_content_verified_total",
        "Community content items promoted to verified"
    )
    .expect("failed to register community_content_verified_total");

    /// Deletions segmented by who performed them (author, moderator).
    pub static ref CONTENT_DELETED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "community_content_deleted_total",
        "Community content items deleted segmented by requester",
        &["by"]
    )
    .expect("failed to register community_content_deleted_total");

    /// Requests rejected by a per-caller rate limit, segmented by operation.
    pub static ref RATE_LIMITED_TOTAL: IntCounterVec = register_int_counter_vec!(
        "community_rate_limited_total",
        "Community requests rejected by rate limiting segmented by operation",
        &["operation"]
    )
    .expect("failed to register community_rate_limited_total");

    /// Collaborator failures (city_catalog, identity_provider).
    pub static ref DEPENDENCY_FAILURES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "community_dependency_failures_total",
        "Failed or timed out calls to external collaborators",
        &["dependency"]
    )
    .expect("failed to register community_dependency_failures_total");
}

/// Actix handler that renders Prometheus metrics in text format.
pub async fn serve_metrics() -> HttpResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();

    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return HttpResponse::InternalServerError().body(err.to_string());
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}
