/// Community Service Library
///
/// Community contributions for the Transit Guide: tips, warnings and photos
/// attached to catalog cities, counted by upvotes and promoted to verified by
/// moderators.
///
/// # Modules
///
/// - `handlers`: HTTP request handlers and route registration
/// - `models`: content items and actors
/// - `services`: content lifecycle, moderation engine, query layer
/// - `store`: sharded in-memory content store and JSON snapshots
/// - `catalog`: City Catalog collaborator (bundled, file or HTTP)
/// - `identity`: Identity Provider collaborator and the `Actor` extractor
/// - `error`: error types and HTTP mapping
/// - `config`: configuration management
/// - `metrics`: Prometheus collectors
pub mod catalog;
pub mod config;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod metrics;
pub mod models;
pub mod services;
pub mod store;

pub use config::Config;
pub use error::{AppError, Result};
pub use handlers::AppState;
