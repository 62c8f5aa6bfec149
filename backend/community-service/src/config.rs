/// Configuration management for Community Service
///
/// Loaded from environment variables (a `.env` file is honoured in development).
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::services::{RateLimitConfig, UpvoteMode, UpvotePolicy};

const DEV_JWT_SECRET: &str = "development-secret-change-in-production";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub cors: CorsConfig,
    pub auth: AuthConfig,
    pub catalog: CatalogConfig,
    pub upvotes: UpvotePolicy,
    pub rate_limits: RateLimitConfig,
    pub persistence: PersistenceConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
    pub host: String,
    pub port: u16,
    /// Emit JSON log lines instead of human-readable ones
    pub json_logs: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Comma-separated list of allowed origins
    pub allowed_origins: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HS256 secret shared with the identity provider
    #[serde(skip_serializing)]
    pub jwt_secret: String,
}

/// Where city existence checks are answered from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum CatalogSource {
    Bundled,
    File { path: PathBuf },
    Http { base_url: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub source: CatalogSource,
    /// Upper bound on any single collaborator call (catalog or identity)
    pub dependency_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// JSON snapshot file; `None` keeps content in memory only
    pub snapshot_path: Option<PathBuf>,
    pub snapshot_interval_secs: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        dotenvy::dotenv().ok();

        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let production = app_env.eq_ignore_ascii_case("production");

        Ok(Config {
            app: AppConfig {
                env: app_env.clone(),
                host: std::env::var("COMMUNITY_SERVICE_HOST")
                    .unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or_default("COMMUNITY_SERVICE_PORT", 8085)?,
                json_logs: std::env::var("LOG_FORMAT")
                    .map(|v| v.eq_ignore_ascii_case("json"))
                    .unwrap_or(false),
            },
            cors: {
                let allowed_origins = match std::env::var("CORS_ALLOWED_ORIGINS") {
                    Ok(value) => value,
                    Err(_) if production => {
                        return Err("CORS_ALLOWED_ORIGINS must be set in production".to_string())
                    }
                    Err(_) => "http://localhost:3000".to_string(),
                };

                if production && allowed_origins.trim() == "*" {
                    return Err("CORS_ALLOWED_ORIGINS cannot be '*' in production".to_string());
                }

                CorsConfig { allowed_origins }
            },
            auth: {
                let jwt_secret =
                    std::env::var("JWT_SECRET").unwrap_or_else(|_| DEV_JWT_SECRET.to_string());
                if production && (jwt_secret.trim().is_empty() || jwt_secret == DEV_JWT_SECRET) {
                    return Err(
                        "JWT_SECRET must be set to a non-default value in production".to_string(),
                    );
                }
                AuthConfig { jwt_secret }
            },
            catalog: CatalogConfig {
                source: match (
                    std::env::var("CITY_CATALOG_URL").ok(),
                    std::env::var("CITY_CATALOG_PATH").ok(),
                ) {
                    (Some(base_url), _) => CatalogSource::Http { base_url },
                    (None, Some(path)) => CatalogSource::File {
                        path: PathBuf::from(path),
                    },
                    (None, None) => CatalogSource::Bundled,
                },
                dependency_timeout_ms: parse_env_or_default("DEPENDENCY_TIMEOUT_MS", 2_000)?,
            },
            upvotes: UpvotePolicy {
                mode: match std::env::var("UPVOTE_POLICY") {
                    Ok(raw) => raw.parse::<UpvoteMode>()?,
                    Err(_) => UpvoteMode::AllowRepeat,
                },
                allow_anonymous: parse_env_or_default("UPVOTE_ALLOW_ANONYMOUS", true)?,
            },
            rate_limits: RateLimitConfig {
                creates_per_minute: parse_env_or_default("RATE_LIMIT_CREATES_PER_MINUTE", 10)?,
                upvotes_per_minute: parse_env_or_default("RATE_LIMIT_UPVOTES_PER_MINUTE", 60)?,
            },
            persistence: PersistenceConfig {
                snapshot_path: std::env::var("CONTENT_SNAPSHOT_PATH")
                    .ok()
                    .filter(|p| !p.trim().is_empty())
                    .map(PathBuf::from),
                snapshot_interval_secs: parse_env_or_default(
                    "CONTENT_SNAPSHOT_INTERVAL_SECS",
                    30,
                )?,
            },
        })
    }
}

fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(val) => val
            .trim()
            .parse()
            .map_err(|e| format!("Failed to parse {}='{}': {}", key, val, e)),
        Err(_) => Ok(default),
    }
}
