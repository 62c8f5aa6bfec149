/// Error types for Community Service
///
/// Every variant is terminal for the request that raised it and carries the
/// operation plus the content id or city id involved. Errors are converted to
/// JSON HTTP responses for API clients.
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};

use crate::models::ContentId;

/// Result type for community-service operations
pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{operation}: unknown city '{city_id}'")]
    UnknownCity {
        operation: &'static str,
        city_id: String,
    },

    #[error("{operation}: content {id} not found")]
    NotFound {
        operation: &'static str,
        id: ContentId,
    },

    #[error("{operation}: {reason}")]
    Unauthorized {
        operation: &'static str,
        reason: String,
    },

    #[error("{operation}: '{path}' does not name a content item")]
    MalformedId {
        operation: &'static str,
        path: String,
    },

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("{operation}: invalid content: {reason}")]
    InvalidContent {
        operation: &'static str,
        reason: String,
    },

    #[error("{operation}: actor already upvoted content {id}")]
    DuplicateVote {
        operation: &'static str,
        id: ContentId,
    },

    #[error("{operation}: rate limit exceeded, retry in {retry_after_secs}s")]
    RateLimited {
        operation: &'static str,
        retry_after_secs: u64,
    },

    #[error("{operation}: {dependency} unavailable: {message}")]
    DependencyUnavailable {
        operation: &'static str,
        dependency: &'static str,
        message: String,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn unauthorized(operation: &'static str, reason: impl Into<String>) -> Self {
        AppError::Unauthorized {
            operation,
            reason: reason.into(),
        }
    }

    pub fn invalid_content(operation: &'static str, reason: impl Into<String>) -> Self {
        AppError::InvalidContent {
            operation,
            reason: reason.into(),
        }
    }

    /// Stable machine-readable code returned to clients.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::UnknownCity { .. } => "UNKNOWN_CITY",
            AppError::NotFound { .. } | AppError::MalformedId { .. } => "NOT_FOUND",
            AppError::Unauthorized { .. } => "UNAUTHORIZED",
            AppError::InvalidCredentials(_) => "INVALID_CREDENTIALS",
            AppError::InvalidContent { .. } => "INVALID_CONTENT",
            AppError::DuplicateVote { .. } => "DUPLICATE_VOTE",
            AppError::RateLimited { .. } => "RATE_LIMITED",
            AppError::DependencyUnavailable { .. } => "DEPENDENCY_UNAVAILABLE",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::UnknownCity { .. }
            | AppError::NotFound { .. }
            | AppError::MalformedId { .. } => StatusCode::NOT_FOUND,
            AppError::Unauthorized { .. } => StatusCode::FORBIDDEN,
            AppError::InvalidCredentials(_) => StatusCode::UNAUTHORIZED,
            AppError::InvalidContent { .. } => StatusCode::BAD_REQUEST,
            AppError::DuplicateVote { .. } => StatusCode::CONFLICT,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::DependencyUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = match self {
            AppError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let mut builder = HttpResponse::build(status);
        if let AppError::RateLimited { retry_after_secs, .. } = self {
            builder.insert_header(("Retry-After", retry_after_secs.to_string()));
        }

        builder.json(serde_json::json!({
            "error": {
                "code": self.code(),
                "message": message,
            },
            "status": status.as_u16(),
        }))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}
