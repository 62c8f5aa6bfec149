/// Identity Provider collaborator
///
/// Turns request credentials into an [`Actor`]. Token issuance lives outside
/// this service; here we only validate bearer tokens signed with the shared
/// secret and read the subject, display name and role out of the claims.
use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use async_trait::async_trait;
use futures::future::LocalBoxFuture;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::error::AppError;
use crate::metrics::DEPENDENCY_FAILURES_TOTAL;
use crate::models::{Actor, Role};

/// Claims carried by community access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    /// Display name shown next to contributions
    pub name: String,
    pub role: Role,
    pub exp: usize,
    pub iat: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolves a bearer token. `None` means the caller sent no credentials.
    async fn resolve(&self, bearer: Option<&str>) -> Result<Actor, IdentityError>;
}

/// HS256 bearer-token validation against a shared secret.
pub struct JwtIdentityProvider {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtIdentityProvider {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn resolve(&self, bearer: Option<&str>) -> Result<Actor, IdentityError> {
        let Some(token) = bearer else {
            return Ok(Actor::anonymous());
        };

        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| IdentityError::InvalidToken(e.to_string()))?
            .claims;

        if claims.sub.trim().is_empty() {
            return Err(IdentityError::InvalidToken("empty subject".to_string()));
        }

        Ok(Actor {
            id: Some(claims.sub),
            display_name: claims.name,
            role: claims.role,
        })
    }
}

/// Request-facing wrapper that bounds provider calls with a timeout and maps
/// failures onto [`AppError`].
#[derive(Clone)]
pub struct IdentityResolver {
    provider: Arc<dyn IdentityProvider>,
    timeout: Duration,
}

impl IdentityResolver {
    pub fn new(provider: Arc<dyn IdentityProvider>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    pub async fn resolve_request(&self, req: &HttpRequest) -> Result<Actor, AppError> {
        let bearer = bearer_token(req)?;
        self.resolve(bearer.as_deref()).await
    }

    pub async fn resolve(&self, bearer: Option<&str>) -> Result<Actor, AppError> {
        match tokio::time::timeout(self.timeout, self.provider.resolve(bearer)).await {
            Ok(Ok(actor)) => Ok(actor),
            Ok(Err(IdentityError::InvalidToken(reason))) => {
                Err(AppError::InvalidCredentials(reason))
            }
            Ok(Err(IdentityError::Unavailable(message))) => {
                DEPENDENCY_FAILURES_TOTAL
                    .with_label_values(&["identity_provider"])
                    .inc();
                Err(AppError::DependencyUnavailable {
                    operation: "resolve_actor",
                    dependency: "identity_provider",
                    message,
                })
            }
            Err(_) => {
                DEPENDENCY_FAILURES_TOTAL
                    .with_label_values(&["identity_provider"])
                    .inc();
                Err(AppError::DependencyUnavailable {
                    operation: "resolve_actor",
                    dependency: "identity_provider",
                    message: format!("timed out after {:?}", self.timeout),
                })
            }
        }
    }
}

fn bearer_token(req: &HttpRequest) -> Result<Option<String>, AppError> {
    let Some(header) = req.headers().get("Authorization") else {
        return Ok(None);
    };

    let value = header
        .to_str()
        .map_err(|_| AppError::InvalidCredentials("malformed Authorization header".into()))?;

    value
        .strip_prefix("Bearer ")
        .map(|t| Some(t.trim().to_string()))
        .ok_or_else(|| AppError::InvalidCredentials("invalid Authorization scheme".into()))
}

impl FromRequest for Actor {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            let resolver = req
                .app_data::<web::Data<IdentityResolver>>()
                .cloned()
                .ok_or_else(|| AppError::Internal("identity resolver not configured".into()))?;
            resolver.resolve_request(&req).await
        })
    }
}
