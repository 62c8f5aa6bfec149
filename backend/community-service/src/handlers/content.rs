/// Content handlers - HTTP endpoints for community contributions
use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::AppState;
use crate::error::{AppError, Result};
use crate::models::{Actor, ContentBody, ContentId, ContentKind};
use crate::services::{ContentFilter, NewContentRequest};

/// Request body for submitting a contribution.
///
/// `type` and `content` are accepted as aliases for `kind` and `text`.
#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct CreateContentRequest {
    #[serde(alias = "type")]
    pub kind: ContentKind,
    #[serde(default, alias = "content")]
    #[validate(length(max = 2000))]
    pub text: Option<String>,
    /// URL returned by the blob store for an uploaded photo
    #[serde(default)]
    #[validate(url)]
    pub media_url: Option<String>,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub caption: Option<String>,
}

impl CreateContentRequest {
    fn into_body(self) -> std::result::Result<ContentBody, String> {
        if self.kind.is_text() {
            if self.media_url.is_some() {
                return Err(format!("{} does not accept a media url", self.kind));
            }
            Ok(ContentBody::Text {
                text: self.text.unwrap_or_default(),
            })
        } else {
            Ok(ContentBody::Photo {
                url: self.media_url.unwrap_or_default(),
                caption: self.caption,
            })
        }
    }
}

/// Query parameters for a city feed.
#[derive(Debug, Default, Deserialize)]
pub struct ListContentParams {
    #[serde(default, alias = "type")]
    pub kind: Option<ContentKind>,
    #[serde(default)]
    pub verified: Option<bool>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
}

impl From<ListContentParams> for ContentFilter {
    fn from(params: ListContentParams) -> Self {
        ContentFilter {
            kind: params.kind,
            verified: params.verified,
            limit: params.limit,
            offset: params.offset.unwrap_or(0),
        }
    }
}

/// Submit a tip, warning or photo for a city
/// POST /api/v1/cities/{city_id}/content
pub async fn create_content(
    state: web::Data<AppState>,
    city_id: web::Path<String>,
    actor: Actor,
    http: HttpRequest,
    req: web::Json<CreateContentRequest>,
) -> Result<HttpResponse> {
    const OP: &str = "create_content";

    state.limits.create.check(&caller_key(&actor, &http))?;
    // Role is settled before the body is judged.
    state.contents.contributor_id(OP, &actor)?;

    let req = req.into_inner();
    req.validate()
        .map_err(|e| AppError::invalid_content(OP, e.to_string()))?;

    let kind = req.kind;
    let body = req
        .into_body()
        .map_err(|reason| AppError::invalid_content(OP, reason))?;

    let item = state
        .contents
        .create(
            &actor,
            NewContentRequest {
                city_id: city_id.into_inner(),
                kind,
                body,
            },
        )
        .await?;

    Ok(HttpResponse::Created().json(item))
}

/// List contributions for a city, newest first
/// GET /api/v1/cities/{city_id}/content?type=warning
pub async fn list_content(
    state: web::Data<AppState>,
    city_id: web::Path<String>,
    query: web::Query<ListContentParams>,
) -> Result<HttpResponse> {
    let filter = ContentFilter::from(query.into_inner());
    let items = state.queries.list_by_city(&city_id, &filter).await?;
    Ok(HttpResponse::Ok().json(items))
}

/// GET /api/v1/content/{content_id}
pub async fn get_content(
    state: web::Data<AppState>,
    content_id: web::Path<u64>,
) -> Result<HttpResponse> {
    let item = state.contents.get(ContentId(content_id.into_inner()))?;
    Ok(HttpResponse::Ok().json(item))
}

/// POST /api/v1/content/{content_id}/upvote
pub async fn upvote_content(
    state: web::Data<AppState>,
    content_id: web::Path<u64>,
    actor: Actor,
    http: HttpRequest,
) -> Result<HttpResponse> {
    state.limits.upvote.check(&caller_key(&actor, &http))?;
    let item = state.contents.upvote(ContentId(content_id.into_inner()), &actor)?;
    Ok(HttpResponse::Ok().json(item))
}

/// DELETE /api/v1/content/{content_id}
pub async fn delete_content(
    state: web::Data<AppState>,
    content_id: web::Path<u64>,
    actor: Actor,
) -> Result<HttpResponse> {
    state.contents.delete(ContentId(content_id.into_inner()), &actor)?;
    Ok(HttpResponse::NoContent().finish())
}

/// Rate-limit bucket for a caller: the actor id when known, else the client address.
fn caller_key(actor: &Actor, http: &HttpRequest) -> String {
    match &actor.id {
        Some(id) => format!("actor:{}", id),
        None => {
            let info = http.connection_info();
            format!("ip:{}", info.realip_remote_addr().unwrap_or("unknown"))
        }
    }
}
