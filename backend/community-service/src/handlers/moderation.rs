/// Moderation handlers - moderator-only endpoints
use actix_web::{web, HttpResponse};

use super::AppState;
use crate::error::Result;
use crate::models::{Actor, ContentId};

/// Mark a contribution as verified
/// POST /api/v1/admin/content/{content_id}/verify
pub async fn verify_content(
    state: web::Data<AppState>,
    content_id: web::Path<u64>,
    actor: Actor,
) -> Result<HttpResponse> {
    let item = state
        .moderation
        .verify(ContentId(content_id.into_inner()), &actor)?;
    Ok(HttpResponse::Ok().json(item))
}

/// Moderation queue, oldest first
/// GET /api/v1/admin/pending
pub async fn list_pending(state: web::Data<AppState>, actor: Actor) -> Result<HttpResponse> {
    let items = state.queries.list_pending(&actor)?;
    Ok(HttpResponse::Ok().json(items))
}
