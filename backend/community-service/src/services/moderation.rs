/// Moderation engine
///
/// Each item is either unverified (initial) or verified (terminal). Only
/// moderators move an item across, and doing it twice is a no-op.
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::metrics::CONTENT_VERIFIED_TOTAL;
use crate::models::{Actor, ContentId, ContentItem};
use crate::store::{ContentStore, Mutation};

pub struct ModerationEngine {
    store: Arc<ContentStore>,
}

impl ModerationEngine {
    pub fn new(store: Arc<ContentStore>) -> Self {
        Self { store }
    }

    /// Mark an item as verified.
    ///
    /// Returns the current state unchanged if it was already verified; the
    /// version, counters and metrics only move on the first transition.
    pub fn verify(&self, id: ContentId, actor: &Actor) -> Result<ContentItem> {
        const OP: &str = "verify_content";

        if !actor.role.can_moderate() {
            tracing::warn!(
                content_id = %id,
                actor_id = %actor.log_id(),
                role = %actor.role,
                "Verify rejected: moderator role required"
            );
            return Err(AppError::unauthorized(OP, "moderator role required"));
        }

        let (item, transitioned) = self
            .store
            .update(id, |item, _| {
                if item.verified {
                    return Mutation::Unchanged((item.clone(), false));
                }
                item.verified = true;
                item.version += 1;
                Mutation::changed((item.clone(), true))
            })?
            .ok_or(AppError::NotFound { operation: OP, id })?;

        if transitioned {
            CONTENT_VERIFIED_TOTAL.inc();
            tracing::info!(
                content_id = %id,
                city_id = %item.city_id,
                author_id = %item.author_id,
                moderator_id = %actor.log_id(),
                "Moderation: content verified"
            );
        } else {
            tracing::debug!(content_id = %id, "Verify on already verified content");
        }

        Ok(item)
    }

    /// The moderation queue: every unverified item across all cities, oldest
    /// first (ties by id).
    ///
    /// Each call takes a fresh snapshot of the store; iterate it as often as
    /// needed by calling again.
    pub fn pending(&self) -> std::vec::IntoIter<ContentItem> {
        let mut items = self.store.select(|item| !item.verified);
        items.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        items.into_iter()
    }

    /// Moderation queue as exposed to callers; moderators only.
    pub fn list_pending(&self, actor: &Actor) -> Result<Vec<ContentItem>> {
        if !actor.role.can_moderate() {
            return Err(AppError::unauthorized(
                "list_pending",
                "moderator role required",
            ));
        }
        Ok(self.pending().collect())
    }
}
