/// Content service - create, read, upvote and delete community contributions
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use super::CityGuard;
use crate::error::{AppError, Result};
use crate::metrics::{CONTENT_CREATED_TOTAL, CONTENT_DELETED_TOTAL, CONTENT_UPVOTES_TOTAL};
use crate::models::{Actor, ContentBody, ContentId, ContentItem, ContentKind, Role};
use crate::store::{ContentStore, Mutation, NewContent, RemoveOutcome};

/// Whether one actor may upvote the same item more than once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpvoteMode {
    AllowRepeat,
    OnePerActor,
}

impl FromStr for UpvoteMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "allow-repeat" => Ok(UpvoteMode::AllowRepeat),
            "one-per-actor" => Ok(UpvoteMode::OnePerActor),
            other => Err(format!(
                "unknown upvote policy '{}', expected allow-repeat or one-per-actor",
                other
            )),
        }
    }
}

impl fmt::Display for UpvoteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpvoteMode::AllowRepeat => f.write_str("allow-repeat"),
            UpvoteMode::OnePerActor => f.write_str("one-per-actor"),
        }
    }
}

/// Deployment policy for upvotes. The default mirrors open community voting:
/// anyone, any number of times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpvotePolicy {
    pub mode: UpvoteMode,
    pub allow_anonymous: bool,
}

impl Default for UpvotePolicy {
    fn default() -> Self {
        Self {
            mode: UpvoteMode::AllowRepeat,
            allow_anonymous: true,
        }
    }
}

/// A submission as received from the transport layer.
#[derive(Debug, Clone)]
pub struct NewContentRequest {
    pub city_id: String,
    pub kind: ContentKind,
    pub body: ContentBody,
}

pub struct ContentService {
    store: Arc<ContentStore>,
    cities: CityGuard,
    upvotes: UpvotePolicy,
}

impl ContentService {
    pub fn new(store: Arc<ContentStore>, cities: CityGuard, upvotes: UpvotePolicy) -> Self {
        Self {
            store,
            cities,
            upvotes,
        }
    }

    pub fn upvote_policy(&self) -> UpvotePolicy {
        self.upvotes
    }

    /// Id under which `actor` may submit content. Only members and
    /// moderators with an identity qualify.
    pub fn contributor_id(&self, operation: &'static str, actor: &Actor) -> Result<String> {
        match (&actor.id, actor.role.can_contribute()) {
            (Some(id), true) => Ok(id.clone()),
            _ => Err(AppError::unauthorized(
                operation,
                "only members and moderators may submit content",
            )),
        }
    }

    /// Create a new contribution on behalf of `actor`.
    ///
    /// Checks run in order: contributor role, city existence, body validity.
    /// Nothing is persisted unless all three pass.
    pub async fn create(&self, actor: &Actor, req: NewContentRequest) -> Result<ContentItem> {
        const OP: &str = "create_content";

        let author_id = self.contributor_id(OP, actor)?;

        self.cities.ensure_exists(OP, &req.city_id).await?;

        req.body
            .validate_for(req.kind)
            .map_err(|reason| AppError::invalid_content(OP, reason))?;

        let item = self.store.insert(NewContent {
            city_id: req.city_id,
            kind: req.kind,
            author_id,
            author_display_name: actor.display_name.clone(),
            body: normalize_body(req.body),
        })?;

        CONTENT_CREATED_TOTAL
            .with_label_values(&[item.kind.as_str()])
            .inc();
        tracing::info!(
            content_id = %item.id,
            city_id = %item.city_id,
            kind = %item.kind,
            actor_id = %actor.log_id(),
            "Content created"
        );

        Ok(item)
    }

    pub fn get(&self, id: ContentId) -> Result<ContentItem> {
        self.store.get(id).ok_or(AppError::NotFound {
            operation: "get_content",
            id,
        })
    }

    /// Add one upvote.
    ///
    /// The increment and the voter bookkeeping happen under the item lock, so
    /// concurrent upvotes are all counted and a racing delete either sees the
    /// incremented item or makes this call fail with `NotFound`.
    pub fn upvote(&self, id: ContentId, actor: &Actor) -> Result<ContentItem> {
        const OP: &str = "upvote_content";

        let voter = match (&actor.id, actor.is_anonymous()) {
            (Some(id), false) => Some(id.clone()),
            _ if self.upvotes.allow_anonymous && self.upvotes.mode == UpvoteMode::AllowRepeat => {
                None
            }
            _ => return Err(AppError::unauthorized(OP, "anonymous upvotes are disabled")),
        };
        let one_per_actor = self.upvotes.mode == UpvoteMode::OnePerActor;

        let outcome = self.store.update(id, |item, voters| {
            if one_per_actor {
                // voter is always Some here: anonymous callers were rejected above.
                if let Some(voter) = &voter {
                    if voters.contains(voter) {
                        return Mutation::Unchanged(Err(AppError::DuplicateVote {
                            operation: OP,
                            id,
                        }));
                    }
                }
            }
            item.upvote_count += 1;
            item.version += 1;
            Mutation::Changed {
                value: Ok(item.clone()),
                voter: if one_per_actor { voter.clone() } else { None },
            }
        })?;

        let item = outcome.ok_or(AppError::NotFound { operation: OP, id })??;

        CONTENT_UPVOTES_TOTAL.inc();
        tracing::debug!(
            content_id = %id,
            upvotes = item.upvote_count,
            actor_id = %actor.log_id(),
            "Content upvoted"
        );

        Ok(item)
    }

    /// Hard-delete an item. Allowed for its author and for moderators;
    /// actors without a contributing role never qualify as the author.
    pub fn delete(&self, id: ContentId, actor: &Actor) -> Result<()> {
        const OP: &str = "delete_content";

        let is_moderator = actor.role == Role::Moderator;
        let may_write = actor.role.can_contribute();
        let is_author =
            |item: &ContentItem| may_write && actor.id.as_deref() == Some(item.author_id.as_str());
        let outcome = self
            .store
            .remove_if(id, |item| is_moderator || is_author(item))?;

        match outcome {
            RemoveOutcome::Removed(item) => {
                let by_author = is_author(&item);
                let by = if by_author { "author" } else { "moderator" };
                CONTENT_DELETED_TOTAL.with_label_values(&[by]).inc();

                if by_author {
                    tracing::info!(
                        content_id = %id,
                        city_id = %item.city_id,
                        actor_id = %actor.log_id(),
                        "Content deleted by author"
                    );
                } else {
                    tracing::info!(
                        content_id = %id,
                        city_id = %item.city_id,
                        author_id = %item.author_id,
                        moderator_id = %actor.log_id(),
                        "Moderation: content deleted"
                    );
                }
                Ok(())
            }
            RemoveOutcome::Denied(_) => {
                tracing::warn!(
                    content_id = %id,
                    actor_id = %actor.log_id(),
                    role = %actor.role,
                    "Delete rejected: not author or moderator"
                );
                Err(AppError::unauthorized(
                    OP,
                    "only the author or a moderator may delete content",
                ))
            }
            RemoveOutcome::Missing => Err(AppError::NotFound { operation: OP, id }),
        }
    }
}

fn normalize_body(body: ContentBody) -> ContentBody {
    match body {
        ContentBody::Text { text } => ContentBody::Text {
            text: text.trim().to_string(),
        },
        ContentBody::Photo { url, caption } => ContentBody::Photo {
            url: url.trim().to_string(),
            caption: caption
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StaticCityCatalog;
    use std::time::Duration;

    fn service_with(policy: UpvotePolicy) -> ContentService {
        let catalog = Arc::new(StaticCityCatalog::bundled().unwrap());
        ContentService::new(
            Arc::new(ContentStore::new()),
            CityGuard::new(catalog, Duration::from_secs(1)),
            policy,
        )
    }

    fn service() -> ContentService {
        service_with(UpvotePolicy::default())
    }

    fn tip(city: &str, text: &str) -> NewContentRequest {
        NewContentRequest {
            city_id: city.to_string(),
            kind: ContentKind::Tip,
            body: ContentBody::Text {
                text: text.to_string(),
            },
        }
    }

    #[tokio::test]
    async fn anonymous_cannot_create() {
        let svc = service();
        let err = svc
            .create(&Actor::anonymous(), tip("porto", "hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized { .. }));
    }

    #[tokio::test]
    async fn unknown_city_is_rejected_before_persisting() {
        let svc = service();
        let err = svc
            .create(&Actor::member("u1", "Jana S."), tip("atlantis", "hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnknownCity { ref city_id, .. } if city_id == "atlantis"));
        assert!(svc.store.is_empty());
    }

    #[tokio::test]
    async fn empty_tip_is_invalid() {
        let svc = service();
        let err = svc
            .create(&Actor::member("u1", "Jana S."), tip("porto", "  "))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidContent { .. }));
        assert!(svc.store.is_empty());
    }

    #[tokio::test]
    async fn create_trims_and_attributes_to_actor() {
        let svc = service();
        let item = svc
            .create(
                &Actor::moderator("mod-1", "Eva"),
                tip("rome", "  Validate on board  "),
            )
            .await
            .unwrap();
        assert_eq!(item.author_id, "mod-1");
        assert_eq!(item.author_display_name, "Eva");
        assert_eq!(
            item.body,
            ContentBody::Text {
                text: "Validate on board".to_string()
            }
        );
    }

    #[tokio::test]
    async fn repeat_upvotes_count_by_default() {
        let svc = service();
        let member = Actor::member("u1", "Martin K.");
        let item = svc.create(&member, tip("bratislava", "tip")).await.unwrap();

        for _ in 0..3 {
            svc.upvote(item.id, &member).unwrap();
        }
        let updated = svc.upvote(item.id, &Actor::anonymous()).unwrap();
        assert_eq!(updated.upvote_count, 4);
        assert_eq!(updated.version, 5);
    }

    #[tokio::test]
    async fn one_per_actor_rejects_duplicates_and_anonymous() {
        let svc = service_with(UpvotePolicy {
            mode: UpvoteMode::OnePerActor,
            allow_anonymous: true,
        });
        let member = Actor::member("u1", "Martin K.");
        let item = svc.create(&member, tip("bratislava", "tip")).await.unwrap();

        svc.upvote(item.id, &member).unwrap();
        assert!(matches!(
            svc.upvote(item.id, &member),
            Err(AppError::DuplicateVote { .. })
        ));
        assert!(matches!(
            svc.upvote(item.id, &Actor::anonymous()),
            Err(AppError::Unauthorized { .. })
        ));
        svc.upvote(item.id, &Actor::member("u2", "Jana S.")).unwrap();
        assert_eq!(svc.get(item.id).unwrap().upvote_count, 2);
    }

    #[tokio::test]
    async fn anonymous_upvotes_can_be_disabled() {
        let svc = service_with(UpvotePolicy {
            mode: UpvoteMode::AllowRepeat,
            allow_anonymous: false,
        });
        let member = Actor::member("u1", "Martin K.");
        let item = svc.create(&member, tip("porto", "tip")).await.unwrap();
        assert!(svc.upvote(item.id, &Actor::anonymous()).is_err());
        assert_eq!(svc.upvote(item.id, &member).unwrap().upvote_count, 1);
    }

    #[tokio::test]
    async fn upvote_missing_is_not_found() {
        let svc = service();
        assert!(matches!(
            svc.upvote(ContentId(404), &Actor::anonymous()),
            Err(AppError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn delete_authorization() {
        let svc = service();
        let author = Actor::member("u1", "Martin K.");
        let item = svc.create(&author, tip("porto", "tip")).await.unwrap();

        let err = svc
            .delete(item.id, &Actor::member("u2", "Jana S."))
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized { .. }));
        assert!(svc.get(item.id).is_ok());

        assert!(svc.delete(item.id, &Actor::anonymous()).is_err());

        svc.delete(item.id, &Actor::moderator("mod-1", "Eva")).unwrap();
        assert!(matches!(
            svc.delete(item.id, &author),
            Err(AppError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn anonymous_role_cannot_delete_even_with_matching_subject() {
        let svc = service();
        let author = Actor::member("u1", "Martin K.");
        let item = svc.create(&author, tip("porto", "tip")).await.unwrap();

        let impostor = Actor {
            id: Some("u1".to_string()),
            display_name: "Martin K.".to_string(),
            role: Role::Anonymous,
        };
        let err = svc.delete(item.id, &impostor).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized { .. }));
        assert!(svc.get(item.id).is_ok());
    }

    #[test]
    fn upvote_mode_parses_kebab_case() {
        assert_eq!("one-per-actor".parse(), Ok(UpvoteMode::OnePerActor));
        assert_eq!("allow-repeat".parse(), Ok(UpvoteMode::AllowRepeat));
        assert!("once".parse::<UpvoteMode>().is_err());
    }
}
