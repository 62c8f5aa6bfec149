/// Query layer - read-only filtered views over the content store
use std::sync::Arc;

use super::{CityGuard, ModerationEngine};
use crate::error::Result;
use crate::models::{Actor, ContentItem, ContentKind};
use crate::store::ContentStore;

/// Optional filters for a city feed. Kind and verification status are exact
/// matches; pagination applies after ordering.
#[derive(Debug, Clone, Default)]
pub struct ContentFilter {
    pub kind: Option<ContentKind>,
    pub verified: Option<bool>,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl ContentFilter {
    pub fn kind(kind: ContentKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    fn matches(&self, city_id: &str, item: &ContentItem) -> bool {
        item.city_id == city_id
            && self.kind.map_or(true, |k| item.kind == k)
            && self.verified.map_or(true, |v| item.verified == v)
    }
}

pub struct ContentQuery {
    store: Arc<ContentStore>,
    cities: CityGuard,
    moderation: Arc<ModerationEngine>,
}

impl ContentQuery {
    pub fn new(
        store: Arc<ContentStore>,
        cities: CityGuard,
        moderation: Arc<ModerationEngine>,
    ) -> Self {
        Self {
            store,
            cities,
            moderation,
        }
    }

    /// Contributions for one city, newest first (ties by id ascending).
    pub async fn list_by_city(
        &self,
        city_id: &str,
        filter: &ContentFilter,
    ) -> Result<Vec<ContentItem>> {
        self.cities.ensure_exists("list_content", city_id).await?;

        let mut items = self.store.select(|item| filter.matches(city_id, item));
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

        Ok(items
            .into_iter()
            .skip(filter.offset)
            .take(filter.limit.unwrap_or(usize::MAX))
            .collect())
    }

    pub fn list_pending(&self, actor: &Actor) -> Result<Vec<ContentItem>> {
        self.moderation.list_pending(actor)
    }
}
