/// Content Store
///
/// Authoritative in-memory collection of content items. Items live in a sharded
/// map so writers on different ids do not contend; every mutation of one item
/// runs while holding that item's shard lock, which makes upvote, verify and
/// delete on the same id serialize. Ids come from a monotonic counter and are
/// never handed out twice, deleted or not.
///
/// With a journal attached, a mutation is applied in memory only after its
/// record is synced, so nothing a caller has seen succeed is lost on a crash.
pub mod journal;
pub mod snapshot;

pub use journal::{Journal, JournalRecord};
pub use snapshot::{
    checkpoint, load_snapshot, open_store, save_snapshot, SnapshotWriter, StoreSnapshot,
};

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::Result;
use crate::models::{ContentBody, ContentId, ContentItem, ContentKind};

/// An item plus the per-item bookkeeping that must change atomically with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredContent {
    pub item: ContentItem,
    /// Actors that have upvoted; only consulted under the one-per-actor policy.
    #[serde(default)]
    pub voters: HashSet<String>,
}

/// Validated input for a new item.
#[derive(Debug, Clone)]
pub struct NewContent {
    pub city_id: String,
    pub kind: ContentKind,
    pub author_id: String,
    pub author_display_name: String,
    pub body: ContentBody,
}

/// What an [`ContentStore::update`] closure did to the item it was handed.
#[derive(Debug)]
pub enum Mutation<R> {
    /// Nothing to persist; the draft is discarded.
    Unchanged(R),
    /// The draft becomes the new item state. `voter` joins the voter set.
    Changed { value: R, voter: Option<String> },
}

impl<R> Mutation<R> {
    pub fn changed(value: R) -> Self {
        Mutation::Changed { value, voter: None }
    }
}

/// Result of a conditional removal.
#[derive(Debug)]
pub enum RemoveOutcome {
    Removed(ContentItem),
    Denied(ContentItem),
    Missing,
}

#[derive(Debug)]
pub struct ContentStore {
    items: DashMap<ContentId, StoredContent>,
    next_id: AtomicU64,
    journal: Option<Journal>,
}

impl Default for ContentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentStore {
    pub fn new() -> Self {
        Self {
            items: DashMap::new(),
            next_id: AtomicU64::new(1),
            journal: None,
        }
    }

    /// Rebuilds a store from a persisted snapshot.
    ///
    /// The allocator resumes past both the saved high-water mark and every
    /// restored id, so a snapshot taken mid-create cannot cause reuse.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let max_id = snapshot
            .items
            .iter()
            .map(|s| s.item.id.0)
            .max()
            .unwrap_or(0);
        let next_id = snapshot.next_id.max(max_id + 1).max(1);

        let items = DashMap::with_capacity(snapshot.items.len());
        for stored in snapshot.items {
            items.insert(stored.item.id, stored);
        }

        Self {
            items,
            next_id: AtomicU64::new(next_id),
            journal: None,
        }
    }

    /// Routes every later mutation through `journal`.
    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn journal(&self) -> Option<&Journal> {
        self.journal.as_ref()
    }

    /// Re-applies a journal record during recovery.
    ///
    /// An upsert never replaces a newer version of the item, and every id a
    /// record mentions moves the allocator past it, removed or not.
    pub fn replay(&self, record: JournalRecord) {
        self.next_id.fetch_max(record.id().0 + 1, Ordering::SeqCst);

        match record {
            JournalRecord::Upserted { item, voter } => {
                let mut entry = self.items.entry(item.id).or_insert_with(|| StoredContent {
                    item: item.clone(),
                    voters: HashSet::new(),
                });
                if item.version >= entry.item.version {
                    entry.item = item;
                }
                if let Some(voter) = voter {
                    entry.voters.insert(voter);
                }
            }
            JournalRecord::Removed { id } => {
                self.items.remove(&id);
            }
        }
    }

    /// Captures every item and the id high-water mark.
    pub fn export(&self) -> StoreSnapshot {
        // Read the counter first; restore takes the max with restored ids anyway.
        let next_id = self.next_id.load(Ordering::SeqCst);
        let items = self.items.iter().map(|e| e.value().clone()).collect();
        StoreSnapshot { next_id, items }
    }

    fn allocate_id(&self) -> ContentId {
        ContentId(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn log(&self, record: &JournalRecord) -> Result<()> {
        match &self.journal {
            Some(journal) => journal.append(record),
            None => Ok(()),
        }
    }

    /// Persists a new unverified item with zero upvotes.
    pub fn insert(&self, draft: NewContent) -> Result<ContentItem> {
        let item = ContentItem {
            id: self.allocate_id(),
            city_id: draft.city_id,
            kind: draft.kind,
            author_id: draft.author_id,
            author_display_name: draft.author_display_name,
            created_at: Utc::now(),
            body: draft.body,
            upvote_count: 0,
            verified: false,
            version: 1,
        };

        self.log(&JournalRecord::Upserted {
            item: item.clone(),
            voter: None,
        })?;
        self.items.insert(
            item.id,
            StoredContent {
                item: item.clone(),
                voters: HashSet::new(),
            },
        );
        Ok(item)
    }

    pub fn get(&self, id: ContentId) -> Option<ContentItem> {
        self.items.get(&id).map(|e| e.item.clone())
    }

    /// Runs `f` against a draft of one item while holding its shard lock.
    ///
    /// A [`Mutation::Changed`] draft is journaled and then installed; an
    /// unchanged one is dropped. Returns `Ok(None)` when the id does not exist
    /// (never created or deleted).
    pub fn update<F, R>(&self, id: ContentId, f: F) -> Result<Option<R>>
    where
        F: FnOnce(&mut ContentItem, &HashSet<String>) -> Mutation<R>,
    {
        let Some(mut entry) = self.items.get_mut(&id) else {
            return Ok(None);
        };
        let stored = entry.value_mut();
        let mut draft = stored.item.clone();

        match f(&mut draft, &stored.voters) {
            Mutation::Unchanged(value) => Ok(Some(value)),
            Mutation::Changed { value, voter } => {
                self.log(&JournalRecord::Upserted {
                    item: draft.clone(),
                    voter: voter.clone(),
                })?;
                if let Some(voter) = voter {
                    stored.voters.insert(voter);
                }
                stored.item = draft;
                Ok(Some(value))
            }
        }
    }

    /// Removes an item if `allow` approves it, atomically with respect to
    /// other writers on the same id.
    pub fn remove_if<F>(&self, id: ContentId, allow: F) -> Result<RemoveOutcome>
    where
        F: FnOnce(&ContentItem) -> bool,
    {
        match self.items.entry(id) {
            Entry::Occupied(entry) => {
                if allow(&entry.get().item) {
                    self.log(&JournalRecord::Removed { id })?;
                    Ok(RemoveOutcome::Removed(entry.remove().item))
                } else {
                    Ok(RemoveOutcome::Denied(entry.get().item.clone()))
                }
            }
            Entry::Vacant(_) => Ok(RemoveOutcome::Missing),
        }
    }

    /// Clones every item matching `pred`. Each item is copied under its own
    /// lock, so no half-applied mutation is ever returned.
    pub fn select<P>(&self, pred: P) -> Vec<ContentItem>
    where
        P: Fn(&ContentItem) -> bool,
    {
        self.items
            .iter()
            .filter(|e| pred(&e.item))
            .map(|e| e.item.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
