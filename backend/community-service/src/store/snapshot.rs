/// Durable JSON snapshots of the content store.
///
/// A snapshot holds every item, its voter set and the id high-water mark.
/// Files are written to a sibling temp path, synced and renamed into place, so
/// a crash mid-write leaves the previous snapshot intact. Mutations between
/// snapshots live in the journal next to it (`<snapshot>.journal`).
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::broadcast;

use super::journal::{read_records, Journal};
use super::{ContentStore, StoredContent};
use crate::error::Result;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub next_id: u64,
    pub items: Vec<StoredContent>,
}

/// Loads a snapshot if one exists at `path`.
pub fn load_snapshot(path: &Path) -> Result<Option<StoreSnapshot>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(path)?;
    let snapshot = serde_json::from_str(&raw)?;
    Ok(Some(snapshot))
}

/// Writes the current store state to `path` atomically.
pub async fn save_snapshot(store: &ContentStore, path: &Path) -> Result<usize> {
    let snapshot = store.export();
    let count = snapshot.items.len();
    let bytes = serde_json::to_vec(&snapshot)?;

    let tmp = sibling_path(path, ".tmp");
    let mut file = tokio::fs::File::create(&tmp).await?;
    file.write_all(&bytes).await?;
    file.sync_all().await?;
    drop(file);

    tokio::fs::rename(&tmp, path).await?;
    sync_parent_dir(path).await?;
    Ok(count)
}

#[cfg(unix)]
async fn sync_parent_dir(path: &Path) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    tokio::fs::File::open(dir).await?.sync_all().await?;
    Ok(())
}

#[cfg(not(unix))]
async fn sync_parent_dir(_path: &Path) -> Result<()> {
    Ok(())
}

/// Journal file that accompanies the snapshot at `path`.
pub fn journal_path(path: &Path) -> PathBuf {
    sibling_path(path, ".journal")
}

/// Opens the durable store: last snapshot, then every journaled mutation
/// since, with the journal attached for new writes.
pub fn open_store(path: &Path) -> Result<ContentStore> {
    let store = match load_snapshot(path)? {
        Some(snapshot) => ContentStore::from_snapshot(snapshot),
        None => ContentStore::new(),
    };

    let journal_path = journal_path(path);
    let records = read_records(&journal_path)?;
    let replayed = records.len();
    for record in records {
        store.replay(record);
    }

    let store = store.with_journal(Journal::open(journal_path)?);
    tracing::info!(
        items = store.len(),
        replayed,
        path = %path.display(),
        "Content store opened"
    );
    Ok(store)
}

/// Folds the journal into a fresh snapshot.
///
/// The live journal is rotated first, so every record in the rotated file is
/// already applied in memory and covered by the snapshot that follows. The
/// rotated file is only removed once that snapshot is durable.
pub async fn checkpoint(store: &ContentStore, path: &Path) -> Result<usize> {
    if let Some(journal) = store.journal() {
        journal.rotate()?;
    }
    let count = save_snapshot(store, path).await?;
    if let Some(journal) = store.journal() {
        journal.discard_rotated()?;
    }
    Ok(count)
}

fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

/// Background task that checkpoints the store on an interval and once more on
/// shutdown.
pub struct SnapshotWriter {
    store: Arc<ContentStore>,
    path: PathBuf,
    interval: Duration,
}

impl SnapshotWriter {
    pub fn new(store: Arc<ContentStore>, path: PathBuf, interval: Duration) -> Self {
        Self {
            store,
            path,
            interval,
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        let mut ticker = tokio::time::interval(self.interval);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.flush().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!(path = %self.path.display(), "Writing final content snapshot");
                    checkpoint(&self.store, &self.path).await?;
                    return Ok(());
                }
            }
        }
    }

    async fn flush(&self) {
        match checkpoint(&self.store, &self.path).await {
            Ok(count) => {
                tracing::debug!(
                    items = count,
                    path = %self.path.display(),
                    "Content snapshot written"
                );
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    path = %self.path.display(),
                    "Content snapshot failed"
                );
            }
        }
    }
}
