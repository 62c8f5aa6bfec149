/// Write-ahead journal for the content store.
///
/// Every accepted mutation is appended as one JSON line and synced to disk
/// before the caller sees it succeed. Records carry the full item state after
/// the mutation, so replaying them is idempotent; a record never overwrites a
/// newer version of the same item.
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::error::{AppError, Result};
use crate::models::{ContentId, ContentItem};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum JournalRecord {
    /// Item state after a create, upvote or verify.
    Upserted {
        item: ContentItem,
        /// Actor added to the voter set by this mutation.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        voter: Option<String>,
    },
    Removed { id: ContentId },
}

impl JournalRecord {
    pub fn id(&self) -> ContentId {
        match self {
            JournalRecord::Upserted { item, .. } => item.id,
            JournalRecord::Removed { id } => *id,
        }
    }
}

#[derive(Debug)]
pub struct Journal {
    path: PathBuf,
    rotated: PathBuf,
    file: Mutex<File>,
}

impl Journal {
    /// Opens the live journal for appending, dropping a torn tail left by a
    /// crash mid-append.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        repair_tail(&path)?;
        let file = open_append(&path)?;
        Ok(Self {
            rotated: rotated_path(&path),
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one record and syncs it. On failure the file is cut back to
    /// its previous length so later appends stay line-aligned.
    pub fn append(&self, record: &JournalRecord) -> Result<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut file = self.lock()?;
        let len = file.metadata()?.len();
        let written = file.write_all(&line).and_then(|_| file.sync_data());
        if let Err(e) = written {
            let _ = file.set_len(len);
            return Err(e.into());
        }
        Ok(())
    }

    /// Moves the live journal aside so a snapshot can cover it.
    ///
    /// If a rotated file is still present (an earlier checkpoint did not
    /// finish) it is left alone and the live journal keeps growing; the next
    /// snapshot covers both.
    pub fn rotate(&self) -> Result<()> {
        let mut file = self.lock()?;
        if self.rotated.exists() {
            return Ok(());
        }
        file.sync_all()?;
        std::fs::rename(&self.path, &self.rotated)?;
        *file = open_append(&self.path)?;
        Ok(())
    }

    /// Drops the rotated journal once a snapshot covering it is durable.
    pub fn discard_rotated(&self) -> Result<()> {
        let _file = self.lock()?;
        match std::fs::remove_file(&self.rotated) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, File>> {
        self.file
            .lock()
            .map_err(|_| AppError::Internal("content journal lock poisoned".to_string()))
    }
}

/// Reads the rotated journal (if a checkpoint was interrupted), then the live one.
pub fn read_records(path: &Path) -> Result<Vec<JournalRecord>> {
    let mut records = Vec::new();
    read_file(&rotated_path(path), &mut records)?;
    read_file(path, &mut records)?;
    Ok(records)
}

fn read_file(path: &Path, records: &mut Vec<JournalRecord>) -> Result<()> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    let mut lines = BufReader::new(file).lines().peekable();
    while let Some(line) = lines.next() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(&line) {
            Ok(record) => records.push(record),
            // Only the last line can be torn.
            Err(e) if lines.peek().is_none() => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping torn journal tail");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

fn repair_tail(path: &Path) -> Result<()> {
    let mut file = match OpenOptions::new().read(true).write(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    if bytes.is_empty() || bytes.ends_with(b"\n") {
        return Ok(());
    }

    let keep = bytes.iter().rposition(|b| *b == b'\n').map_or(0, |i| i + 1);
    file.set_len(keep as u64)?;
    file.sync_all()?;
    tracing::warn!(
        path = %path.display(),
        dropped_bytes = bytes.len() - keep,
        "Truncated torn journal tail"
    );
    Ok(())
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

fn rotated_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".old");
    path.with_file_name(name)
}
