//! Change history stored next to the documents.
//!
//! Layout: `{root}/.history/{document key}/changes.json`, one history entry
//! per key. Writes are plain blocking file I/O without locking; callers that
//! may save the same key concurrently have to serialize themselves.

use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::{
    client::TIMESTAMP_FORMAT,
    error::{Error, Result},
    models::{Callback, Change, History, User},
};

pub const HISTORY_DIR: &str = ".history";
pub const CHANGES_FILE: &str = "changes.json";

/// A stored history entry as read back from disk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryVersion {
    /// Name of the directory the entry was read from.
    pub version: String,
    pub key: String,
    pub created: Option<NaiveDateTime>,
    pub user: Option<User>,
    pub changes: Vec<Change>,
}

#[derive(Debug, Clone)]
pub struct HistoryRecorder {
    root: PathBuf,
}

impl HistoryRecorder {
    pub fn new(storage_root: impl Into<PathBuf>) -> Self {
        Self {
            root: storage_root.into(),
        }
    }

    pub fn history_dir(&self) -> PathBuf {
        self.root.join(HISTORY_DIR)
    }

    /// Writes the callback's history for its key, replacing any earlier
    /// record for the same key.
    #[tracing::instrument(skip(self, callback), fields(key = %callback.key))]
    pub fn record(&self, callback: &Callback) -> Result<PathBuf> {
        validate_key(&callback.key)?;

        let dir = self.history_dir().join(&callback.key);
        fs::create_dir_all(&dir)?;

        let path = dir.join(CHANGES_FILE);
        let data = serde_json::to_vec_pretty(&callback.history)?;
        fs::write(&path, data)?;

        tracing::debug!(path = %path.display(), "history recorded");
        Ok(path)
    }

    /// Every stored version, sorted by version label. `filename` is not used
    /// for filtering: all documents under the root are returned.
    pub fn list(&self, filename: &str) -> Result<Vec<HistoryVersion>> {
        let dir = self.history_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        tracing::debug!(filename, "listing history");
        let mut versions = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let version = entry.file_name().to_string_lossy().into_owned();
            if let Some(history) = read_history(&entry.path()) {
                versions.push(HistoryVersion {
                    version,
                    key: history.key,
                    created: NaiveDateTime::parse_from_str(&history.created, TIMESTAMP_FORMAT).ok(),
                    user: history.user,
                    changes: history.changes,
                });
            }
        }

        versions.sort_by(|a, b| a.version.cmp(&b.version));
        Ok(versions)
    }

    pub fn count(&self) -> usize {
        let Ok(entries) = fs::read_dir(self.history_dir()) else {
            return 0;
        };

        entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
            .count()
    }
}

/// Keys become directory names, so they must be a single path component.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::Validation("document key is empty".to_string()));
    }
    if key == "." || key == ".." || key.contains(['/', '\\']) {
        return Err(Error::Validation(format!("invalid document key '{key}'")));
    }
    Ok(())
}

// Unreadable or malformed entries are skipped.
fn read_history(dir: &Path) -> Option<History> {
    let path = dir.join(CHANGES_FILE);
    let data = fs::read(&path).ok()?;
    match serde_json::from_slice(&data) {
        Ok(history) => Some(history),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "skipping malformed history entry");
            None
        }
    }
}
