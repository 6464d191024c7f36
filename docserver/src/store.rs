use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{Mutex, MutexGuard, PoisonError},
};

use serde::Serialize;

/// Index of documents saved from callbacks, keyed by document key.
#[derive(Debug, Default)]
pub struct SavedFiles {
    files: Mutex<HashMap<String, PathBuf>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavedFile {
    pub key: String,
    pub path: PathBuf,
}

impl SavedFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the path previously stored for `key`, if any.
    pub fn insert(&self, key: impl Into<String>, path: PathBuf) -> Option<PathBuf> {
        self.lock().insert(key.into(), path)
    }

    /// Snapshot sorted by key.
    pub fn list(&self) -> Vec<SavedFile> {
        let files = self.lock();
        let mut saved: Vec<_> = files
            .iter()
            .map(|(key, path)| SavedFile {
                key: key.clone(),
                path: path.clone(),
            })
            .collect();
        saved.sort_by(|a, b| a.key.cmp(&b.key));
        saved
    }

    // The map holds no invariant a panicked writer could break.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, PathBuf>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
