//! Durable storage persisted to a JSON file.

use super::{Storage, StorageIdentity, StorageKind};
use crate::error::StorageError;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use tracing::trace;

/// Get the storage directory for an application
///
/// Uses platform-specific conventions:
/// - Linux: `$XDG_CONFIG_HOME/<app>/store` or `~/.config/<app>/store`
/// - macOS: `~/Library/Application Support/<app>/store`
/// - Windows: `%APPDATA%\<app>\store`
pub fn storage_dir(qualifier: &str, organization: &str, application: &str) -> PathBuf {
    directories::ProjectDirs::from(qualifier, organization, application)
        .map(|dirs| dirs.config_local_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
        .join("store")
}

/// A durable storage area backed by a single JSON file.
///
/// The file holds one flat object mapping keys to their serialized values.
/// Entries are loaded once on open and every [`set_item`](Storage::set_item)
/// rewrites the whole file before returning.
pub struct FileStorage {
    path: PathBuf,
    identity: StorageIdentity,
    entries: RwLock<HashMap<String, String>>,
}

impl FileStorage {
    /// Open the file at `path`.
    ///
    /// A missing or empty file is an empty area.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not hold a JSON
    /// object of strings.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let entries = load(&path)?;
        trace!(path = %path.display(), entries = entries.len(), "opened storage file");

        Ok(Self {
            path,
            identity: StorageIdentity::unique(),
            entries: RwLock::new(entries),
        })
    }

    /// Open `local.json` in the platform storage directory of an application.
    pub fn for_app(
        qualifier: &str,
        organization: &str,
        application: &str,
    ) -> Result<Self, StorageError> {
        Self::open(storage_dir(qualifier, organization, application).join("local.json"))
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn load(path: &Path) -> Result<HashMap<String, String>, StorageError> {
    if !path.exists() {
        return Ok(HashMap::new());
    }

    let contents = fs::read_to_string(path).map_err(|source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    if contents.trim().is_empty() {
        return Ok(HashMap::new());
    }

    serde_json::from_str(&contents).map_err(|source| StorageError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

fn save(path: &Path, entries: &HashMap<String, String>) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| StorageError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let contents = serde_json::to_string_pretty(entries).map_err(|source| StorageError::Encode {
        path: path.to_path_buf(),
        source,
    })?;

    fs::write(path, contents).map_err(|source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    })
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);

        // Another handle may have written other keys since we loaded
        let mut merged = load(&self.path)?;
        merged.insert(key.to_owned(), value.to_owned());
        save(&self.path, &merged)?;
        *entries = merged;

        trace!(path = %self.path.display(), key, "wrote storage file");
        Ok(())
    }

    fn identity(&self) -> StorageIdentity {
        self.identity
    }

    fn kind(&self) -> StorageKind {
        StorageKind::Durable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path().join("local.json")).unwrap();
        assert_eq!(storage.get_item("settings"), None);
        assert_eq!(storage.kind(), StorageKind::Durable);
    }

    #[test]
    fn writes_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("local.json");

        let storage = FileStorage::open(&path).unwrap();
        storage.set_item("theme", "\"dark\"").unwrap();
        assert!(path.exists());

        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(reopened.get_item("theme").as_deref(), Some("\"dark\""));
    }

    #[test]
    fn handles_on_one_file_keep_each_others_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("local.json");

        let first = FileStorage::open(&path).unwrap();
        let second = FileStorage::open(&path).unwrap();
        first.set_item("theme", "\"dark\"").unwrap();
        second.set_item("user", "null").unwrap();

        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(reopened.get_item("theme").as_deref(), Some("\"dark\""));
        assert_eq!(reopened.get_item("user").as_deref(), Some("null"));
        assert_eq!(second.get_item("theme").as_deref(), Some("\"dark\""));
    }

    #[test]
    fn corrupt_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("local.json");
        fs::write(&path, "not json").unwrap();

        let err = FileStorage::open(&path).err().unwrap();
        assert!(matches!(err, StorageError::Corrupt { .. }));
    }

    #[test]
    fn failed_write_leaves_memory_untouched() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be makes every write fail
        let path = dir.path().join("local.json");
        fs::create_dir(&path).unwrap();

        let storage = FileStorage {
            path,
            identity: StorageIdentity::unique(),
            entries: RwLock::new(HashMap::new()),
        };

        let err = storage.set_item("theme", "\"dark\"").err().unwrap();
        assert!(matches!(err, StorageError::Io { .. }));
        assert_eq!(storage.get_item("theme"), None);
    }

    #[test]
    fn storage_dir_ends_in_store() {
        let dir = storage_dir("com", "example", "stashed");
        assert!(dir.ends_with("store"));
    }
}
