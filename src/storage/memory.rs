use super::{Storage, StorageIdentity, StorageKind};
use crate::error::StorageError;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// An in-memory storage area.
///
/// Each instance is its own area; entries vanish with the value.
pub struct MemoryStorage {
    identity: StorageIdentity,
    kind: StorageKind,
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    /// A session-scoped area.
    pub fn new() -> Self {
        Self::with_kind(StorageKind::Session)
    }

    /// An area reporting the given lifetime class.
    pub fn with_kind(kind: StorageKind) -> Self {
        Self {
            identity: StorageIdentity::unique(),
            kind,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn identity(&self) -> StorageIdentity {
        self.identity
    }

    fn kind(&self) -> StorageKind {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get() {
        let storage = MemoryStorage::new();
        assert!(storage.is_empty());
        assert_eq!(storage.get_item("theme"), None);

        storage.set_item("theme", "\"dark\"").unwrap();
        assert_eq!(storage.get_item("theme").as_deref(), Some("\"dark\""));
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn every_instance_is_its_own_area() {
        let a = MemoryStorage::new();
        let b = MemoryStorage::with_kind(StorageKind::Durable);
        assert_ne!(a.identity().area, b.identity().area);
        assert_eq!(a.kind(), StorageKind::Session);
        assert_eq!(b.kind(), StorageKind::Durable);
    }
}
