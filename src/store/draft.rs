use super::WebStorage;
use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::ops::{Deref, DerefMut};
use tracing::warn;

/// A working copy of a store's value.
///
/// Derefs to the whole stored value, so nested fields can be edited in
/// place. If it was borrowed mutably, the entire value is written back when
/// the draft is committed or dropped, counting as a single change. Drop
/// cannot report a failed write; use [`commit`](Draft::commit) to see it.
///
/// ```
/// use stashed::storage::MemoryStorage;
/// use stashed::WebStorage;
/// use std::sync::Arc;
///
/// let store = WebStorage::builder("tags")
///     .default_value(vec!["a".to_string()])
///     .storage(Arc::new(MemoryStorage::new()))
///     .build()?;
///
/// let mut tags = store.edit()?;
/// tags.push("b".to_string());
/// tags.commit()?;
///
/// assert_eq!(store.get()?, vec!["a", "b"]);
/// # Ok::<(), stashed::StoreError>(())
/// ```
pub struct Draft<'a, T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    store: &'a WebStorage<T>,
    value: T,
    dirty: bool,
    finished: bool,
}

impl<'a, T> Draft<'a, T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub(super) fn new(store: &'a WebStorage<T>, value: T) -> Self {
        Self {
            store,
            value,
            dirty: false,
            finished: false,
        }
    }

    /// Whether the value was borrowed mutably.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Write the value back now if it was touched.
    pub fn commit(mut self) -> Result<()> {
        self.finish()
    }

    /// Throw the edits away.
    pub fn discard(mut self) {
        self.finished = true;
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        if self.dirty {
            self.store.commit_value(&self.value)?;
        }
        Ok(())
    }
}

impl<T> Deref for Draft<'_, T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> DerefMut for Draft<'_, T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn deref_mut(&mut self) -> &mut T {
        self.dirty = true;
        &mut self.value
    }
}

impl<T> Drop for Draft<'_, T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(err) = self.finish() {
            warn!(key = %self.store.key(), error = %err, "dropped draft could not be written");
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::error::StorageError;
    use crate::storage::{MemoryStorage, Storage, StorageIdentity, StorageKind};
    use crate::WebStorage;
    use serde::{Deserialize, Serialize};
    use std::io;
    use std::sync::Arc;
    use tracing_test::traced_test;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Prefs {
        theme: String,
        size: u32,
    }

    fn store() -> (Arc<MemoryStorage>, WebStorage<Prefs>) {
        let storage = Arc::new(MemoryStorage::new());
        let store = WebStorage::builder("prefs")
            .default_value(Prefs {
                theme: "light".to_string(),
                size: 12,
            })
            .storage(storage.clone())
            .build()
            .unwrap();
        (storage, store)
    }

    #[test]
    fn dropped_draft_writes_whole_value_once() {
        let (storage, store) = store();
        {
            let mut prefs = store.edit().unwrap();
            prefs.size = 14;
            prefs.theme = "dark".to_string();
        }

        assert_eq!(store.revision(), 1);
        assert_eq!(
            storage.get_item("prefs").as_deref(),
            Some(r#"{"theme":"dark","size":14}"#)
        );
    }

    #[test]
    fn read_only_draft_writes_nothing() {
        let (_, store) = store();
        let prefs = store.edit().unwrap();
        assert_eq!(prefs.size, 12);
        assert!(!prefs.is_dirty());
        drop(prefs);
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn discarded_draft_leaves_value() {
        let (_, store) = store();
        let mut prefs = store.edit().unwrap();
        prefs.size = 99;
        prefs.discard();

        assert_eq!(store.get().unwrap().size, 12);
        assert_eq!(store.revision(), 0);
    }

    /// Holds one value and refuses every write.
    struct ReadOnlyStorage {
        identity: StorageIdentity,
    }

    impl Storage for ReadOnlyStorage {
        fn get_item(&self, _key: &str) -> Option<String> {
            Some(r#"{"theme":"light","size":12}"#.to_string())
        }

        fn set_item(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Io {
                path: "read-only".into(),
                source: io::Error::other("read-only area"),
            })
        }

        fn identity(&self) -> StorageIdentity {
            self.identity
        }

        fn kind(&self) -> StorageKind {
            StorageKind::Durable
        }
    }

    #[traced_test]
    #[test]
    fn failed_write_on_drop_is_logged() {
        let store: WebStorage<Prefs> = WebStorage::builder("prefs")
            .storage(Arc::new(ReadOnlyStorage {
                identity: StorageIdentity::unique(),
            }))
            .build()
            .unwrap();

        {
            let mut prefs = store.edit().unwrap();
            prefs.size = 14;
        }

        assert!(logs_contain("dropped draft could not be written"));
        assert_eq!(store.revision(), 0);
        assert_eq!(store.get().unwrap().size, 12);
    }
}
