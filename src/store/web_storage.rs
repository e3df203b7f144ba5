use super::Draft;
use crate::bus::{BusSubscription, NotificationBus, StorageEvent};
use crate::error::{Result, StoreError};
use crate::host;
use crate::runtime::ReactiveRuntime;
use crate::signal::{Effect, Signal};
use crate::storage::Storage;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tracing::{debug, trace};

#[derive(Default)]
struct Listeners {
    count: usize,
    subscription: Option<BusSubscription>,
}

struct Inner<T> {
    key: String,
    storage: Option<Arc<dyn Storage>>,
    bus: Option<Arc<dyn NotificationBus>>,
    // Only consulted when no storage is bound
    fallback: RwLock<Option<T>>,
    revision: Signal<u64>,
    listeners: Mutex<Listeners>,
}

/// A value persisted under one key of a [`Storage`], readable reactively.
///
/// Reading [`current`](WebStorage::current) inside an effect or memo makes it
/// re-run on every change: local writes through any method of this store,
/// and writes to the same key made by another context on the same area.
/// Other contexts are only listened to while at least one such reader is
/// alive.
///
/// Clones share state.
///
/// # Examples
///
/// ```
/// use stashed::storage::MemoryStorage;
/// use stashed::WebStorage;
/// use std::sync::Arc;
///
/// let storage = Arc::new(MemoryStorage::new());
/// let theme = WebStorage::builder("theme")
///     .default_value("light".to_string())
///     .storage(storage.clone())
///     .build()?;
///
/// assert_eq!(theme.get()?, "light");
/// theme.set("dark".to_string())?;
/// assert_eq!(theme.get()?, "dark");
/// # Ok::<(), stashed::StoreError>(())
/// ```
pub struct WebStorage<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for WebStorage<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> WebStorage<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Bind `key` in `storage`, seeding it with `default` if it is empty.
    ///
    /// With no storage the value lives in memory only. Without a bus, changes
    /// made by other contexts go unnoticed.
    ///
    /// # Errors
    ///
    /// Returns an error if the default cannot be encoded or written.
    pub fn new(
        key: impl Into<String>,
        default: Option<T>,
        storage: Option<Arc<dyn Storage>>,
        bus: Option<Arc<dyn NotificationBus>>,
    ) -> Result<Self> {
        let key = key.into();

        match &storage {
            Some(storage) => {
                if let (None, Some(default)) = (storage.get_item(&key), &default) {
                    storage.set_item(&key, &encode(&key, default)?)?;
                    debug!(key = %key, "seeded default value");
                }
            }
            None => debug!(key = %key, "no storage backend, keeping value in memory"),
        }

        Ok(Self {
            inner: Arc::new(Inner {
                key,
                storage,
                bus,
                fallback: RwLock::new(default),
                revision: Signal::new(0),
                listeners: Mutex::new(Listeners::default()),
            }),
        })
    }

    pub fn builder(key: impl Into<String>) -> WebStorageBuilder<T> {
        WebStorageBuilder {
            key: key.into(),
            default: None,
            storage: None,
            bus: None,
        }
    }

    /// Bind `key` in the installed host's durable area.
    pub fn local(key: impl Into<String>, default: T) -> Result<Self> {
        Self::new(key, Some(default), host::local(), host::bus())
    }

    /// Bind `key` in the installed host's session area.
    pub fn session(key: impl Into<String>, default: T) -> Result<Self> {
        Self::new(key, Some(default), host::session(), host::bus())
    }

    pub fn key(&self) -> &str {
        &self.inner.key
    }

    /// Whether writes reach a storage backend.
    pub fn is_persistent(&self) -> bool {
        self.inner.storage.is_some()
    }

    /// The stored value, or `None` if the key is empty and there is no default.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Deserialize`] if the stored string does not decode.
    /// Corrupt data is never replaced by the default.
    ///
    /// A tracked read takes its bus lease only after the value loaded. A
    /// reader that hit an error stays unsubscribed from other contexts until
    /// a local write re-runs it.
    pub fn current(&self) -> Result<Option<T>> {
        self.inner.revision.with(|_| ());
        let value = self.inner.load()?;
        self.observe();
        Ok(value)
    }

    /// Like [`current`](WebStorage::current), with an empty key as an error.
    pub fn get(&self) -> Result<T> {
        self.current()?.ok_or_else(|| self.inner.missing())
    }

    /// Replace the whole value.
    ///
    /// The value is written even when it did not change.
    pub fn set(&self, value: T) -> Result<()> {
        self.inner.persist(&value)?;
        self.inner.bump();
        Ok(())
    }

    /// Mutate the stored value in place and write the whole of it back.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Missing`] if there is nothing to mutate.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R> {
        let mut value = self.inner.load()?.ok_or_else(|| self.inner.missing())?;
        let out = f(&mut value);
        self.inner.persist(&value)?;
        self.inner.bump();
        Ok(out)
    }

    /// Borrow the stored value for editing; see [`Draft`].
    pub fn edit(&self) -> Result<Draft<'_, T>> {
        let value = self.inner.load()?.ok_or_else(|| self.inner.missing())?;
        Ok(Draft::new(self, value))
    }

    /// Call `callback` with the value now and after every change.
    ///
    /// Dropping the returned effect stops the calls.
    pub fn watch<F>(&self, callback: F) -> Effect
    where
        F: Fn(Result<Option<T>>) + Send + Sync + 'static,
    {
        let store = self.clone();
        Effect::new(move || callback(store.current()))
    }

    /// How many changes this store has seen. Not a reactive read.
    pub fn revision(&self) -> u64 {
        self.inner.revision.get_untracked()
    }

    /// Whether the store is currently subscribed to its bus.
    pub fn is_observed(&self) -> bool {
        self.inner.listeners().subscription.is_some()
    }

    /// Number of reactive reads currently holding the bus subscription open.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners().count
    }

    /// Take a bus lease for the observer that is running, if any.
    fn observe(&self) {
        let runtime = ReactiveRuntime::current();
        if !runtime.is_tracking() {
            return;
        }

        Inner::acquire(&self.inner);

        let inner = Arc::clone(&self.inner);
        let weak_runtime = Arc::downgrade(&runtime);
        runtime.on_cleanup(move || match weak_runtime.upgrade() {
            // A reader re-running takes its lease again before the tick
            Some(runtime) => runtime.defer(move || inner.release()),
            None => inner.release(),
        });
    }

    pub(super) fn commit_value(&self, value: &T) -> Result<()> {
        self.inner.persist(value)?;
        self.inner.bump();
        Ok(())
    }
}

impl<T> Inner<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn load(&self) -> Result<Option<T>> {
        match &self.storage {
            Some(storage) => match storage.get_item(&self.key) {
                Some(raw) => serde_json::from_str(&raw).map(Some).map_err(|source| {
                    StoreError::Deserialize {
                        key: self.key.clone(),
                        source,
                    }
                }),
                None => Ok(None),
            },
            None => Ok(self
                .fallback
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()),
        }
    }

    fn persist(&self, value: &T) -> Result<()> {
        match &self.storage {
            Some(storage) => {
                storage.set_item(&self.key, &encode(&self.key, value)?)?;
                trace!(key = %self.key, "persisted value");
            }
            None => {
                *self.fallback.write().unwrap_or_else(PoisonError::into_inner) =
                    Some(value.clone());
            }
        }
        Ok(())
    }

    fn bump(&self) {
        self.revision.update(|revision| *revision += 1);
    }

    fn missing(&self) -> StoreError {
        StoreError::Missing {
            key: self.key.clone(),
        }
    }

    fn listeners(&self) -> MutexGuard<'_, Listeners> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn acquire(this: &Arc<Self>) {
        let mut listeners = this.listeners();
        listeners.count += 1;

        if listeners.subscription.is_none() {
            if let Some(bus) = &this.bus {
                let weak = Arc::downgrade(this);
                listeners.subscription = Some(bus.subscribe(Arc::new(move |event: &StorageEvent| {
                    if let Some(inner) = weak.upgrade() {
                        inner.on_event(event);
                    }
                })));
                debug!(key = %this.key, "listening for changes from other contexts");
            }
        }
    }

    fn release(&self) {
        let subscription = {
            let mut listeners = self.listeners();
            listeners.count = listeners.count.saturating_sub(1);
            if listeners.count == 0 {
                listeners.subscription.take()
            } else {
                None
            }
        };

        if let Some(subscription) = subscription {
            drop(subscription);
            debug!(key = %self.key, "stopped listening for changes from other contexts");
        }
    }

    fn on_event(&self, event: &StorageEvent) {
        let Some(storage) = &self.storage else {
            return;
        };
        let identity = storage.identity();

        if event.area != identity.area || event.key != self.key || event.source == identity.context {
            trace!(key = %self.key, event_key = %event.key, "ignoring storage event");
            return;
        }

        trace!(key = %self.key, source = %event.source, "value changed in another context");
        self.bump();
    }
}

fn encode<T: Serialize>(key: &str, value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|source| StoreError::Serialize {
        key: key.to_owned(),
        source,
    })
}

/// Builder for [`WebStorage`].
pub struct WebStorageBuilder<T> {
    key: String,
    default: Option<T>,
    storage: Option<Arc<dyn Storage>>,
    bus: Option<Arc<dyn NotificationBus>>,
}

impl<T> WebStorageBuilder<T>
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    /// Value written when the key is empty at construction.
    pub fn default_value(mut self, value: T) -> Self {
        self.default = Some(value);
        self
    }

    pub fn storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn bus(mut self, bus: Arc<dyn NotificationBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn build(self) -> Result<WebStorage<T>> {
        WebStorage::new(self.key, self.default, self.storage, self.bus)
    }
}
