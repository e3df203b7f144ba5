use super::{ContextId, MemoryStorage, Storage, StorageIdentity, StorageKind};
use crate::bus::{EventBus, NotificationBus, StorageEvent};
use crate::error::StorageError;
use std::sync::Arc;

/// A group of contexts that share one durable area and one bus.
///
/// This is the in-process shape of "several tabs of the same site": every
/// [`BrowsingContext`] opened from an origin reads and writes the same durable
/// entries, gets a session area of its own, and announces each of its writes
/// on the shared [`EventBus`].
#[derive(Clone)]
pub struct Origin {
    durable: Arc<dyn Storage>,
    bus: EventBus,
}

impl Origin {
    /// An origin whose durable area lives in memory.
    pub fn new() -> Self {
        Self::with_durable(Arc::new(MemoryStorage::with_kind(StorageKind::Durable)))
    }

    /// An origin sharing `durable` between its contexts.
    pub fn with_durable(durable: Arc<dyn Storage>) -> Self {
        Self {
            durable,
            bus: EventBus::new(),
        }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Open a new context with a fresh session area.
    pub fn open_context(&self) -> BrowsingContext {
        let id = ContextId::next();
        let session: Arc<dyn Storage> = Arc::new(MemoryStorage::with_kind(StorageKind::Session));

        BrowsingContext {
            id,
            local: Arc::new(ContextStorage {
                context: id,
                area: Arc::clone(&self.durable),
                bus: self.bus.clone(),
            }),
            session: Arc::new(ContextStorage {
                context: id,
                area: session,
                bus: self.bus.clone(),
            }),
            bus: self.bus.clone(),
        }
    }
}

impl Default for Origin {
    fn default() -> Self {
        Self::new()
    }
}

/// One context of an [`Origin`].
#[derive(Clone)]
pub struct BrowsingContext {
    id: ContextId,
    local: Arc<dyn Storage>,
    session: Arc<dyn Storage>,
    bus: EventBus,
}

impl BrowsingContext {
    pub fn id(&self) -> ContextId {
        self.id
    }

    /// Durable handle, shared with every other context of the origin.
    pub fn local(&self) -> Arc<dyn Storage> {
        Arc::clone(&self.local)
    }

    /// Session handle, private to this context.
    pub fn session(&self) -> Arc<dyn Storage> {
        Arc::clone(&self.session)
    }

    pub fn bus(&self) -> Arc<dyn NotificationBus> {
        Arc::new(self.bus.clone())
    }
}

/// A context's handle onto an area; announces its writes.
struct ContextStorage {
    context: ContextId,
    area: Arc<dyn Storage>,
    bus: EventBus,
}

impl Storage for ContextStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.area.get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let old_value = self.area.get_item(key);
        self.area.set_item(key, value)?;

        self.bus.emit(&StorageEvent {
            area: self.area.identity().area,
            source: self.context,
            key: key.to_owned(),
            old_value,
            new_value: Some(value.to_owned()),
        });
        Ok(())
    }

    fn identity(&self) -> StorageIdentity {
        StorageIdentity {
            area: self.area.identity().area,
            context: self.context,
        }
    }

    fn kind(&self) -> StorageKind {
        self.area.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn contexts_share_durable_area() {
        let origin = Origin::new();
        let a = origin.open_context();
        let b = origin.open_context();

        a.local().set_item("settings", "{}").unwrap();
        assert_eq!(b.local().get_item("settings").as_deref(), Some("{}"));
        assert_eq!(a.local().identity().area, b.local().identity().area);
        assert_ne!(a.local().identity().context, b.local().identity().context);
    }

    #[test]
    fn session_areas_are_private() {
        let origin = Origin::new();
        let a = origin.open_context();
        let b = origin.open_context();

        a.session().set_item("navigation", "{}").unwrap();
        assert_eq!(b.session().get_item("navigation"), None);
        assert_ne!(a.session().identity().area, b.session().identity().area);
        assert_eq!(a.session().kind(), StorageKind::Session);
    }

    #[test]
    fn writes_are_announced_with_old_and_new_values() {
        let origin = Origin::new();
        let a = origin.open_context();
        let events = Arc::new(Mutex::new(Vec::new()));

        let _subscription = origin.bus().subscribe(Arc::new({
            let events = events.clone();
            move |event: &StorageEvent| events.lock().unwrap().push(event.clone())
        }));

        a.local().set_item("theme", "\"light\"").unwrap();
        a.local().set_item("theme", "\"dark\"").unwrap();

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].source, a.id());
        assert_eq!(events[1].old_value.as_deref(), Some("\"light\""));
        assert_eq!(events[1].new_value.as_deref(), Some("\"dark\""));
    }
}
