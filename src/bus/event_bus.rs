use super::{BusSubscription, Listener, NotificationBus, StorageEvent};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

struct BusInner {
    next_id: AtomicUsize,
    listeners: RwLock<Vec<(usize, Listener)>>,
}

/// An in-process broadcast bus.
///
/// Clones share the same listener list. Events are delivered synchronously,
/// in subscription order, on the thread that emits them.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                next_id: AtomicUsize::new(0),
                listeners: RwLock::new(Vec::new()),
            }),
        }
    }

    /// Deliver `event` to every current listener.
    pub fn emit(&self, event: &StorageEvent) {
        // Listeners may subscribe or unsubscribe while handling the event
        let listeners: Vec<Listener> = self
            .inner
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            listener(event);
        }
    }

    /// Number of live subscriptions.
    pub fn listener_count(&self) -> usize {
        self.inner
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationBus for EventBus {
    fn subscribe(&self, listener: Listener) -> BusSubscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        self.inner
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));

        let inner = Arc::downgrade(&self.inner);
        BusSubscription::new(move || {
            if let Some(inner) = inner.upgrade() {
                inner
                    .listeners
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .retain(|(listener_id, _)| *listener_id != id);
            }
        })
    }
}
