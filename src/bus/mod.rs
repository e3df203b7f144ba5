//! Cross-context change notifications.
//!
//! When a context writes to a shared storage area, every other context
//! holding the same area hears about it through a [`NotificationBus`].

mod event_bus;

pub use event_bus::EventBus;

use crate::storage::{AreaId, ContextId};
use std::sync::Arc;

/// A write that happened to a storage area.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageEvent {
    /// Area the write landed in.
    pub area: AreaId,
    /// Context that performed the write.
    pub source: ContextId,
    pub key: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

/// Callback invoked for every delivered event.
pub type Listener = Arc<dyn Fn(&StorageEvent) + Send + Sync>;

/// Something that delivers [`StorageEvent`]s to subscribers.
pub trait NotificationBus: Send + Sync {
    /// Start delivering events to `listener` until the returned guard drops.
    fn subscribe(&self, listener: Listener) -> BusSubscription;
}

/// RAII guard for a bus listener.
pub struct BusSubscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl BusSubscription {
    /// A subscription that runs `cancel` when dropped.
    pub fn new<F>(cancel: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }
}

impl Drop for BusSubscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}
