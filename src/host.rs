//! Process-wide default backends.
//!
//! Stores built with [`WebStorage::local`](crate::WebStorage::local) or
//! [`WebStorage::session`](crate::WebStorage::session) bind whatever [`Host`]
//! was installed here. With no host installed they fall back to keeping their
//! value in memory.

use crate::bus::NotificationBus;
use crate::config::HostConfig;
use crate::error::StorageError;
use crate::storage::{BrowsingContext, FileStorage, Origin, Storage};
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// The durable area, session area and bus a context works with.
#[derive(Clone)]
pub struct Host {
    local: Arc<dyn Storage>,
    session: Arc<dyn Storage>,
    bus: Arc<dyn NotificationBus>,
}

impl Host {
    pub fn new(
        local: Arc<dyn Storage>,
        session: Arc<dyn Storage>,
        bus: Arc<dyn NotificationBus>,
    ) -> Self {
        Self {
            local,
            session,
            bus,
        }
    }

    /// The backends of one context of an origin.
    pub fn from_context(context: &BrowsingContext) -> Self {
        Self::new(context.local(), context.session(), context.bus())
    }

    /// Open the durable file named by `config` and a fresh session area.
    ///
    /// # Errors
    ///
    /// Returns an error if the durable file exists but cannot be loaded.
    pub fn from_config(config: &HostConfig) -> Result<Self, StorageError> {
        let durable = FileStorage::open(config.durable_path())?;
        debug!(path = %durable.path().display(), "opened durable storage");
        let origin = Origin::with_durable(Arc::new(durable));
        Ok(Self::from_context(&origin.open_context()))
    }

    /// A host with nothing on disk.
    pub fn in_memory() -> Self {
        Self::from_context(&Origin::new().open_context())
    }

    pub fn local(&self) -> Arc<dyn Storage> {
        Arc::clone(&self.local)
    }

    pub fn session(&self) -> Arc<dyn Storage> {
        Arc::clone(&self.session)
    }

    pub fn bus(&self) -> Arc<dyn NotificationBus> {
        Arc::clone(&self.bus)
    }
}

static HOST: OnceLock<Host> = OnceLock::new();

/// Install the process-wide host.
///
/// Only the first call wins; later calls hand their host back.
pub fn install(host: Host) -> Result<(), Host> {
    HOST.set(host)
}

/// The installed host, if any.
pub fn installed() -> Option<&'static Host> {
    HOST.get()
}

/// Durable backend of the installed host.
pub fn local() -> Option<Arc<dyn Storage>> {
    installed().map(Host::local)
}

/// Session backend of the installed host.
pub fn session() -> Option<Arc<dyn Storage>> {
    installed().map(Host::session)
}

/// Notification bus of the installed host.
pub fn bus() -> Option<Arc<dyn NotificationBus>> {
    installed().map(Host::bus)
}
