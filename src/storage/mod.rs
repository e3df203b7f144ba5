//! Key-value persistence backends.
//!
//! A [`Storage`] is a flat map from string keys to serialized string values.
//! Every handle carries a [`StorageIdentity`]: the `area` it reads and writes
//! (two handles with the same area see the same entries) and the `context`
//! that holds it (the tab or process a write originates from).
//!
//! - [`MemoryStorage`]: a private in-memory area.
//! - [`FileStorage`]: a durable JSON file, written through on every set.
//! - [`Origin`]: several [`BrowsingContext`]s sharing one durable area and one
//!   notification bus, each with a private session area.

mod file;
mod memory;
mod origin;

pub use file::{storage_dir, FileStorage};
pub use memory::MemoryStorage;
pub use origin::{BrowsingContext, Origin};

use crate::error::StorageError;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies one storage area: the set of entries a handle reads and writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AreaId(u64);

impl AreaId {
    /// Allocate a fresh, process-unique area id.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for AreaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "area#{}", self.0)
    }
}

/// Identifies one execution context (a tab, a window, a process).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

impl ContextId {
    /// Allocate a fresh, process-unique context id.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "context#{}", self.0)
    }
}

/// Where a handle writes and who is writing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StorageIdentity {
    pub area: AreaId,
    pub context: ContextId,
}

impl StorageIdentity {
    /// A fresh area held by a fresh context.
    pub fn unique() -> Self {
        Self {
            area: AreaId::next(),
            context: ContextId::next(),
        }
    }
}

/// Lifetime class of a storage area.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StorageKind {
    /// Survives process restarts.
    Durable,
    /// Lives as long as the owning context.
    Session,
}

/// A synchronous key-value persistence backend.
pub trait Storage: Send + Sync {
    /// The serialized value under `key`, if any.
    fn get_item(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`, replacing what was there.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// The area this handle targets and the context holding it.
    fn identity(&self) -> StorageIdentity;

    /// Whether entries outlive the session.
    fn kind(&self) -> StorageKind;
}
