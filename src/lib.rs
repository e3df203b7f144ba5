//! # Stashed
//!
//! Reactive state persisted to a key-value storage backend and kept in sync
//! across every context that shares the backend.
//!
//! ## Signals (Low-level primitives)
//!
//! Fine-grained reactive primitives the stores are built on:
//! - `Signal<T>` - Reactive values that notify dependents when changed
//! - `Memo<T>` - Computed values that automatically track dependencies
//! - `Effect` - Side effects that run when dependencies change
//!
//! ## Stores (Persisted state)
//!
//! - `WebStorage<T>` - A value stored under one key of a [`storage::Storage`],
//!   seeded with a default, written through on every change and re-read by
//!   reactive consumers whenever it changes here or in another context
//! - `Draft<T>` - In-place editing that writes the whole value back once
//! - [`app::AppStores`] - The typed stores of the log dashboard
//!
//! ## Backends
//!
//! - [`storage`] - In-memory, file-backed and multi-context storage areas
//! - [`bus`] - Change notifications between contexts
//! - [`host`] - Process-wide default backends, configured by [`HostConfig`]

pub mod app;
pub mod bus;
pub mod config;
pub mod error;
pub mod host;
pub mod runtime;
pub mod signal;
pub mod storage;
pub mod store;

// Re-export main types for convenience
pub use config::HostConfig;
pub use error::{Result, StorageError, StoreError};
pub use host::Host;
pub use signal::{create_effect, create_memo, Effect, Memo, Signal, WatchGuard};
pub use store::{Draft, WebStorage, WebStorageBuilder};
