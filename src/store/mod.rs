//! Reactive stores persisted to a key-value backend.
//!
//! A [`WebStorage`] binds one key of a [`Storage`](crate::storage::Storage)
//! and exposes the decoded value to the reactive runtime. Each store is
//! independent; there is no registry.
//!
//! # Invariants
//!
//! 1. A write reaches the backend before the revision advances.
//! 2. The revision advances exactly once per change, whether local or
//!    announced by another context.
//! 3. A store built with a default never reads back empty: the default is
//!    written at construction if the key is vacant, and never over an
//!    existing entry.
//! 4. In-place edits write the entire value back; the backend has no notion
//!    of nested keys.
//! 5. The bus subscription is held exactly while some reactive reader holds
//!    a lease, and is released one tick after the last one goes away.

mod draft;
mod web_storage;

pub use draft::Draft;
pub use web_storage::{WebStorage, WebStorageBuilder};
