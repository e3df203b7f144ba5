//! Runtime support for reactive primitives.
//!
//! This module provides the infrastructure for dependency tracking,
//! observer teardown, and the deferred task queue that stands in for a
//! host's scheduling tick.

mod context;

pub use context::ReactiveRuntime;
