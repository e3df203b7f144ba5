//! Error types for storage backends and persisted stores.

use std::path::PathBuf;
use thiserror::Error;

/// Failures raised by a [`Storage`](crate::storage::Storage) backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("failed to access storage file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The backing file exists but does not hold a JSON object of strings.
    #[error("storage file {} is corrupt: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
    /// The entries could not be encoded for writing.
    #[error("failed to encode storage file {}: {source}", .path.display())]
    Encode {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Failures surfaced by a [`WebStorage`](crate::WebStorage) read or write.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The string stored under the key does not decode to the store's type.
    #[error("value stored under `{key}` could not be decoded: {source}")]
    Deserialize {
        key: String,
        source: serde_json::Error,
    },
    /// The value could not be encoded.
    #[error("value for `{key}` could not be encoded: {source}")]
    Serialize {
        key: String,
        source: serde_json::Error,
    },
    /// Nothing is stored under the key and the store has no default.
    #[error("no value stored under `{key}`")]
    Missing { key: String },
    /// The backend refused the write.
    #[error(transparent)]
    Persist(#[from] StorageError),
}

/// Result alias used throughout the crate.
pub type Result<T, E = StoreError> = std::result::Result<T, E>;
