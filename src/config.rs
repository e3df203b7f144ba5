//! Host configuration.

use crate::storage::storage_dir;
use serde::Deserialize;
use std::path::PathBuf;

/// Where the durable area of a host lives.
///
/// Missing fields fall back to their defaults, so an empty document is a
/// valid configuration.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HostConfig {
    pub qualifier: String,
    pub organization: String,
    pub application: String,
    /// Overrides the platform directory derived from the names above.
    pub storage_dir: Option<PathBuf>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            qualifier: String::new(),
            organization: String::new(),
            application: "stashed".to_owned(),
            storage_dir: None,
        }
    }
}

impl HostConfig {
    /// Directory holding the durable storage file.
    pub fn resolve_storage_dir(&self) -> PathBuf {
        self.storage_dir.clone().unwrap_or_else(|| {
            storage_dir(&self.qualifier, &self.organization, &self.application)
        })
    }

    /// Path of the durable storage file.
    pub fn durable_path(&self) -> PathBuf {
        self.resolve_storage_dir().join("local.json")
    }
}
