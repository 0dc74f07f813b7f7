//! StorageConfig and path resolution for snapshot storage.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Pretty-printed JSON file
    #[default]
    Json,
    /// Sled database with a bincode-encoded snapshot
    Sled,
}

impl StorageBackend {
    fn default_path(&self) -> PathBuf {
        match self {
            StorageBackend::Json => PathBuf::from(".blockfs/state.json"),
            StorageBackend::Sled => PathBuf::from(".blockfs/state.sled"),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Snapshot location; relative paths resolve against the workspace root
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl StorageConfig {
    pub fn resolve_path(&self, workspace_root: &Path) -> PathBuf {
        let path = self
            .path
            .clone()
            .unwrap_or_else(|| self.backend.default_path());
        if path.is_absolute() {
            path
        } else {
            workspace_root.join(path)
        }
    }
}
