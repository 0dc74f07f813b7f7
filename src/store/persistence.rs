//! Snapshot persistence
//!
//! Storage collaborators that save and load whole-state snapshots. The engine
//! never calls these; callers persist after a transition commits.

use crate::config::{StorageBackend, StorageConfig};
use crate::error::FsError;
use crate::snapshot::Snapshot;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const SLED_STATE_KEY: &[u8] = b"state";

/// Where a snapshot lives between sessions
pub trait StateRepository {
    /// `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<Snapshot>, FsError>;
    fn save(&self, snapshot: &Snapshot) -> Result<(), FsError>;
    fn location(&self) -> &Path;
}

/// Human-readable JSON file.
pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StateRepository for JsonFileRepository {
    fn load(&self) -> Result<Option<Snapshot>, FsError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)?;
        let snapshot = serde_json::from_str(&raw)?;
        debug!(path = %self.path.display(), "loaded JSON snapshot");
        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), FsError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        // Write beside the target, then rename over it.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(snapshot)?)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), "saved JSON snapshot");
        Ok(())
    }

    fn location(&self) -> &Path {
        &self.path
    }
}

/// Sled tree holding one bincode-encoded snapshot.
pub struct SledRepository {
    db: sled::Db,
    path: PathBuf,
}

impl SledRepository {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, FsError> {
        let path = path.into();
        let db = sled::open(&path)?;
        Ok(Self { db, path })
    }
}

impl StateRepository for SledRepository {
    fn load(&self) -> Result<Option<Snapshot>, FsError> {
        match self.db.get(SLED_STATE_KEY)? {
            Some(bytes) => {
                let snapshot = bincode::deserialize(&bytes)?;
                debug!(path = %self.path.display(), "loaded sled snapshot");
                Ok(Some(snapshot))
            }
            None => Ok(None),
        }
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), FsError> {
        let bytes = bincode::serialize(snapshot)?;
        self.db.insert(SLED_STATE_KEY, bytes)?;
        self.db.flush()?;
        debug!(path = %self.path.display(), "saved sled snapshot");
        Ok(())
    }

    fn location(&self) -> &Path {
        &self.path
    }
}

/// Open the repository the storage configuration names.
pub fn open_repository(
    config: &StorageConfig,
    workspace_root: &Path,
) -> Result<Box<dyn StateRepository>, FsError> {
    let path = config.resolve_path(workspace_root);
    match config.backend {
        StorageBackend::Json => Ok(Box::new(JsonFileRepository::new(path))),
        StorageBackend::Sled => Ok(Box::new(SledRepository::open(path)?)),
    }
}
