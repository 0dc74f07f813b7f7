//! Error types for the block file system.
//!
//! Every failure leaves the previous state untouched; callers report the
//! message and keep working with the state they already hold.

use crate::alloc::AllocationError;
use crate::types::NodeId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FsError {
    #[error("Node not found: {0}")]
    NotFound(NodeId),

    #[error("Path not found: {0}")]
    PathNotFound(String),

    #[error("A file or folder named \"{0}\" already exists")]
    NameConflict(String),

    #[error("Disk full: not enough space to allocate {needed} blocks ({free} free)")]
    InsufficientCapacity { needed: usize, free: usize },

    #[error("Allocation failed: could not find {needed} contiguous blocks, try a different allocation method")]
    FragmentationFailure { needed: usize },

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Corrupt state: {0}")]
    CorruptState(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Storage error: {0}")]
    StorageError(String),
}

impl FsError {
    /// True for the two allocator-driven rejections.
    pub fn is_allocation_failure(&self) -> bool {
        matches!(
            self,
            FsError::InsufficientCapacity { .. } | FsError::FragmentationFailure { .. }
        )
    }
}

impl From<AllocationError> for FsError {
    fn from(err: AllocationError) -> Self {
        match err {
            AllocationError::InsufficientCapacity { needed, free } => {
                FsError::InsufficientCapacity { needed, free }
            }
            AllocationError::Fragmented { needed } => FsError::FragmentationFailure { needed },
        }
    }
}

impl From<std::io::Error> for FsError {
    fn from(err: std::io::Error) -> Self {
        FsError::StorageError(err.to_string())
    }
}

impl From<serde_json::Error> for FsError {
    fn from(err: serde_json::Error) -> Self {
        FsError::StorageError(format!("JSON: {}", err))
    }
}

impl From<bincode::Error> for FsError {
    fn from(err: bincode::Error) -> Self {
        FsError::StorageError(format!("bincode: {}", err))
    }
}

impl From<sled::Error> for FsError {
    fn from(err: sled::Error) -> Self {
        FsError::StorageError(format!("sled: {}", err))
    }
}

impl From<config::ConfigError> for FsError {
    fn from(err: config::ConfigError) -> Self {
        FsError::ConfigError(err.to_string())
    }
}
