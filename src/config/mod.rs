//! Configuration
//!
//! Disk dimensions, snapshot storage and logging, layered from defaults,
//! config files and `BLOCKFS__*` environment variables.

mod facade;
pub mod merge;
pub mod paths;
pub mod sources;
mod storage_paths;

pub use facade::ConfigLoader;
pub use storage_paths::{StorageBackend, StorageConfig};

use crate::alloc::AllocationMethod;
use crate::disk::{DEFAULT_BLOCK_SIZE, DEFAULT_DISK_SIZE};
use crate::error::FsError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockfsConfig {
    #[serde(default)]
    pub disk: DiskConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BlockfsConfig {
    /// Reject settings no session could start with.
    pub fn validate(&self) -> Result<(), FsError> {
        self.disk.validate()?;
        crate::logging::validate_logging_config(&self.logging)
    }

    /// Effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, FsError> {
        toml::to_string_pretty(self)
            .map_err(|e| FsError::ConfigError(format!("Failed to render config: {}", e)))
    }
}

fn default_disk_size() -> u32 {
    DEFAULT_DISK_SIZE
}

fn default_block_size() -> u32 {
    DEFAULT_BLOCK_SIZE
}

/// Simulated disk parameters, fixed for the life of a file system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskConfig {
    /// Number of blocks (default: 1000)
    #[serde(default = "default_disk_size")]
    pub disk_size: u32,

    /// Bytes per block (default: 1024)
    #[serde(default = "default_block_size")]
    pub block_size: u32,

    /// Strategy for new files when none is requested
    #[serde(default)]
    pub default_allocation: AllocationMethod,
}

impl DiskConfig {
    pub fn validate(&self) -> Result<(), FsError> {
        if self.disk_size == 0 {
            return Err(FsError::ConfigError("disk.disk_size must be greater than 0".to_string()));
        }
        if self.block_size == 0 {
            return Err(FsError::ConfigError("disk.block_size must be greater than 0".to_string()));
        }
        Ok(())
    }
}

impl Default for DiskConfig {
    fn default() -> Self {
        Self {
            disk_size: default_disk_size(),
            block_size: default_block_size(),
            default_allocation: AllocationMethod::default(),
        }
    }
}
