//! Built-in defaults underneath every other source.

use crate::disk::{DEFAULT_BLOCK_SIZE, DEFAULT_DISK_SIZE};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};

pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("disk.disk_size", i64::from(DEFAULT_DISK_SIZE))?
        .set_default("disk.block_size", i64::from(DEFAULT_BLOCK_SIZE))?
        .set_default("disk.default_allocation", "contiguous")?
        .set_default("storage.backend", "json")
}
