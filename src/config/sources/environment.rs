//! Environment variable source: BLOCKFS_* prefix with __ separator

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::Environment;

/// Add environment variable overlay to builder.
/// Uses BLOCKFS__ prefix and __ as separator for nested keys,
/// e.g. `BLOCKFS__DISK__BLOCK_SIZE=512`.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let builder = builder.add_source(
        Environment::with_prefix("BLOCKFS")
            .separator("__")
            .try_parsing(true),
    );
    Ok(builder)
}
