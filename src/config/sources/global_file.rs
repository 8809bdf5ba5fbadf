//! Global config file source: $XDG_CONFIG_HOME/studygen/config.toml

use crate::config::EnvSnapshot;
use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, File, FileFormat};
use directories::BaseDirs;
use std::path::PathBuf;
use tracing::debug;

/// Path to the global config file.
///
/// `XDG_CONFIG_HOME` from the snapshot wins; otherwise the platform config dir.
pub fn global_config_path(env: &EnvSnapshot) -> Option<PathBuf> {
    let base = match env.get("XDG_CONFIG_HOME") {
        Some(dir) => PathBuf::from(dir),
        None => BaseDirs::new()?.config_dir().to_path_buf(),
    };
    Some(base.join("studygen").join("config.toml"))
}

/// Add the global config file to the builder if it exists.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    env: &EnvSnapshot,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let Some(path) = global_config_path(env) else {
        return Ok(builder);
    };
    if !path.exists() {
        debug!(config_path = %path.display(), "No global configuration file");
        return Ok(builder);
    }
    Ok(builder.add_source(File::from(path).format(FileFormat::Toml).required(false)))
}
