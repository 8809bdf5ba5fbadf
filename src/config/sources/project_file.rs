//! Project config file source: an explicit `--config` path or ./studygen.toml

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, File, FileFormat};
use std::path::Path;

pub const PROJECT_CONFIG_FILE: &str = "studygen.toml";

/// Add the project config file to the builder.
///
/// An explicit path is required to exist; the implicit one is optional.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    working_dir: &Path,
    explicit: Option<&Path>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        return Ok(builder.add_source(File::from(path).format(FileFormat::Toml).required(true)));
    }

    let implicit = working_dir.join(PROJECT_CONFIG_FILE);
    if implicit.exists() {
        return Ok(builder.add_source(File::from(implicit).format(FileFormat::Toml).required(false)));
    }
    Ok(builder)
}
