//! Reading `config.toml` into a [`CoeditConfig`].

use std::io::ErrorKind;
use std::path::Path;

use coedit_common::ConfigError;
use tracing::{info, warn};

use super::paths::{create_default_config, default_config_path};
use crate::schema::CoeditConfig;
use crate::validation;

/// Parse the TOML file at `path`.
///
/// Missing sections and fields fall back to their defaults. Out-of-range
/// values are reported at `warn` but still returned; `crate::load_config`
/// is the strict entry point.
pub fn load_from_path(path: &Path) -> Result<CoeditConfig, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }
        Err(e) => {
            return Err(ConfigError::ParseError(format!(
                "failed to read {}: {e}",
                path.display()
            )));
        }
    };

    let config: CoeditConfig = toml::from_str(&content).map_err(|e| {
        ConfigError::ParseError(format!("{}: {e}", path.display()))
    })?;

    if let Err(e) = validation::validate(&config) {
        warn!(path = %path.display(), "Config has invalid values: {e}");
    }

    info!(path = %path.display(), "Loaded config");
    Ok(config)
}

/// Load the per-user config, writing the commented template first when
/// the file does not exist yet.
pub fn load_default() -> Result<CoeditConfig, ConfigError> {
    let path = default_config_path()?;
    if !path.exists() {
        info!(path = %path.display(), "No config yet, writing the default");
        create_default_config(&path)?;
        return Ok(CoeditConfig::default());
    }
    load_from_path(&path)
}
