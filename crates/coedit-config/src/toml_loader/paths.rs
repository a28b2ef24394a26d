//! Config file location and the first-run template write.

use std::fs::OpenOptions;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use coedit_common::ConfigError;
use tracing::{debug, info};

use super::template::default_config_toml;

const APP_DIR: &str = "coedit";
const FILE_NAME: &str = "config.toml";

/// `<platform config dir>/coedit/config.toml`, e.g.
/// `~/.config/coedit/config.toml` on Linux.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR).join(FILE_NAME))
        .ok_or_else(|| ConfigError::ParseError("no platform config directory".into()))
}

/// Write the commented template to `path`, creating parent directories.
///
/// A file that already exists is left untouched.
pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_error("create", parent, e))?;
    }

    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            debug!(path = %path.display(), "Config already present, not overwriting");
            return Ok(());
        }
        Err(e) => return Err(io_error("create", path, e)),
    };
    file.write_all(default_config_toml().as_bytes())
        .map_err(|e| io_error("write", path, e))?;

    info!(path = %path.display(), "Wrote default config");
    Ok(())
}

fn io_error(action: &str, path: &Path, e: io::Error) -> ConfigError {
    ConfigError::ParseError(format!("failed to {action} {}: {e}", path.display()))
}
