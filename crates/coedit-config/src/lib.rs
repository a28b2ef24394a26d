//! coedit configuration.
//!
//! One TOML file drives both binaries: `[relay]` for the relay server,
//! `[client]` for participants, `[logging]` for both. Every section uses
//! serde defaults so partial files work.
//!
//! ```rust,no_run
//! let config = coedit_config::load_config().expect("failed to load config");
//! println!("{}", config.client.server_url);
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{
    ClientConfig, CoeditConfig, CompletionConfig, CompletionProvider, LogLevel, LoggingConfig,
    RelayConfig, CONFIG_SCHEMA_VERSION,
};
pub use toml_loader::{load_default, load_from_path};
pub use validation::{validate, validate_client, validate_relay};

use std::path::Path;

use coedit_common::ConfigError;

/// Load config from the platform default path and validate it strictly.
pub fn load_config() -> Result<CoeditConfig, ConfigError> {
    let config = toml_loader::load_default()?;
    validation::validate(&config)?;
    Ok(config)
}

/// Load config from `path` when given, the platform default otherwise.
pub fn load_config_from(path: Option<&Path>) -> Result<CoeditConfig, ConfigError> {
    let config = read_config(path)?;
    validation::validate(&config)?;
    Ok(config)
}

/// Like [`load_config_from`] but without strict validation, for callers
/// that apply overrides first and then validate the section they use.
pub fn read_config(path: Option<&Path>) -> Result<CoeditConfig, ConfigError> {
    match path {
        Some(path) => toml_loader::load_from_path(path),
        None => toml_loader::load_default(),
    }
}
