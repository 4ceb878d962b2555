//! Config discovery for the binary.
//!
//! The config is read before the tracing subscriber exists, so where it came
//! from is returned as a [`ConfigSource`] and logged once logging is up.

use std::path::{Path, PathBuf};

use posewire_config::{CONFIG_FILE_NAME, Config, ConfigError};
use tracing::{info, warn};

/// Where the running config came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Read from an existing file.
    Loaded(PathBuf),
    /// No file existed; defaults were written here.
    Created(PathBuf),
    /// No config directory is available on this platform.
    Defaults,
}

impl ConfigSource {
    pub fn log(&self) {
        match self {
            Self::Loaded(path) => info!("Loaded config from {}", path.display()),
            Self::Created(path) => info!("Created default config at {}", path.display()),
            Self::Defaults => warn!("No config directory available, using built-in defaults"),
        }
    }
}

/// Load the config from `config_dir`, creating a default file if missing.
pub fn load_config(config_dir: Option<&Path>) -> Result<(Config, ConfigSource), ConfigError> {
    let Some(dir) = config_dir else {
        return Ok((Config::default(), ConfigSource::Defaults));
    };

    let path = dir.join(CONFIG_FILE_NAME);
    let existed = path.exists();
    let config = Config::load_or_create(dir)?;

    let source = if existed {
        ConfigSource::Loaded(path)
    } else {
        ConfigSource::Created(path)
    };
    Ok((config, source))
}
