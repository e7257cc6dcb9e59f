//! Configuration file discovery and writing.
//!
//! Files are searched in this order:
//!
//! 1. the path given with `--config`
//! 2. `./research-cards.toml`
//! 3. `<config_dir>/research-cards/config.toml` (platform config directory)
//!
//! # Configuration File Format
//!
//! ```toml
//! [api_keys]
//! gemini = "your-api-key"
//!
//! [models]
//! fast = "gemini-2.0-flash-exp"
//! deep = "gemini-2.5-flash"
//! endpoint = "https://generativelanguage.googleapis.com/v1beta"
//!
//! [http]
//! timeout_seconds = 120
//! connect_timeout_seconds = 10
//!
//! [defaults]
//! complexity_level = "College"
//! response_format = "Detailed"
//! language = "Portuguese"
//! deep_research = false
//!
//! [logging]
//! level = "warn"
//! format = "json"
//! ```

use std::path::{Path, PathBuf};

use super::Config;

/// Configuration file looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "research-cards.toml";

const APP_DIR: &str = "research-cards";
const PLATFORM_CONFIG_FILE: &str = "config.toml";

/// Configuration file errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Serialize error: {0}")]
    Serialize(String),

    #[error("Configuration file already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("No platform configuration directory available")]
    NoConfigDir,
}

/// `<config_dir>/research-cards/config.toml`, if the platform has a config dir
pub fn platform_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(PLATFORM_CONFIG_FILE))
}

/// Locate the configuration file to load.
///
/// An explicit path is returned as-is, even when missing, so that loading
/// reports the error instead of silently using defaults.
pub fn find_config_file(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.is_file() {
        return Some(local);
    }

    platform_config_path().filter(|path| path.is_file())
}

/// Read a TOML configuration file strictly, without environment overrides
pub fn read_config_file(path: &Path) -> Result<Config, ConfigFileError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigFileError::Io(e.to_string()))?;

    toml::from_str(&content).map_err(|e| ConfigFileError::Parse(e.to_string()))
}

/// Write a configuration file, creating parent directories.
///
/// Refuses to replace an existing file unless `overwrite` is set.
pub fn write_config_file(
    config: &Config,
    path: &Path,
    overwrite: bool,
) -> Result<(), ConfigFileError> {
    if path.exists() && !overwrite {
        return Err(ConfigFileError::AlreadyExists(path.to_path_buf()));
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ConfigFileError::Io(e.to_string()))?;
    }

    let content =
        toml::to_string_pretty(config).map_err(|e| ConfigFileError::Serialize(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| ConfigFileError::Io(e.to_string()))
}
