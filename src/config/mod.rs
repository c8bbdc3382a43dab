//! Configuration loading.
//!
//! Settings are layered, later sources winning:
//!
//! 1. Built-in defaults (production endpoint, `.eraser/scratchpad`)
//! 2. Optional JSON configuration file
//! 3. Environment: `ERASER_API_URL`, `ERASER_OUTPUT_DIR`, `ERASER_API_TOKEN`
//!
//! # Configuration File Locations
//!
//! 1. Path given as the first CLI argument (must exist)
//! 2. Default location, used only if present:
//!    - **Linux/macOS:** `~/.eraser-mcp/config.json`
//!    - **Windows:** `%USERPROFILE%\.eraser-mcp\config.json`

mod settings;

pub use settings::{
    Config, LoggingConfig, DEFAULT_API_URL, DEFAULT_OUTPUT_DIR, ENV_API_TOKEN, ENV_API_URL,
    ENV_OUTPUT_DIR,
};

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Returns the default configuration directory.
#[must_use]
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|p| p.join(".eraser-mcp"))
}

/// Returns the platform-specific default configuration file path.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    default_config_dir().map(|p| p.join("config.json"))
}

/// Loads the configuration from file and process environment.
///
/// If `path` is `None`, the default location is used when it exists and
/// built-in defaults otherwise.
///
/// # Errors
///
/// Returns an error if:
/// - An explicit configuration file cannot be found or read
/// - The JSON is malformed
/// - The working directory cannot be determined
/// - The merged settings fail validation
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let file_config = match path {
        Some(p) => read_config_file(p)?,
        None => match default_config_path().filter(|p| p.exists()) {
            Some(p) => read_config_file(&p)?,
            None => Config::default(),
        },
    };

    let cwd = std::env::current_dir().map_err(|e| ConfigError::ValidationError {
        message: format!("cannot determine working directory: {e}"),
    })?;

    let config = file_config
        .apply_env(|key| std::env::var(key).ok())
        .resolve_output_dir(&cwd);

    config.validate()?;

    Ok(config)
}

/// Reads and parses one JSON configuration file.
///
/// # Errors
///
/// Returns an error if the file is missing, unreadable or malformed.
pub fn read_config_file(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}
