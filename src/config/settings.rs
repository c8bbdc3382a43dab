//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.
//! Environment overrides are applied on top by [`Config::apply_env`].

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

/// Production endpoint of the rendering API.
pub const DEFAULT_API_URL: &str = "https://app.eraser.io/api/mcp";

/// Default artifact cache directory, relative to the working directory.
pub const DEFAULT_OUTPUT_DIR: &str = ".eraser/scratchpad";

/// Environment variable overriding [`Config::api_url`].
pub const ENV_API_URL: &str = "ERASER_API_URL";

/// Environment variable overriding [`Config::output_dir`].
pub const ENV_OUTPUT_DIR: &str = "ERASER_OUTPUT_DIR";

/// Environment variable carrying the API token.
pub const ENV_API_TOKEN: &str = "ERASER_API_TOKEN";

/// Root configuration structure.
///
/// Built once at startup and shared read-only for the process lifetime.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// Upstream JSON-RPC endpoint that receives `tools/call` requests.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Directory where rendered images are cached.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Bearer token for the upstream API.
    #[serde(default)]
    pub api_token: Option<String>,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            _schema: None,
            _comment: None,
            api_url: default_api_url(),
            output_dir: default_output_dir(),
            api_token: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_url", &self.api_url)
            .field("output_dir", &self.output_dir)
            .field("api_token", &self.api_token.as_ref().map(|_| "<redacted>"))
            .field("logging", &self.logging)
            .finish()
    }
}

impl Config {
    /// Applies environment overrides using the given lookup.
    ///
    /// Empty values are treated as unset.
    #[must_use]
    pub fn apply_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(url) = get(ENV_API_URL) {
            self.api_url = url;
        }
        if let Some(dir) = get(ENV_OUTPUT_DIR) {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(token) = get(ENV_API_TOKEN) {
            self.api_token = Some(token);
        }
        self
    }

    /// Makes a relative output directory absolute against `base`.
    #[must_use]
    pub fn resolve_output_dir(mut self, base: &Path) -> Self {
        if self.output_dir.is_relative() {
            self.output_dir = base.join(&self.output_dir);
        }
        self
    }

    /// Returns the API token exactly as configured.
    ///
    /// A blank token counts as no token.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.api_token
            .as_deref()
            .filter(|token| !token.trim().is_empty())
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = reqwest::Url::parse(&self.api_url).map_err(|e| ConfigError::ValidationError {
            message: format!("Invalid api_url '{}': {e}", self.api_url),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Invalid api_url '{}'. Scheme must be http or https",
                    self.api_url
                ),
            });
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "output_dir cannot be empty".to_string(),
            });
        }
        Ok(())
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_DIR)
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}
