//! Error types for eraser-mcp.
//!
//! # Security Note
//!
//! Error messages are carefully crafted to NEVER include the API token.
//! Upstream errors carry the response body and status, never the request
//! headers.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path where the configuration file was expected.
        path: PathBuf,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },
}

/// Errors raised while building or querying the tool catalog.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// A declared input schema is not a valid JSON Schema document.
    #[error("input schema for tool '{tool}' failed to compile: {message}")]
    InvalidSchema {
        /// Tool whose schema was rejected.
        tool: String,
        /// Compiler diagnostic.
        message: String,
    },

    /// No tool with this name exists in the registry view.
    #[error("Tool not found: {0}")]
    ToolNotFound(String),
}

/// Errors from a single round trip to the upstream rendering API.
#[derive(Error, Debug)]
pub enum UpstreamError {
    /// The upstream answered with a non-success HTTP status.
    #[error("HTTP {status}: {body}")]
    Status {
        /// Numeric HTTP status code.
        status: u16,
        /// Response body, as text.
        body: String,
    },

    /// The request could not be completed (connect, timeout, body decode).
    #[error("Request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        Self::Request(err.to_string())
    }
}
