//! Error types for vulnscope

use std::time::Duration;
use thiserror::Error;

/// Result type alias for vulnscope operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for the application
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Interactive prompt error: {0}")]
    Dialoguer(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Operation failed: {0}")]
    Other(String),
}

impl From<dialoguer::Error> for Error {
    fn from(err: dialoguer::Error) -> Self {
        Error::Dialoguer(err.to_string())
    }
}

/// Scan lifecycle and engine errors
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Invalid scan configuration: {0}")]
    InvalidConfig(String),

    #[error("Scan session not found: {0}")]
    NotFound(String),

    #[error("Scan {id} has not completed (status: {state})")]
    NotCompleted { id: String, state: String },

    #[error("Target unreachable: {0}")]
    TargetUnreachable(String),

    #[error("{category} tests failed: {message}")]
    TestModuleFailure { category: String, message: String },

    #[error("{phase} timed out after {after:?}")]
    Timeout { phase: String, after: Duration },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Scan failed: {0}")]
    Failed(String),

    #[error("Scan cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for ScanError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ScanError::Network("Request timed out".to_string())
        } else if err.is_connect() {
            ScanError::Network("Failed to connect to target".to_string())
        } else {
            ScanError::Network(err.to_string())
        }
    }
}

/// Report compilation errors
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Report generation failed: {0}")]
    GenerationFailed(String),
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to save configuration: {0}")]
    SaveError(String),
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// Result archive errors
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Could not determine cache directory")]
    NoHome,

    #[error("Archive I/O error: {0}")]
    Io(String),

    #[error("Archive database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Archived result is corrupt: {0}")]
    Corrupt(String),

    #[error("No archived scan matches '{0}'")]
    NotFound(String),

    #[error("Scan id prefix '{0}' is ambiguous")]
    Ambiguous(String),
}
