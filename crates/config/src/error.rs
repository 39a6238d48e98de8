use std::path::PathBuf;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("failed to write config file at {path}: {reason}")]
    WriteError { path: PathBuf, reason: String },

    #[error("failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("configuration validation failed: {0:?}")]
    Validation(Vec<String>),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    Conflict(String),
}
