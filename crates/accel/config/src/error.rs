//! Configuration error types

use std::path::PathBuf;
use thiserror::Error;

/// Configuration loading errors. All of them are fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "Configuration directory {} is missing mandatory files: {}",
        .dir.display(),
        .files.join(", ")
    )]
    MissingFiles { dir: PathBuf, files: Vec<String> },

    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for configuration loading
pub type Result<T> = std::result::Result<T, ConfigError>;
