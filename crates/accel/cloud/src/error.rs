//! Cloud layer error types

use thiserror::Error;

/// Errors returned by cloud provider calls and credential resolution
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CloudError {
    #[error("Throttled during {operation}: {message}")]
    Throttled { operation: String, message: String },

    #[error("{operation} failed: {message}")]
    Provider { operation: String, message: String },

    #[error("Parameter not found: {0}")]
    ParameterNotFound(String),

    #[error("Assume-role response for {role_arn} is missing {field}")]
    MalformedCredentials { role_arn: String, field: &'static str },

    #[error("Invalid assume-role input: {0}")]
    InvalidInput(String),

    #[error("Retries exhausted for {operation} after {attempts} attempts: {message}")]
    RetriesExhausted {
        operation: String,
        attempts: u32,
        message: String,
    },
}

impl CloudError {
    /// Throttling-class errors are the only ones worth retrying
    pub fn is_throttling(&self) -> bool {
        matches!(self, CloudError::Throttled { .. })
    }

    pub fn throttled(operation: impl Into<String>, message: impl Into<String>) -> Self {
        CloudError::Throttled {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn provider(operation: impl Into<String>, message: impl Into<String>) -> Self {
        CloudError::Provider {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

/// Result type for cloud operations
pub type Result<T> = std::result::Result<T, CloudError>;
