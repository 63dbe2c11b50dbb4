//! Cloud error types

use thiserror::Error;

/// Cloud errors
///
/// Transport and SDK failures are translated into one of these variants
/// before they leave a `CloudSession`.
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("Invalid cloud configuration: {0}")]
    InvalidConfig(String),

    #[error("Unauthorized to connect to cloud: {0}")]
    Unauthorized(String),

    #[error("Cloud API error: {0}")]
    ApiError(String),

    #[error("Command execution failed: {0}")]
    CommandFailed(String),

    #[error("{0} CLI not found in PATH")]
    CliNotFound(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl CloudError {
    /// Whether the cloud rejected the credentials
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;
