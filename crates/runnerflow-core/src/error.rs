use thiserror::Error;

/// Configuration validation errors
///
/// Every validated type in [`crate::model`] is built through a constructor
/// that returns this error, so an invalid value never exists.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid proxy configuration: {0}")]
    InvalidProxy(String),

    #[error("Invalid SSH debug connection: {0}")]
    InvalidSshDebug(String),

    #[error("Invalid repo policy compliance configuration: {0}")]
    InvalidRepoPolicy(String),

    #[error("Invalid queue configuration: {0}")]
    InvalidQueue(String),

    #[error("Invalid GitHub path: {0}")]
    InvalidGitHubPath(String),

    #[error("Invalid fleet configuration: {0}")]
    InvalidFleet(String),
}

/// Template errors
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Template parse error: {name}\nReason: {message}")]
    Parse { name: String, message: String },

    #[error("Template render error: {name}\nReason: {message}")]
    Render { name: String, message: String },
}

pub type Result<T> = std::result::Result<T, ConfigError>;
