use runnerflow_cloud::CloudError;
use runnerflow_core::{PlatformError, TemplateError};
use thiserror::Error;

/// Failure of one instance launch attempt
#[derive(Debug, Error)]
pub enum InstanceLaunchError {
    #[error("Failed to render bootstrap payload: {0}")]
    Render(#[from] TemplateError),

    #[error("Failed to connect to the cloud: {0}")]
    Connect(#[source] CloudError),

    #[error("Failed to launch instance: {0}")]
    Launch(#[source] CloudError),
}

impl InstanceLaunchError {
    /// Whether another launch attempt can succeed
    ///
    /// Rejected credentials and an unusable cloud configuration fail every
    /// attempt the same way.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connect(cause) => {
                !(cause.is_unauthorized() || matches!(cause, CloudError::InvalidConfig(_)))
            }
            Self::Render(_) | Self::Launch(_) => true,
        }
    }
}

/// Failure to derive an instance configuration
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("Invalid unit name '{0}': expected <app>/<number>")]
    InvalidUnitName(String),

    #[error("Failed to get registration token: {0}")]
    Platform(#[from] PlatformError),
}
