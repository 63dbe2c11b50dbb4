//! Source-control platform collaborator
//!
//! The API client lives outside runnerflow; the provisioning pipeline only
//! needs registration tokens and runner application metadata from it.

use crate::model::GitHubPath;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Platform client errors
#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Failed to get runner registration token: {0}")]
    RegistrationToken(String),

    #[error("Runner application not found for {os}/{arch}")]
    RunnerApplicationNotFound { os: String, arch: String },

    #[error("Platform API error: {0}")]
    Api(String),
}

/// Runner agent download metadata for one OS/architecture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerApplication {
    pub os: String,
    pub architecture: String,
    pub download_url: String,
    pub filename: String,
}

/// Platform operations consumed by the provisioning pipeline
#[async_trait]
pub trait RunnerPlatform: Send + Sync {
    /// Issue a single-use runner registration token for `path`
    async fn runner_registration_token(&self, path: &GitHubPath) -> Result<String, PlatformError>;

    /// Download metadata of the runner agent for `arch` (`x64`, `arm64`)
    async fn runner_application(
        &self,
        path: &GitHubPath,
        arch: &str,
    ) -> Result<RunnerApplication, PlatformError>;
}
