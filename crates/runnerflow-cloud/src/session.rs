//! Cloud session abstraction
//!
//! The provisioning pipeline reaches the cloud only through these traits, so
//! any backend (the `openstack` CLI, an HTTP client, an in-memory fake) can
//! stand behind them.

use crate::config::CloudConfig;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Resolves a credential bundle into an authenticated session
#[async_trait]
pub trait CloudConnector: Send + Sync {
    /// Connect to the first cloud of `config`
    ///
    /// Fails with `CloudError::InvalidConfig` when the bundle names no
    /// cloud and with `CloudError::Unauthorized` when the credentials are
    /// rejected. Nothing is retried here.
    async fn connect(&self, config: &CloudConfig) -> Result<Box<dyn CloudSession>>;
}

/// Operations the provisioning pipeline performs against the cloud
#[async_trait]
pub trait CloudSession: Send + Sync {
    /// Name of the cloud this session is connected to
    fn cloud_name(&self) -> &str;

    async fn list_projects(&self) -> Result<Vec<ProjectInfo>>;

    /// Images whose name (or id) equals `name_or_id`
    async fn search_images(&self, name_or_id: &str) -> Result<Vec<ImageInfo>>;

    /// Delete an image and wait for the deletion to finish
    ///
    /// Returns `false` when the cloud reports the image was not deleted.
    async fn delete_image(&self, image_id: &str) -> Result<bool>;

    /// Upload `request.filename` as a new image and wait for a terminal state
    async fn create_image(&self, request: &CreateImageRequest) -> Result<ImageInfo>;

    /// Create a server and wait for a terminal state
    async fn create_server(&self, request: &CreateServerRequest) -> Result<ServerInfo>;
}

/// Project (tenant) visible to the session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub id: String,
    pub name: String,
}

/// Image in the cloud image store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// Compute instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
}

impl ServerInfo {
    pub fn is_active(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("active"))
    }
}

/// Image upload request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateImageRequest {
    pub name: String,
    pub filename: std::path::PathBuf,
    pub disk_format: String,
    pub container_format: String,
}

impl CreateImageRequest {
    pub fn new(name: impl Into<String>, filename: impl Into<std::path::PathBuf>) -> Self {
        Self {
            name: name.into(),
            filename: filename.into(),
            disk_format: "qcow2".to_string(),
            container_format: "bare".to_string(),
        }
    }
}

/// Server creation request
#[derive(Clone, PartialEq, Eq)]
pub struct CreateServerRequest {
    pub name: String,
    pub image_id: String,
    pub flavor: String,
    /// cloud-init userdata; carries the registration token
    pub userdata: String,
}

impl fmt::Debug for CreateServerRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreateServerRequest")
            .field("name", &self.name)
            .field("image_id", &self.image_id)
            .field("flavor", &self.flavor)
            .field("userdata", &format_args!("<{} bytes>", self.userdata.len()))
            .finish()
    }
}

/// List projects of the first cloud in `config`
///
/// Used as a connectivity check; rejected credentials surface as
/// `CloudError::Unauthorized`.
pub async fn list_projects(
    connector: &dyn CloudConnector,
    config: &CloudConfig,
) -> Result<Vec<ProjectInfo>> {
    let session = connector.connect(config).await?;
    let projects = session.list_projects().await?;
    tracing::debug!(
        cloud = %session.cloud_name(),
        project_count = projects.len(),
        "Cloud connection successful"
    );
    Ok(projects)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_request_debug_hides_userdata() {
        let request = CreateServerRequest {
            name: "runner-0".to_string(),
            image_id: "img".to_string(),
            flavor: "m1.small".to_string(),
            userdata: "--token AABBCC".to_string(),
        };
        let debug = format!("{:?}", request);
        assert!(!debug.contains("AABBCC"));
        assert!(debug.contains("14 bytes"));
    }

    #[test]
    fn test_server_is_active() {
        let server = ServerInfo {
            id: "1".to_string(),
            name: "runner".to_string(),
            status: Some("ACTIVE".to_string()),
        };
        assert!(server.is_active());
    }
}
