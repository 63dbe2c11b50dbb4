//! OpenStack connector and session

use crate::cli::{DEFAULT_PROGRAM, OpenstackCli};
use async_trait::async_trait;
use runnerflow_cloud::{
    CloudConfig, CloudConnector, CloudError, CloudSession, CreateImageRequest,
    CreateServerRequest, ImageInfo, ProjectInfo, Result, ServerInfo,
};
use std::path::PathBuf;
use std::time::Duration;
use tempfile::NamedTempFile;

const DEFAULT_IMAGE_POLL_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_IMAGE_UPLOAD_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Connects to OpenStack through the `openstack` CLI
#[derive(Debug, Clone)]
pub struct OpenstackConnector {
    program: PathBuf,
    image_poll_interval: Duration,
    image_upload_timeout: Duration,
}

impl Default for OpenstackConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenstackConnector {
    pub fn new() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_PROGRAM),
            image_poll_interval: DEFAULT_IMAGE_POLL_INTERVAL,
            image_upload_timeout: DEFAULT_IMAGE_UPLOAD_TIMEOUT,
        }
    }

    /// Use a specific `openstack` executable
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// How often and how long to wait for an uploaded image to become active
    pub fn with_image_wait(mut self, poll_interval: Duration, timeout: Duration) -> Self {
        self.image_poll_interval = poll_interval;
        self.image_upload_timeout = timeout;
        self
    }
}

#[async_trait]
impl CloudConnector for OpenstackConnector {
    #[tracing::instrument(skip_all)]
    async fn connect(&self, config: &CloudConfig) -> Result<Box<dyn CloudSession>> {
        let cloud = config.select_cloud()?.to_string();

        OpenstackCli::check_installed(&self.program).await?;

        // The CLI reads credentials from this file; it lives as long as the session.
        let config_file = NamedTempFile::new()?;
        tokio::fs::write(config_file.path(), config.to_yaml_string()?).await?;

        let cli = OpenstackCli::new(&self.program, &cloud, config_file.path());
        let token = cli.issue_token().await?;
        tracing::debug!(
            cloud = %cloud,
            project_id = ?token.project_id,
            "Authenticated to OpenStack"
        );

        Ok(Box::new(OpenstackSession {
            cli,
            _config_file: config_file,
            image_poll_interval: self.image_poll_interval,
            image_upload_timeout: self.image_upload_timeout,
        }))
    }
}

/// Authenticated OpenStack session
pub struct OpenstackSession {
    cli: OpenstackCli,
    _config_file: NamedTempFile,
    image_poll_interval: Duration,
    image_upload_timeout: Duration,
}

impl OpenstackSession {
    /// Poll an image until it is active
    async fn wait_for_image(&self, image_id: &str) -> Result<ImageInfo> {
        let deadline = tokio::time::Instant::now() + self.image_upload_timeout;

        loop {
            let image = self.cli.show_image(image_id).await?;
            if image.is_active() {
                return Ok(ImageInfo {
                    id: image.id,
                    name: image.name,
                    status: image.status,
                });
            }
            if image.is_failed() {
                return Err(CloudError::ApiError(format!(
                    "image {} ended in status {}",
                    image_id,
                    image.status.as_deref().unwrap_or("unknown")
                )));
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(CloudError::Timeout(format!(
                    "image {} not active after {}s",
                    image_id,
                    self.image_upload_timeout.as_secs()
                )));
            }

            tracing::debug!(image_id = %image_id, status = ?image.status, "Waiting for image");
            tokio::time::sleep(self.image_poll_interval).await;
        }
    }
}

#[async_trait]
impl CloudSession for OpenstackSession {
    fn cloud_name(&self) -> &str {
        self.cli.cloud()
    }

    async fn list_projects(&self) -> Result<Vec<ProjectInfo>> {
        let projects = self.cli.list_projects().await?;
        Ok(projects
            .into_iter()
            .map(|p| ProjectInfo {
                id: p.id,
                name: p.name,
            })
            .collect())
    }

    async fn search_images(&self, name_or_id: &str) -> Result<Vec<ImageInfo>> {
        let images = self.cli.list_images(name_or_id).await?;
        Ok(images
            .into_iter()
            .map(|i| ImageInfo {
                id: i.id,
                name: i.name,
                status: i.status,
            })
            .collect())
    }

    async fn delete_image(&self, image_id: &str) -> Result<bool> {
        self.cli.delete_image(image_id).await
    }

    #[tracing::instrument(skip_all, fields(image = %request.name))]
    async fn create_image(&self, request: &CreateImageRequest) -> Result<ImageInfo> {
        let created = self
            .cli
            .create_image(
                &request.name,
                &request.filename,
                &request.disk_format,
                &request.container_format,
            )
            .await?;

        self.wait_for_image(&created.id).await
    }

    #[tracing::instrument(skip_all, fields(server = %request.name))]
    async fn create_server(&self, request: &CreateServerRequest) -> Result<ServerInfo> {
        let userdata_file = NamedTempFile::new()?;
        tokio::fs::write(userdata_file.path(), &request.userdata).await?;

        let server = self
            .cli
            .create_server(
                &request.name,
                &request.image_id,
                &request.flavor,
                userdata_file.path(),
            )
            .await?;

        if server
            .status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("error"))
        {
            return Err(CloudError::ApiError(format!(
                "server {} entered ERROR state",
                server.name
            )));
        }

        Ok(ServerInfo {
            id: server.id,
            name: server.name,
            status: server.status,
        })
    }
}
