//! In-memory cloud for tests
//!
//! Enabled with the `test-utils` feature. `FakeCloud` is both the connector
//! and the backing store of every session it hands out, so tests can inspect
//! what the code under test did to the cloud.

use crate::config::CloudConfig;
use crate::error::{CloudError, Result};
use crate::session::{
    CloudConnector, CloudSession, CreateImageRequest, CreateServerRequest, ImageInfo,
    ProjectInfo, ServerInfo,
};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct FakeCloudState {
    images: Vec<ImageInfo>,
    servers: Vec<ServerInfo>,
    next_id: u64,
    connect_calls: u32,
    create_server_calls: u32,
    server_failures_remaining: u32,
    reject_credentials: bool,
    refuse_image_deletion: bool,
    fail_image_upload: bool,
    userdata: Vec<String>,
}

impl FakeCloudState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{:04}", prefix, self.next_id)
    }
}

/// In-memory cloud implementing [`CloudConnector`]
#[derive(Debug, Clone, Default)]
pub struct FakeCloud {
    state: Arc<Mutex<FakeCloudState>>,
}

impl FakeCloud {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, FakeCloudState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Seed the image store
    pub fn with_image(self, name: &str) -> Self {
        {
            let mut state = self.state();
            let id = state.next_id("image");
            state.images.push(ImageInfo {
                id,
                name: name.to_string(),
                status: Some("active".to_string()),
            });
        }
        self
    }

    /// Fail the next `count` server creations
    pub fn fail_server_creations(self, count: u32) -> Self {
        self.state().server_failures_remaining = count;
        self
    }

    /// Reject every connection as unauthorized
    pub fn reject_credentials(self) -> Self {
        self.state().reject_credentials = true;
        self
    }

    /// Report every image deletion as not performed
    pub fn refuse_image_deletion(self) -> Self {
        self.state().refuse_image_deletion = true;
        self
    }

    /// Fail every image upload with an API error
    pub fn fail_image_upload(self) -> Self {
        self.state().fail_image_upload = true;
        self
    }

    pub fn images_named(&self, name: &str) -> usize {
        self.state().images.iter().filter(|i| i.name == name).count()
    }

    pub fn images(&self) -> Vec<ImageInfo> {
        self.state().images.clone()
    }

    pub fn servers(&self) -> Vec<ServerInfo> {
        self.state().servers.clone()
    }

    pub fn connect_calls(&self) -> u32 {
        self.state().connect_calls
    }

    pub fn create_server_calls(&self) -> u32 {
        self.state().create_server_calls
    }

    /// Userdata of every server creation request, in order
    pub fn userdata(&self) -> Vec<String> {
        self.state().userdata.clone()
    }
}

#[async_trait]
impl CloudConnector for FakeCloud {
    async fn connect(&self, config: &CloudConfig) -> Result<Box<dyn CloudSession>> {
        let cloud_name = config.select_cloud()?.to_string();

        let mut state = self.state();
        state.connect_calls += 1;
        if state.reject_credentials {
            return Err(CloudError::Unauthorized(format!(
                "credentials for {} rejected",
                cloud_name
            )));
        }

        Ok(Box::new(FakeSession {
            cloud: self.clone(),
            cloud_name,
        }))
    }
}

struct FakeSession {
    cloud: FakeCloud,
    cloud_name: String,
}

#[async_trait]
impl CloudSession for FakeSession {
    fn cloud_name(&self) -> &str {
        &self.cloud_name
    }

    async fn list_projects(&self) -> Result<Vec<ProjectInfo>> {
        Ok(vec![ProjectInfo {
            id: "project-0001".to_string(),
            name: "ci".to_string(),
        }])
    }

    async fn search_images(&self, name_or_id: &str) -> Result<Vec<ImageInfo>> {
        Ok(self
            .cloud
            .state()
            .images
            .iter()
            .filter(|i| i.name == name_or_id || i.id == name_or_id)
            .cloned()
            .collect())
    }

    async fn delete_image(&self, image_id: &str) -> Result<bool> {
        let mut state = self.cloud.state();
        if state.refuse_image_deletion {
            return Ok(false);
        }
        let before = state.images.len();
        state.images.retain(|i| i.id != image_id);
        Ok(state.images.len() < before)
    }

    async fn create_image(&self, request: &CreateImageRequest) -> Result<ImageInfo> {
        let mut state = self.cloud.state();
        if state.fail_image_upload {
            return Err(CloudError::ApiError(format!(
                "upload of {} failed",
                request.filename.display()
            )));
        }
        let image = ImageInfo {
            id: state.next_id("image"),
            name: request.name.clone(),
            status: Some("active".to_string()),
        };
        state.images.push(image.clone());
        Ok(image)
    }

    async fn create_server(&self, request: &CreateServerRequest) -> Result<ServerInfo> {
        let mut state = self.cloud.state();
        state.create_server_calls += 1;
        state.userdata.push(request.userdata.clone());

        if state.server_failures_remaining > 0 {
            state.server_failures_remaining -= 1;
            return Err(CloudError::ApiError(
                "Quota exceeded for instances".to_string(),
            ));
        }

        let server = ServerInfo {
            id: state.next_id("server"),
            name: request.name.clone(),
            status: Some("ACTIVE".to_string()),
        };
        state.servers.push(server.clone());
        Ok(server)
    }
}
