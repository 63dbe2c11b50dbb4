//! Runner image build and upload

use crate::arch::{ImageArch, RunnerArch};
use crate::error::{ImageBuildError, Result};
use crate::payload::{self, ProxyStrings};
use crate::script::{BashBuildScript, BuildCommand, BuildScript};
use runnerflow_cloud::{CloudConfig, CloudConnector, CreateImageRequest};
use runnerflow_core::{
    GitHubPath, ProxyConfig, RunnerApplication, RunnerPlatform, TemplateProcessor,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

pub const DEFAULT_IMAGE_NAME: &str = "jammy";
pub const DEFAULT_IMAGE_FILE_TEMPLATE: &str = "jammy-server-cloudimg-{{ arch }}-compressed.img";
pub const DEFAULT_BUILD_SCRIPT: &str = "scripts/build-openstack-image.sh";

/// Names and locations used by [`ImageBuilder`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBuilderOptions {
    /// Name of the uploaded image; existing images with it are replaced
    pub image_name: String,
    /// File the build script produces; `{{ arch }}` is the image architecture
    pub image_file_template: String,
    pub script_path: PathBuf,
    /// Directory the script runs in and the image file is read from
    pub working_dir: Option<PathBuf>,
}

impl Default for ImageBuilderOptions {
    fn default() -> Self {
        Self {
            image_name: DEFAULT_IMAGE_NAME.to_string(),
            image_file_template: DEFAULT_IMAGE_FILE_TEMPLATE.to_string(),
            script_path: PathBuf::from(DEFAULT_BUILD_SCRIPT),
            working_dir: None,
        }
    }
}

/// Builds the runner image and replaces it in the cloud image store
pub struct ImageBuilder {
    connector: Arc<dyn CloudConnector>,
    script: Arc<dyn BuildScript>,
    templates: TemplateProcessor,
    options: ImageBuilderOptions,
}

impl ImageBuilder {
    pub fn new(connector: Arc<dyn CloudConnector>) -> Result<Self> {
        Ok(Self {
            connector,
            script: Arc::new(BashBuildScript::new()),
            templates: payload::templates()?,
            options: ImageBuilderOptions::default(),
        })
    }

    pub fn with_script(mut self, script: Arc<dyn BuildScript>) -> Self {
        self.script = script;
        self
    }

    pub fn with_options(mut self, options: ImageBuilderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &ImageBuilderOptions {
        &self.options
    }

    /// Build the runner image for `arch` and upload it
    ///
    /// Every existing image with the configured name is deleted first, so at
    /// most one remains. Returns the id of the uploaded image.
    #[tracing::instrument(skip_all, fields(arch = %arch, path = %path))]
    pub async fn build_image(
        &self,
        arch: &str,
        cloud_config: &CloudConfig,
        platform: &dyn RunnerPlatform,
        path: &GitHubPath,
        proxy: Option<&ProxyConfig>,
    ) -> Result<String> {
        let runner_arch: RunnerArch = arch.parse()?;
        let application = platform
            .runner_application(path, runner_arch.as_str())
            .await?;
        let image_arch = application_image_arch(&application)?;

        let command = self.build_command(&application, proxy)?;
        self.script.run(&command).await?;

        self.replace_image(cloud_config, image_arch).await
    }

    /// Script invocation for `application`
    ///
    /// Arguments: download URL, http proxy, https proxy, no_proxy, docker
    /// proxy unit, docker client JSON.
    pub fn build_command(
        &self,
        application: &RunnerApplication,
        proxy: Option<&ProxyConfig>,
    ) -> Result<BuildCommand> {
        let proxy = ProxyStrings::from_config(proxy);
        let docker_proxy_unit = payload::render_docker_proxy_unit(&self.templates, &proxy)?;
        let docker_client_json = payload::docker_client_proxy_json(&proxy);

        Ok(BuildCommand {
            script: self.options.script_path.clone(),
            args: vec![
                application.download_url.clone(),
                proxy.http,
                proxy.https,
                proxy.no_proxy,
                docker_proxy_unit,
                docker_client_json,
            ],
            working_dir: self.options.working_dir.clone(),
        })
    }

    /// Path of the image file the script produced for `arch`
    pub fn image_file(&self, arch: ImageArch) -> Result<PathBuf> {
        #[derive(Serialize)]
        struct FileVars<'a> {
            arch: &'a str,
        }

        let file = TemplateProcessor::render_str(
            &self.options.image_file_template,
            &FileVars {
                arch: arch.as_str(),
            },
        )?;

        Ok(match &self.options.working_dir {
            Some(dir) => dir.join(file),
            None => PathBuf::from(file),
        })
    }

    async fn replace_image(&self, cloud_config: &CloudConfig, arch: ImageArch) -> Result<String> {
        let image_name = &self.options.image_name;
        let filename = self.image_file(arch)?;

        let session = self
            .connector
            .connect(cloud_config)
            .await
            .map_err(ImageBuildError::Connect)?;

        // Same-named images with different ids break server creation.
        let existing = session
            .search_images(image_name)
            .await
            .map_err(ImageBuildError::Upload)?;
        for image in existing {
            let deleted = session
                .delete_image(&image.id)
                .await
                .map_err(ImageBuildError::Upload)?;
            if !deleted {
                return Err(ImageBuildError::DeleteDuplicate(image.id));
            }
            tracing::info!(image_id = %image.id, "Deleted previous image");
        }

        let image = session
            .create_image(&CreateImageRequest::new(image_name.as_str(), &filename))
            .await
            .map_err(ImageBuildError::Upload)?;

        tracing::info!(
            image_id = %image.id,
            image = %image_name,
            cloud = %session.cloud_name(),
            "Uploaded runner image"
        );
        Ok(image.id)
    }
}

fn application_image_arch(application: &RunnerApplication) -> Result<ImageArch> {
    application
        .architecture
        .parse::<RunnerArch>()
        .map(|arch| arch.image_arch())
}
