//! Runner instance launch

use crate::bootstrap::BootstrapComposer;
use crate::error::InstanceLaunchError;
use crate::instance::InstanceConfig;
use rand::RngCore;
use rand::rngs::OsRng;
use runnerflow_cloud::{CloudConfig, CloudConnector, CreateServerRequest, RetryConfig, ServerInfo};
use runnerflow_core::{ProxyConfig, SshDebugConnection};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const DEFAULT_FLAVOR: &str = "m1.small";

/// Retry policy of instance launches: 5 attempts, 5s doubling up to 60s
pub fn default_launch_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 5,
        initial_delay: Duration::from_secs(5),
        max_delay: Duration::from_secs(60),
        backoff_multiplier: 2.0,
    }
}

/// Launches runner instances, retrying failed attempts
pub struct InstanceProvisioner {
    connector: Arc<dyn CloudConnector>,
    composer: BootstrapComposer,
    flavor: String,
    retry: RetryConfig,
    rng: Mutex<Box<dyn RngCore + Send>>,
}

impl InstanceProvisioner {
    pub fn new(connector: Arc<dyn CloudConnector>) -> Result<Self, InstanceLaunchError> {
        Ok(Self {
            connector,
            composer: BootstrapComposer::new()?,
            flavor: DEFAULT_FLAVOR.to_string(),
            retry: default_launch_retry(),
            rng: Mutex::new(Box::new(OsRng)),
        })
    }

    pub fn with_flavor(mut self, flavor: impl Into<String>) -> Self {
        self.flavor = flavor.into();
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// RNG used to pick SSH debug relays
    pub fn with_rng(mut self, rng: impl RngCore + Send + 'static) -> Self {
        self.rng = Mutex::new(Box::new(rng));
        self
    }

    pub fn flavor(&self) -> &str {
        &self.flavor
    }

    pub fn retry(&self) -> &RetryConfig {
        &self.retry
    }

    /// Launch `instance` and wait for it to reach a terminal state
    ///
    /// Rendering, connecting and server creation are retried together. The
    /// error of the last attempt is returned. Rejected credentials and an
    /// unusable cloud configuration are returned without retrying.
    #[tracing::instrument(
        skip_all,
        fields(instance = %instance.name, image_id = %instance.image.id)
    )]
    pub async fn create_instance(
        &self,
        cloud_config: &CloudConfig,
        instance: &InstanceConfig,
        proxy: Option<&ProxyConfig>,
        dockerhub_mirror: Option<&str>,
        ssh_debug_connections: &[SshDebugConnection],
    ) -> Result<ServerInfo, InstanceLaunchError> {
        let server = self
            .retry
            .run_if(
                "create_instance",
                move |attempt| {
                    tracing::debug!(attempt, "Launching instance");
                    self.launch_once(
                        cloud_config,
                        instance,
                        proxy,
                        dockerhub_mirror,
                        ssh_debug_connections,
                    )
                },
                InstanceLaunchError::is_retryable,
            )
            .await?;

        tracing::info!(server_id = %server.id, status = ?server.status, "Instance launched");
        Ok(server)
    }

    async fn launch_once(
        &self,
        cloud_config: &CloudConfig,
        instance: &InstanceConfig,
        proxy: Option<&ProxyConfig>,
        dockerhub_mirror: Option<&str>,
        ssh_debug_connections: &[SshDebugConnection],
    ) -> Result<ServerInfo, InstanceLaunchError> {
        let userdata = self.render_userdata(
            instance,
            proxy,
            dockerhub_mirror,
            ssh_debug_connections,
        )?;

        let session = self
            .connector
            .connect(cloud_config)
            .await
            .map_err(InstanceLaunchError::Connect)?;

        session
            .create_server(&CreateServerRequest {
                name: instance.name.clone(),
                image_id: instance.image.id.clone(),
                flavor: self.flavor.clone(),
                userdata,
            })
            .await
            .map_err(InstanceLaunchError::Launch)
    }

    fn render_userdata(
        &self,
        instance: &InstanceConfig,
        proxy: Option<&ProxyConfig>,
        dockerhub_mirror: Option<&str>,
        ssh_debug_connections: &[SshDebugConnection],
    ) -> Result<String, InstanceLaunchError> {
        let runner_env = {
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            self.composer.render_runner_env(
                proxy,
                dockerhub_mirror,
                ssh_debug_connections,
                &mut **rng,
            )?
        };
        Ok(self.composer.render_cloud_init(instance, &runner_env)?)
    }
}
