//! runnerflow instance provisioning
//!
//! Turns configuration and a freshly issued registration token into a
//! running runner instance:
//!
//! 1. [`create_instance_config`] names the instance and fetches the token
//! 2. [`BootstrapComposer`] renders the runner `.env` and cloud-init userdata
//! 3. [`InstanceProvisioner`] launches the instance, retrying with backoff

pub mod bootstrap;
pub mod error;
pub mod instance;
pub mod provisioner;

pub use bootstrap::BootstrapComposer;
pub use error::{InstanceLaunchError, ProvisionError};
pub use instance::{InstanceConfig, create_instance_config};
pub use provisioner::{DEFAULT_FLAVOR, InstanceProvisioner, default_launch_retry};
