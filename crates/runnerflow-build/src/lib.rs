//! runnerflow runner image build
//!
//! Drives the image build script for a runner architecture and replaces the
//! runner image in the cloud image store with its output.
//!
//! ```ignore
//! use runnerflow_build::ImageBuilder;
//! use runnerflow_cloud_openstack::OpenstackConnector;
//!
//! let builder = ImageBuilder::new(Arc::new(OpenstackConnector::new()))?;
//! let image_id = builder
//!     .build_image("x64", &cloud_config, &github, &path, proxy.as_ref())
//!     .await?;
//! ```

pub mod arch;
pub mod builder;
pub mod error;
pub mod payload;
pub mod script;

pub use arch::{ImageArch, RunnerArch};
pub use builder::{ImageBuilder, ImageBuilderOptions};
pub use error::{ImageBuildError, Result, ScriptError};
pub use payload::{ProxyStrings, docker_client_proxy_json, render_docker_proxy_unit};
pub use script::{BashBuildScript, BuildCommand, BuildScript};
