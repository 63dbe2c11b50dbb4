//! runnerflow Cloud Abstraction
//!
//! This crate defines how the provisioning pipeline talks to a cloud:
//! a credential bundle, a connector that turns it into a session, and the
//! handful of image and server operations the pipeline needs.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐   ┌──────────────────────┐
//! │  runnerflow-build    │   │ runnerflow-provision │
//! │   (ImageBuilder)     │   │ (InstanceProvisioner)│
//! └──────────┬───────────┘   └──────────┬───────────┘
//!            │                          │
//! ┌──────────▼──────────────────────────▼───────────┐
//! │                runnerflow-cloud                  │
//! │  trait CloudConnector   trait CloudSession       │
//! │  CloudConfig (clouds.yaml)   RetryConfig         │
//! └──────────────────────┬──────────────────────────┘
//!                        │
//!             ┌──────────▼───────────┐
//!             │ runnerflow-cloud-    │
//!             │ openstack (CLI)      │
//!             └──────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod retry;
pub mod session;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-exports
pub use config::CloudConfig;
pub use error::{CloudError, Result};
pub use retry::RetryConfig;
pub use session::{
    CloudConnector, CloudSession, CreateImageRequest, CreateServerRequest, ImageInfo,
    ProjectInfo, ServerInfo, list_projects,
};
