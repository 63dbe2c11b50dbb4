//! OpenStack provider for runnerflow
//!
//! Implements `CloudConnector`/`CloudSession` on top of the `openstack` CLI.
//!
//! # Requirements
//!
//! - `openstack` (python-openstackclient) must be installed
//! - Credentials come from the `CloudConfig` handed to `connect`; they are
//!   written to a private temporary `clouds.yaml` for the session's lifetime
//!
//! # Example
//!
//! ```ignore
//! use runnerflow_cloud::{CloudConfig, CloudConnector};
//! use runnerflow_cloud_openstack::OpenstackConnector;
//!
//! let config = CloudConfig::from_file("clouds.yaml".as_ref()).await?;
//! let session = OpenstackConnector::new().connect(&config).await?;
//! let images = session.search_images("jammy").await?;
//! ```

pub mod cli;
pub mod provider;

pub use cli::OpenstackCli;
pub use provider::{OpenstackConnector, OpenstackSession};
