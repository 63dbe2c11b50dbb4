//! runnerflow core
//!
//! Shared building blocks of the runner provisioning pipeline:
//!
//! - [`model`]: the typed, validated application configuration
//! - [`platform`]: the source-control platform collaborator contract
//! - [`template`]: Tera-based rendering of bootstrap payloads

pub mod error;
pub mod model;
pub mod platform;
pub mod template;

pub use error::{ConfigError, Result, TemplateError};
pub use model::*;
pub use platform::{PlatformError, RunnerApplication, RunnerPlatform};
pub use template::{TemplateProcessor, Variables};
