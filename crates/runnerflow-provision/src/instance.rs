//! Per-launch instance configuration

use crate::error::ProvisionError;
use rand::RngCore;
use rand::rngs::OsRng;
use runnerflow_cloud::ImageInfo;
use runnerflow_core::{GitHubPath, RunnerPlatform, merge_labels};
use std::fmt;

/// Image series label every runner carries
pub const IMAGE_SERIES_LABEL: &str = "jammy";

const NAME_SUFFIX_BYTES: usize = 12;

/// Everything needed to launch one runner instance
#[derive(Clone, PartialEq, Eq)]
pub struct InstanceConfig {
    pub name: String,
    pub labels: Vec<String>,
    pub registration_token: String,
    pub github_path: GitHubPath,
    pub image: ImageInfo,
}

impl fmt::Debug for InstanceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceConfig")
            .field("name", &self.name)
            .field("labels", &self.labels)
            .field("registration_token", &"<redacted>")
            .field("github_path", &self.github_path)
            .field("image", &self.image)
            .finish()
    }
}

/// Derive the configuration of a new instance for `unit_name` (`app/N`)
///
/// The instance is named `app-N-<24 hex chars>` and labelled
/// `[app, "jammy", extra_labels...]`. A fresh registration token is issued
/// on every call.
#[tracing::instrument(skip(image, path, extra_labels, platform), fields(path = %path))]
pub async fn create_instance_config(
    unit_name: &str,
    image: ImageInfo,
    path: &GitHubPath,
    extra_labels: &[String],
    platform: &dyn RunnerPlatform,
) -> Result<InstanceConfig, ProvisionError> {
    let (app_name, unit_num) = parse_unit_name(unit_name)?;
    let name = format!("{}-{}-{}", app_name, unit_num, random_suffix());

    let registration_token = platform.runner_registration_token(path).await?;

    let labels = merge_labels(
        &[app_name.to_string(), IMAGE_SERIES_LABEL.to_string()],
        extra_labels,
    );

    tracing::debug!(instance = %name, labels = ?labels, "Created instance config");

    Ok(InstanceConfig {
        name,
        labels,
        registration_token,
        github_path: path.clone(),
        image,
    })
}

fn parse_unit_name(unit_name: &str) -> Result<(&str, &str), ProvisionError> {
    match unit_name.rsplit_once('/') {
        Some((app, num))
            if !app.is_empty() && !num.is_empty() && num.bytes().all(|b| b.is_ascii_digit()) =>
        {
            Ok((app, num))
        }
        _ => Err(ProvisionError::InvalidUnitName(unit_name.to_string())),
    }
}

fn random_suffix() -> String {
    let mut bytes = [0u8; NAME_SUFFIX_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
