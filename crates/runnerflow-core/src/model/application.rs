//! Root configuration aggregate

use super::{GitHubConfiguration, NonReactiveConfiguration, ReactiveConfiguration, SupportServiceConfig};
use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};

/// Everything the provisioning pipeline needs to know about the application
///
/// Fields are private; the value cannot be changed once validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawApplicationConfiguration", into = "RawApplicationConfiguration")]
pub struct ApplicationConfiguration {
    extra_labels: Vec<String>,
    github_config: GitHubConfiguration,
    service_config: SupportServiceConfig,
    non_reactive_configuration: NonReactiveConfiguration,
    reactive_configuration: Option<ReactiveConfiguration>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawApplicationConfiguration {
    #[serde(default)]
    pub extra_labels: Vec<String>,
    pub github_config: GitHubConfiguration,
    #[serde(default)]
    pub service_config: SupportServiceConfig,
    #[serde(default)]
    pub non_reactive_configuration: NonReactiveConfiguration,
    #[serde(default)]
    pub reactive_configuration: Option<ReactiveConfiguration>,
}

impl ApplicationConfiguration {
    pub fn new(
        extra_labels: Vec<String>,
        github_config: GitHubConfiguration,
        service_config: SupportServiceConfig,
        non_reactive_configuration: NonReactiveConfiguration,
        reactive_configuration: Option<ReactiveConfiguration>,
    ) -> Result<Self> {
        if let Some(label) = extra_labels.iter().find(|l| !is_valid_label(l)) {
            return Err(ConfigError::InvalidFleet(format!(
                "invalid label '{}': labels must be non-empty and use only ASCII letters, digits, '.', '_' or '-'",
                label
            )));
        }

        Ok(Self {
            extra_labels,
            github_config,
            service_config,
            non_reactive_configuration,
            reactive_configuration,
        })
    }

    /// Labels applied to every runner
    pub fn extra_labels(&self) -> &[String] {
        &self.extra_labels
    }

    pub fn github_config(&self) -> &GitHubConfiguration {
        &self.github_config
    }

    pub fn service_config(&self) -> &SupportServiceConfig {
        &self.service_config
    }

    pub fn non_reactive_configuration(&self) -> &NonReactiveConfiguration {
        &self.non_reactive_configuration
    }

    pub fn reactive_configuration(&self) -> Option<&ReactiveConfiguration> {
        self.reactive_configuration.as_ref()
    }

    pub fn is_reactive(&self) -> bool {
        self.reactive_configuration.is_some()
    }
}

impl TryFrom<RawApplicationConfiguration> for ApplicationConfiguration {
    type Error = ConfigError;

    fn try_from(raw: RawApplicationConfiguration) -> Result<Self> {
        Self::new(
            raw.extra_labels,
            raw.github_config,
            raw.service_config,
            raw.non_reactive_configuration,
            raw.reactive_configuration,
        )
    }
}

impl From<ApplicationConfiguration> for RawApplicationConfiguration {
    fn from(config: ApplicationConfiguration) -> Self {
        Self {
            extra_labels: config.extra_labels,
            github_config: config.github_config,
            service_config: config.service_config,
            non_reactive_configuration: config.non_reactive_configuration,
            reactive_configuration: config.reactive_configuration,
        }
    }
}

// Labels are comma-joined into the runner registration command line.
fn is_valid_label(label: &str) -> bool {
    !label.is_empty()
        && label
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'))
}
