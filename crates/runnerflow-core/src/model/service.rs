//! Supporting services available to runners

use super::{ProxyConfig, SshDebugConnection};
use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Configuration for supporting services for runners
///
/// Every field is optional; an absent field disables the feature.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportServiceConfig {
    #[serde(default)]
    pub proxy_config: Option<ProxyConfig>,

    /// Dockerhub mirror URL, used to avoid rate limiting
    #[serde(default)]
    pub dockerhub_mirror: Option<String>,

    #[serde(default)]
    pub ssh_debug_connections: Option<Vec<SshDebugConnection>>,

    #[serde(default)]
    pub repo_policy_compliance: Option<RepoPolicyComplianceConfig>,
}

impl SupportServiceConfig {
    /// Proxy config, if it sets a proxy
    pub fn effective_proxy(&self) -> Option<&ProxyConfig> {
        ProxyConfig::effective(self.proxy_config.as_ref())
    }

    pub fn dockerhub_mirror(&self) -> Option<&str> {
        self.dockerhub_mirror.as_deref().filter(|m| !m.is_empty())
    }

    pub fn ssh_debug_connections(&self) -> &[SshDebugConnection] {
        self.ssh_debug_connections.as_deref().unwrap_or_default()
    }
}

/// Repo policy compliance service endpoint
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRepoPolicyComplianceConfig", into = "RawRepoPolicyComplianceConfig")]
pub struct RepoPolicyComplianceConfig {
    url: Url,
    token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRepoPolicyComplianceConfig {
    pub url: Url,
    pub token: String,
}

impl RepoPolicyComplianceConfig {
    pub fn new(url: Url, token: impl Into<String>) -> Result<Self> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidRepoPolicy(format!(
                "url must use http or https: {}",
                url
            )));
        }

        let token = token.into();
        if token.trim().is_empty() {
            return Err(ConfigError::InvalidRepoPolicy(
                "token must not be empty".to_string(),
            ));
        }

        Ok(Self { url, token })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for RepoPolicyComplianceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepoPolicyComplianceConfig")
            .field("url", &self.url.as_str())
            .field("token", &"<redacted>")
            .finish()
    }
}

impl TryFrom<RawRepoPolicyComplianceConfig> for RepoPolicyComplianceConfig {
    type Error = ConfigError;

    fn try_from(raw: RawRepoPolicyComplianceConfig) -> Result<Self> {
        Self::new(raw.url, raw.token)
    }
}

impl From<RepoPolicyComplianceConfig> for RawRepoPolicyComplianceConfig {
    fn from(config: RepoPolicyComplianceConfig) -> Self {
        Self {
            url: config.url,
            token: config.token,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_policy_requires_token() {
        let url = Url::parse("https://policy.internal").unwrap();
        assert!(RepoPolicyComplianceConfig::new(url.clone(), "").is_err());

        let config = RepoPolicyComplianceConfig::new(url, "s3cret").unwrap();
        assert_eq!(config.token(), "s3cret");
        assert!(!format!("{:?}", config).contains("s3cret"));
    }

    #[test]
    fn test_repo_policy_missing_field_fails() {
        let json = serde_json::json!({ "url": "https://policy.internal" });
        assert!(serde_json::from_value::<RepoPolicyComplianceConfig>(json).is_err());
    }

    #[test]
    fn test_empty_service_config_disables_everything() {
        let config: SupportServiceConfig = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(config.effective_proxy().is_none());
        assert!(config.dockerhub_mirror().is_none());
        assert!(config.ssh_debug_connections().is_empty());
        assert!(config.repo_policy_compliance.is_none());
    }

    #[test]
    fn test_no_proxy_only_is_treated_as_unset() {
        let config: SupportServiceConfig = serde_json::from_value(serde_json::json!({
            "proxy_config": { "no_proxy": "localhost" }
        }))
        .unwrap();
        assert!(config.proxy_config.is_some());
        assert!(config.effective_proxy().is_none());
    }
}
