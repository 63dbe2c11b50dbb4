//! Cloud credential bundle (`clouds.yaml`)

use crate::error::{CloudError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Credential bundle keyed by cloud name, in `clouds.yaml` format
///
/// Cloud order is preserved; the first cloud is the one used to connect.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudConfig {
    #[serde(default)]
    clouds: serde_yaml::Mapping,
}

impl CloudConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub async fn from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_yaml_str(&content)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Cloud names in document order
    pub fn cloud_names(&self) -> Vec<&str> {
        self.clouds.keys().filter_map(|k| k.as_str()).collect()
    }

    /// Name of the cloud to connect to
    ///
    /// With several clouds the first one wins and a warning is logged.
    pub fn select_cloud(&self) -> Result<&str> {
        let names = self.cloud_names();
        match names.as_slice() {
            [] => Err(CloudError::InvalidConfig(
                "no clouds defined in cloud configuration".to_string(),
            )),
            [only] => Ok(*only),
            [first, ..] => {
                tracing::warn!(
                    cloud = %first,
                    cloud_count = names.len(),
                    "Multiple clouds defined in cloud configuration. Using the first one to connect."
                );
                Ok(*first)
            }
        }
    }

    /// Profile of a named cloud
    pub fn profile(&self, name: &str) -> Option<&serde_yaml::Value> {
        self.clouds.get(name)
    }
}

// Profiles hold passwords and application credentials.
impl fmt::Debug for CloudConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudConfig")
            .field("clouds", &self.cloud_names())
            .finish()
    }
}
