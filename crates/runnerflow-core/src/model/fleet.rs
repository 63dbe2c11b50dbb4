//! Fleet composition: which images and flavors runners are launched with

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// Image reference with the labels runners on it advertise
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub image: String,
    #[serde(default)]
    pub labels: Vec<String>,
}

/// Compute size reference with the labels runners on it advertise
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flavor {
    pub flavor: String,
    #[serde(default)]
    pub labels: Vec<String>,
}

/// Fixed-size pool for one image/flavor pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonReactiveCombination {
    pub image: Image,
    pub flavor: Flavor,
    pub base_virtual_machines: u32,
}

impl NonReactiveCombination {
    /// Image labels followed by flavor labels, without duplicates
    pub fn labels(&self) -> Vec<String> {
        merge_labels(&self.image.labels, &self.flavor.labels)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonReactiveConfiguration {
    #[serde(default)]
    pub combinations: Vec<NonReactiveCombination>,
}

impl NonReactiveConfiguration {
    /// Every image × flavor pair with the same base count
    pub fn cross(images: &[Image], flavors: &[Flavor], base_virtual_machines: u32) -> Self {
        let combinations = images
            .iter()
            .flat_map(|image| {
                flavors.iter().map(move |flavor| NonReactiveCombination {
                    image: image.clone(),
                    flavor: flavor.clone(),
                    base_virtual_machines,
                })
            })
            .collect();
        Self { combinations }
    }

    pub fn total_base_virtual_machines(&self) -> u32 {
        self.combinations
            .iter()
            .map(|c| c.base_virtual_machines)
            .sum()
    }
}

/// On-demand pool driven by a job queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawReactiveConfiguration", into = "RawReactiveConfiguration")]
pub struct ReactiveConfiguration {
    queue: QueueConfig,
    max_total_virtual_machines: u32,
    images: Vec<Image>,
    flavors: Vec<Flavor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawReactiveConfiguration {
    pub queue: QueueConfig,
    pub max_total_virtual_machines: u32,
    pub images: Vec<Image>,
    pub flavors: Vec<Flavor>,
}

impl ReactiveConfiguration {
    pub fn new(
        queue: QueueConfig,
        max_total_virtual_machines: u32,
        images: Vec<Image>,
        flavors: Vec<Flavor>,
    ) -> Result<Self> {
        if images.is_empty() || flavors.is_empty() {
            return Err(ConfigError::InvalidFleet(
                "reactive configuration needs at least one image and one flavor".to_string(),
            ));
        }

        Ok(Self {
            queue,
            max_total_virtual_machines,
            images,
            flavors,
        })
    }

    pub fn queue(&self) -> &QueueConfig {
        &self.queue
    }

    /// Cap shared by every image/flavor pair in the pool
    pub fn max_total_virtual_machines(&self) -> u32 {
        self.max_total_virtual_machines
    }

    pub fn images(&self) -> &[Image] {
        &self.images
    }

    pub fn flavors(&self) -> &[Flavor] {
        &self.flavors
    }

    pub fn combinations(&self) -> impl Iterator<Item = (&Image, &Flavor)> {
        self.images
            .iter()
            .flat_map(move |image| self.flavors.iter().map(move |flavor| (image, flavor)))
    }
}

impl TryFrom<RawReactiveConfiguration> for ReactiveConfiguration {
    type Error = ConfigError;

    fn try_from(raw: RawReactiveConfiguration) -> Result<Self> {
        Self::new(
            raw.queue,
            raw.max_total_virtual_machines,
            raw.images,
            raw.flavors,
        )
    }
}

impl From<ReactiveConfiguration> for RawReactiveConfiguration {
    fn from(config: ReactiveConfiguration) -> Self {
        Self {
            queue: config.queue,
            max_total_virtual_machines: config.max_total_virtual_machines,
            images: config.images,
            flavors: config.flavors,
        }
    }
}

/// Job queue descriptor
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawQueueConfig", into = "RawQueueConfig")]
pub struct QueueConfig {
    mongodb_uri: Url,
    queue_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawQueueConfig {
    pub mongodb_uri: Url,
    pub queue_name: String,
}

impl QueueConfig {
    pub fn new(mongodb_uri: Url, queue_name: impl Into<String>) -> Result<Self> {
        if !matches!(mongodb_uri.scheme(), "mongodb" | "mongodb+srv") {
            return Err(ConfigError::InvalidQueue(format!(
                "expected a mongodb:// or mongodb+srv:// URI, got scheme '{}'",
                mongodb_uri.scheme()
            )));
        }

        let queue_name = queue_name.into();
        if queue_name.trim().is_empty() {
            return Err(ConfigError::InvalidQueue(
                "queue name must not be empty".to_string(),
            ));
        }

        Ok(Self {
            mongodb_uri,
            queue_name,
        })
    }

    pub fn mongodb_uri(&self) -> &Url {
        &self.mongodb_uri
    }

    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }
}

// The URI usually embeds credentials.
impl std::fmt::Debug for QueueConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueConfig")
            .field("host", &self.mongodb_uri.host_str())
            .field("queue_name", &self.queue_name)
            .finish_non_exhaustive()
    }
}

impl TryFrom<RawQueueConfig> for QueueConfig {
    type Error = ConfigError;

    fn try_from(raw: RawQueueConfig) -> Result<Self> {
        Self::new(raw.mongodb_uri, raw.queue_name)
    }
}

impl From<QueueConfig> for RawQueueConfig {
    fn from(config: QueueConfig) -> Self {
        Self {
            mongodb_uri: config.mongodb_uri,
            queue_name: config.queue_name,
        }
    }
}

/// Append `extra` to `base`, keeping first occurrences only
pub fn merge_labels(base: &[String], extra: &[String]) -> Vec<String> {
    let mut labels: Vec<String> = Vec::with_capacity(base.len() + extra.len());
    for label in base.iter().chain(extra) {
        if !labels.contains(label) {
            labels.push(label.clone());
        }
    }
    labels
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(name: &str) -> Image {
        Image {
            image: name.to_string(),
            labels: vec![name.to_string()],
        }
    }

    fn flavor(name: &str) -> Flavor {
        Flavor {
            flavor: name.to_string(),
            labels: vec![name.to_string()],
        }
    }

    fn queue() -> QueueConfig {
        QueueConfig::new(Url::parse("mongodb://user:pw@mongo:27017").unwrap(), "jobs").unwrap()
    }

    #[test]
    fn test_cross_combinations() {
        let config = NonReactiveConfiguration::cross(
            &[image("jammy"), image("noble")],
            &[flavor("small"), flavor("large")],
            2,
        );
        assert_eq!(config.combinations.len(), 4);
        assert_eq!(config.total_base_virtual_machines(), 8);
        assert_eq!(config.combinations[1].image.image, "jammy");
        assert_eq!(config.combinations[1].flavor.flavor, "large");
    }

    #[test]
    fn test_combination_labels_deduplicated() {
        let combination = NonReactiveCombination {
            image: Image {
                image: "jammy".to_string(),
                labels: vec!["x64".to_string(), "jammy".to_string()],
            },
            flavor: Flavor {
                flavor: "small".to_string(),
                labels: vec!["x64".to_string(), "small".to_string()],
            },
            base_virtual_machines: 1,
        };
        assert_eq!(combination.labels(), vec!["x64", "jammy", "small"]);
    }

    #[test]
    fn test_reactive_combinations() {
        let config = ReactiveConfiguration::new(
            queue(),
            10,
            vec![image("jammy")],
            vec![flavor("small"), flavor("large")],
        )
        .unwrap();

        let pairs: Vec<_> = config
            .combinations()
            .map(|(i, f)| (i.image.as_str(), f.flavor.as_str()))
            .collect();
        assert_eq!(pairs, vec![("jammy", "small"), ("jammy", "large")]);
        assert_eq!(config.max_total_virtual_machines(), 10);
    }

    #[test]
    fn test_reactive_requires_images_and_flavors() {
        let result = ReactiveConfiguration::new(queue(), 10, vec![], vec![flavor("small")]);
        assert!(matches!(result, Err(ConfigError::InvalidFleet(_))));
    }

    #[test]
    fn test_queue_rejects_other_schemes() {
        let result = QueueConfig::new(Url::parse("redis://localhost").unwrap(), "jobs");
        assert!(matches!(result, Err(ConfigError::InvalidQueue(_))));

        let result = QueueConfig::new(Url::parse("mongodb+srv://cluster.example").unwrap(), "");
        assert!(matches!(result, Err(ConfigError::InvalidQueue(_))));
    }

    #[test]
    fn test_queue_debug_hides_credentials() {
        let debug = format!("{:?}", queue());
        assert!(!debug.contains("pw"));
        assert!(debug.contains("jobs"));
    }
}
