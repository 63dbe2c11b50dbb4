//! Configuration model
//!
//! Typed, validated description of the runner fleet and the services its
//! runners use. Values are validated when they are constructed (or
//! deserialized) and are never mutated afterwards.

mod application;
mod fleet;
mod github;
mod proxy;
mod service;
mod ssh_debug;

pub use application::{ApplicationConfiguration, RawApplicationConfiguration};
pub use fleet::{
    Flavor, Image, NonReactiveCombination, NonReactiveConfiguration, QueueConfig,
    RawQueueConfig, RawReactiveConfiguration, ReactiveConfiguration, merge_labels,
};
pub use github::{DEFAULT_RUNNER_GROUP, GitHubConfiguration, GitHubPath, RawGitHubConfiguration};
pub use proxy::{ProxyConfig, RawProxyConfig};
pub use service::{RawRepoPolicyComplianceConfig, RepoPolicyComplianceConfig, SupportServiceConfig};
pub use ssh_debug::{RawSshDebugConnection, SshDebugConnection};
