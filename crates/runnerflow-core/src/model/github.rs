//! Target repository/organisation on the source-control platform

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_RUNNER_GROUP: &str = "default";

/// Where runners are registered
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum GitHubPath {
    /// Organisation-level runners in a runner group
    Org { org: String, group: String },
    /// Repository-level runners
    Repo { owner: String, repo: String },
}

impl GitHubPath {
    /// Parse `owner/repo` or `org`
    ///
    /// `group` only applies to organisation paths.
    pub fn parse(path: &str, group: Option<&str>) -> Result<Self> {
        let path = path.trim();
        if path.is_empty() {
            return Err(ConfigError::InvalidGitHubPath("path is empty".to_string()));
        }

        match path.split_once('/') {
            Some((owner, repo)) => {
                if owner.is_empty() || repo.is_empty() || repo.contains('/') {
                    return Err(ConfigError::InvalidGitHubPath(format!(
                        "expected <owner>/<repo> or <org>, got '{}'",
                        path
                    )));
                }
                Ok(Self::Repo {
                    owner: owner.to_string(),
                    repo: repo.to_string(),
                })
            }
            None => Ok(Self::Org {
                org: path.to_string(),
                group: group
                    .filter(|g| !g.is_empty())
                    .unwrap_or(DEFAULT_RUNNER_GROUP)
                    .to_string(),
            }),
        }
    }

    /// `owner/repo` or `org`
    pub fn path(&self) -> String {
        match self {
            Self::Org { org, .. } => org.clone(),
            Self::Repo { owner, repo } => format!("{}/{}", owner, repo),
        }
    }
}

impl fmt::Display for GitHubPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Platform identity and credentials
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawGitHubConfiguration", into = "RawGitHubConfiguration")]
pub struct GitHubConfiguration {
    pub token: String,
    pub path: GitHubPath,
}

/// Wire form: `path` is `owner/repo` or `org`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawGitHubConfiguration {
    pub token: String,
    pub path: String,
    #[serde(default)]
    pub runner_group: Option<String>,
}

impl TryFrom<RawGitHubConfiguration> for GitHubConfiguration {
    type Error = ConfigError;

    fn try_from(raw: RawGitHubConfiguration) -> Result<Self> {
        Ok(Self {
            token: raw.token,
            path: GitHubPath::parse(&raw.path, raw.runner_group.as_deref())?,
        })
    }
}

impl From<GitHubConfiguration> for RawGitHubConfiguration {
    fn from(config: GitHubConfiguration) -> Self {
        let runner_group = match &config.path {
            GitHubPath::Org { group, .. } => Some(group.clone()),
            GitHubPath::Repo { .. } => None,
        };
        Self {
            token: config.token,
            path: config.path.path(),
            runner_group,
        }
    }
}

impl fmt::Debug for GitHubConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubConfiguration")
            .field("token", &"<redacted>")
            .field("path", &self.path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_repo() {
        let path = GitHubPath::parse("canonical/runner", Some("ignored")).unwrap();
        assert_eq!(
            path,
            GitHubPath::Repo {
                owner: "canonical".to_string(),
                repo: "runner".to_string()
            }
        );
        assert_eq!(path.path(), "canonical/runner");
    }

    #[test]
    fn test_parse_org_default_group() {
        let path = GitHubPath::parse("canonical", None).unwrap();
        assert_eq!(
            path,
            GitHubPath::Org {
                org: "canonical".to_string(),
                group: DEFAULT_RUNNER_GROUP.to_string()
            }
        );
        assert_eq!(path.to_string(), "canonical");
    }

    #[test]
    fn test_parse_invalid() {
        assert!(GitHubPath::parse("", None).is_err());
        assert!(GitHubPath::parse("a/b/c", None).is_err());
        assert!(GitHubPath::parse("/repo", None).is_err());
    }

    #[test]
    fn test_deserialize_org_with_group() {
        let config: GitHubConfiguration = serde_json::from_value(serde_json::json!({
            "token": "ghp_x",
            "path": "canonical",
            "runner_group": "ci",
        }))
        .unwrap();
        assert_eq!(
            config.path,
            GitHubPath::Org {
                org: "canonical".to_string(),
                group: "ci".to_string()
            }
        );
    }

    #[test]
    fn test_debug_hides_token() {
        let config = GitHubConfiguration {
            token: "ghp_secret".to_string(),
            path: GitHubPath::parse("org", None).unwrap(),
        };
        assert!(!format!("{:?}", config).contains("ghp_secret"));
    }
}
