//! openstack CLI wrapper
//!
//! Wraps python-openstackclient commands. Every command runs against one
//! named cloud from a private `clouds.yaml`, with JSON output.

use runnerflow_cloud::{CloudError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

pub const DEFAULT_PROGRAM: &str = "openstack";

/// openstack CLI wrapper
#[derive(Debug, Clone)]
pub struct OpenstackCli {
    program: PathBuf,
    cloud: String,
    config_file: PathBuf,
}

impl OpenstackCli {
    pub fn new(
        program: impl Into<PathBuf>,
        cloud: impl Into<String>,
        config_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            program: program.into(),
            cloud: cloud.into(),
            config_file: config_file.into(),
        }
    }

    pub fn cloud(&self) -> &str {
        &self.cloud
    }

    /// Check that the CLI is on PATH (or that an explicit path exists)
    pub async fn check_installed(program: &Path) -> Result<()> {
        let which = Command::new("which").arg(program).output().await?;

        if !which.status.success() {
            return Err(CloudError::CliNotFound(program.display().to_string()));
        }
        Ok(())
    }

    /// Run an openstack command and return stdout
    async fn run_command(&self, args: &[&str]) -> Result<String> {
        let mut cmd = Command::new(&self.program);
        cmd.env("OS_CLIENT_CONFIG_FILE", &self.config_file);
        cmd.arg("--os-cloud").arg(&self.cloud);
        cmd.args(args);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        // Arguments never carry secrets: userdata goes through a file.
        tracing::debug!(
            "Running: {} --os-cloud {} {}",
            self.program.display(),
            self.cloud,
            args.join(" ")
        );

        let output = cmd.output().await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_failure(stderr.trim()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Run a command with `-f json` and parse its output
    async fn run_json<T: DeserializeOwned>(&self, args: &[&str]) -> Result<T> {
        let mut args = args.to_vec();
        args.extend(["-f", "json"]);
        let output = self.run_command(&args).await?;
        Ok(serde_json::from_str(&output)?)
    }

    /// Authenticate and issue a token
    pub async fn issue_token(&self) -> Result<TokenInfo> {
        self.run_json(&["token", "issue"]).await
    }

    pub async fn list_projects(&self) -> Result<Vec<ProjectEntry>> {
        self.run_json(&["project", "list"]).await
    }

    /// List images with an exact name
    pub async fn list_images(&self, name: &str) -> Result<Vec<ImageEntry>> {
        let output = self
            .run_command(&["image", "list", "--name", name, "-f", "json"])
            .await?;

        if output.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&output)?)
    }

    pub async fn show_image(&self, id: &str) -> Result<ImageEntry> {
        self.run_json(&["image", "show", id]).await
    }

    /// Delete an image
    ///
    /// The CLI waits for the deletion. Returns `false` when it reports the
    /// image could not be deleted.
    pub async fn delete_image(&self, id: &str) -> Result<bool> {
        match self.run_command(&["image", "delete", id]).await {
            Ok(_) => Ok(true),
            Err(CloudError::CommandFailed(stderr)) if stderr.contains("Failed to delete") => {
                tracing::warn!(image_id = %id, "Image deletion reported failure: {}", stderr);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Upload an image file
    pub async fn create_image(
        &self,
        name: &str,
        file: &Path,
        disk_format: &str,
        container_format: &str,
    ) -> Result<ImageEntry> {
        let file = file.to_string_lossy();
        self.run_json(&[
            "image",
            "create",
            "--disk-format",
            disk_format,
            "--container-format",
            container_format,
            "--file",
            file.as_ref(),
            name,
        ])
        .await
    }

    /// Create a server and wait until it is active
    pub async fn create_server(
        &self,
        name: &str,
        image_id: &str,
        flavor: &str,
        userdata_file: &Path,
    ) -> Result<ServerEntry> {
        let userdata_file = userdata_file.to_string_lossy();
        self.run_json(&[
            "server",
            "create",
            "--image",
            image_id,
            "--flavor",
            flavor,
            "--user-data",
            userdata_file.as_ref(),
            "--wait",
            name,
        ])
        .await
    }
}

/// Map CLI stderr to a cloud error
fn classify_failure(stderr: &str) -> CloudError {
    const UNAUTHORIZED_MARKERS: &[&str] = &[
        "HTTP 401",
        "Unauthorized",
        "The request you have made requires authentication",
    ];

    if UNAUTHORIZED_MARKERS.iter().any(|m| stderr.contains(m)) {
        CloudError::Unauthorized(stderr.to_string())
    } else {
        CloudError::CommandFailed(stderr.to_string())
    }
}

/// `token issue` output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenInfo {
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub expires: Option<String>,
}

/// Project from `project list`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectEntry {
    #[serde(alias = "ID")]
    pub id: String,
    #[serde(alias = "Name")]
    pub name: String,
}

/// Image from `image list` (capitalised keys) or `image show`/`create`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageEntry {
    #[serde(alias = "ID")]
    pub id: String,
    #[serde(alias = "Name")]
    pub name: String,
    #[serde(alias = "Status", default)]
    pub status: Option<String>,
}

impl ImageEntry {
    pub fn is_active(&self) -> bool {
        self.status.as_deref() == Some("active")
    }

    /// Whether the image can no longer become active
    pub fn is_failed(&self) -> bool {
        matches!(
            self.status.as_deref(),
            Some("killed" | "deleted" | "pending_delete")
        )
    }
}

/// Server from `server create`/`server show`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerEntry {
    #[serde(alias = "ID")]
    pub id: String,
    #[serde(alias = "Name")]
    pub name: String,
    #[serde(alias = "Status", default)]
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_unauthorized() {
        let err = classify_failure(
            "The request you have made requires authentication. (HTTP 401) (Request-ID: req-1)",
        );
        assert!(err.is_unauthorized());

        let err = classify_failure("Quota exceeded for instances");
        assert!(matches!(err, CloudError::CommandFailed(_)));
    }

    #[test]
    fn test_image_entry_accepts_list_and_show_keys() {
        let listed: Vec<ImageEntry> =
            serde_json::from_str(r#"[{"ID": "abc", "Name": "jammy", "Status": "active"}]"#)
                .unwrap();
        assert!(listed[0].is_active());

        let shown: ImageEntry =
            serde_json::from_str(r#"{"id": "abc", "name": "jammy", "status": "killed"}"#).unwrap();
        assert!(shown.is_failed());
    }
}
