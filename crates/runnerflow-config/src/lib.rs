//! runnerflow configuration files
//!
//! Locates and loads the application configuration and the cloud
//! credential bundle (`clouds.yaml`).

pub mod error;

pub use error::*;

use runnerflow_cloud::CloudConfig;
use runnerflow_core::ApplicationConfiguration;
use std::path::{Path, PathBuf};

pub const CONFIG_PATH_ENV: &str = "RUNNERFLOW_CONFIG_PATH";
pub const CLOUDS_PATH_ENV: &str = "OS_CLIENT_CONFIG_FILE";

const CONFIG_CANDIDATES: [&str; 4] = [
    "runnerflow.local.yaml",
    ".runnerflow.local.yaml",
    "runnerflow.yaml",
    ".runnerflow.yaml",
];

/// Find the application configuration file
///
/// Search order:
/// 1. `RUNNERFLOW_CONFIG_PATH`
/// 2. current directory: runnerflow.local.yaml, .runnerflow.local.yaml,
///    runnerflow.yaml, .runnerflow.yaml
/// 3. the same names under `./.runnerflow/`
/// 4. `<config dir>/runnerflow/runnerflow.yaml`
pub fn find_config_file() -> Result<PathBuf> {
    if let Some(path) = env_path(CONFIG_PATH_ENV) {
        return Ok(path);
    }

    let current_dir = current_dir()?;

    if let Some(path) = first_existing(&current_dir, &CONFIG_CANDIDATES) {
        return Ok(path);
    }

    let local_dir = current_dir.join(".runnerflow");
    if local_dir.is_dir()
        && let Some(path) = first_existing(&local_dir, &CONFIG_CANDIDATES)
    {
        return Ok(path);
    }

    if let Some(config_dir) = dirs::config_dir() {
        let global = config_dir.join("runnerflow").join("runnerflow.yaml");
        if global.exists() {
            return Ok(global);
        }
    }

    Err(LoadError::ConfigFileNotFound)
}

/// Find the cloud credential bundle
///
/// Search order: `OS_CLIENT_CONFIG_FILE`, `./clouds.yaml`,
/// `<config dir>/openstack/clouds.yaml`, `/etc/openstack/clouds.yaml`.
pub fn find_clouds_file() -> Result<PathBuf> {
    if let Some(path) = env_path(CLOUDS_PATH_ENV) {
        return Ok(path);
    }

    let local = current_dir()?.join("clouds.yaml");
    if local.exists() {
        return Ok(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
        let user = config_dir.join("openstack").join("clouds.yaml");
        if user.exists() {
            return Ok(user);
        }
    }

    let system = PathBuf::from("/etc/openstack/clouds.yaml");
    if system.exists() {
        return Ok(system);
    }

    Err(LoadError::CloudsFileNotFound)
}

/// Load and validate the application configuration at `path`
pub fn load_application_config(path: &Path) -> Result<ApplicationConfiguration> {
    let content = read(path)?;
    let config: ApplicationConfiguration =
        serde_yaml::from_str(&content).map_err(|source| LoadError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;

    tracing::debug!(
        path = %path.display(),
        reactive = config.is_reactive(),
        "Loaded application configuration"
    );
    Ok(config)
}

/// Load the cloud credential bundle at `path`
pub fn load_cloud_config(path: &Path) -> Result<CloudConfig> {
    let content = read(path)?;
    let config = CloudConfig::from_yaml_str(&content).map_err(|source| LoadError::Cloud {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::debug!(
        path = %path.display(),
        clouds = ?config.cloud_names(),
        "Loaded cloud configuration"
    );
    Ok(config)
}

fn env_path(var: &str) -> Option<PathBuf> {
    let path = PathBuf::from(std::env::var_os(var)?);
    if path.exists() {
        Some(path)
    } else {
        tracing::warn!("{} points to a missing file: {}", var, path.display());
        None
    }
}

fn current_dir() -> Result<PathBuf> {
    std::env::current_dir().map_err(|source| LoadError::Io {
        path: PathBuf::from("."),
        source,
    })
}

fn first_existing(dir: &Path, candidates: &[&str]) -> Option<PathBuf> {
    candidates
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.exists())
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}
