use runnerflow_cloud::CloudError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error(
        "Configuration file not found. Looked in:\n\
        - RUNNERFLOW_CONFIG_PATH\n\
        - current directory: runnerflow.local.yaml, .runnerflow.local.yaml, runnerflow.yaml, .runnerflow.yaml\n\
        - ./.runnerflow/\n\
        - ~/.config/runnerflow/runnerflow.yaml"
    )]
    ConfigFileNotFound,

    #[error(
        "clouds.yaml not found. Looked in:\n\
        - OS_CLIENT_CONFIG_FILE\n\
        - ./clouds.yaml\n\
        - ~/.config/openstack/clouds.yaml\n\
        - /etc/openstack/clouds.yaml"
    )]
    CloudsFileNotFound,

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration in {}: {source}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid cloud configuration in {}: {source}", path.display())]
    Cloud {
        path: PathBuf,
        #[source]
        source: CloudError,
    },
}

pub type Result<T> = std::result::Result<T, LoadError>;
