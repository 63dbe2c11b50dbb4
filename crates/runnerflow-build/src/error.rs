use runnerflow_cloud::CloudError;
use runnerflow_core::{PlatformError, TemplateError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageBuildError {
    #[error("Unsupported architecture: {0}")]
    UnsupportedArchitecture(String),

    #[error("Failed to fetch runner application: {0}")]
    RunnerApplication(#[from] PlatformError),

    #[error("Failed to render build payload: {0}")]
    Template(#[from] TemplateError),

    #[error("Failed to build image: {0}")]
    BuildFailed(#[from] ScriptError),

    #[error("Failed to connect to the cloud: {0}")]
    Connect(#[source] CloudError),

    #[error("Failed to delete duplicate image {0}")]
    DeleteDuplicate(String),

    #[error("Failed to upload image: {0}")]
    Upload(#[source] CloudError),
}

/// Build script execution errors
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("could not start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("exited with {}: {stderr}", describe_exit(.code))]
    Exit { code: Option<i32>, stderr: String },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "a signal".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, ImageBuildError>;
