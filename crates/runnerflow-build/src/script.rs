//! Image build script execution

use crate::error::ScriptError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

pub const DEFAULT_INTERPRETER: &str = "/usr/bin/bash";

/// One invocation of the image build script
#[derive(Clone, PartialEq, Eq)]
pub struct BuildCommand {
    pub script: PathBuf,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

// Proxy URLs may embed credentials; only the script path is printed.
impl std::fmt::Debug for BuildCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildCommand")
            .field("script", &self.script)
            .field("args", &format_args!("<{} args>", self.args.len()))
            .field("working_dir", &self.working_dir)
            .finish()
    }
}

/// Runs the image build script
#[async_trait]
pub trait BuildScript: Send + Sync {
    /// Run `command` to completion; a non-zero exit is an error
    async fn run(&self, command: &BuildCommand) -> Result<(), ScriptError>;
}

/// Runs the build script with bash
#[derive(Debug, Clone)]
pub struct BashBuildScript {
    interpreter: PathBuf,
}

impl Default for BashBuildScript {
    fn default() -> Self {
        Self::new()
    }
}

impl BashBuildScript {
    pub fn new() -> Self {
        Self {
            interpreter: PathBuf::from(DEFAULT_INTERPRETER),
        }
    }

    pub fn with_interpreter(mut self, interpreter: impl Into<PathBuf>) -> Self {
        self.interpreter = interpreter.into();
        self
    }

    pub fn interpreter(&self) -> &Path {
        &self.interpreter
    }
}

#[async_trait]
impl BuildScript for BashBuildScript {
    #[tracing::instrument(skip_all, fields(script = %command.script.display()))]
    async fn run(&self, command: &BuildCommand) -> Result<(), ScriptError> {
        let mut cmd = Command::new(&self.interpreter);
        cmd.arg(&command.script);
        cmd.args(&command.args);
        if let Some(dir) = &command.working_dir {
            cmd.current_dir(dir);
        }
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        tracing::info!("Running image build script");

        let output = cmd.output().await.map_err(|source| ScriptError::Spawn {
            program: self.interpreter.display().to_string(),
            source,
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::error!(code = ?output.status.code(), "Image build script failed");
            return Err(ScriptError::Exit {
                code: output.status.code(),
                stderr,
            });
        }

        tracing::debug!(
            stdout_bytes = output.stdout.len(),
            "Image build script finished"
        );
        Ok(())
    }
}
