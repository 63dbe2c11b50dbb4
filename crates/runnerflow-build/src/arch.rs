//! Runner and image architectures

use crate::error::ImageBuildError;
use std::fmt;
use std::str::FromStr;

/// Architecture as named by the runner platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunnerArch {
    X64,
    Arm64,
}

impl RunnerArch {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunnerArch::X64 => "x64",
            RunnerArch::Arm64 => "arm64",
        }
    }

    /// Cloud image architecture built for this runner architecture
    pub fn image_arch(&self) -> ImageArch {
        match self {
            RunnerArch::X64 => ImageArch::Amd64,
            RunnerArch::Arm64 => ImageArch::Arm64,
        }
    }
}

impl FromStr for RunnerArch {
    type Err = ImageBuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "x64" => Ok(RunnerArch::X64),
            "arm64" => Ok(RunnerArch::Arm64),
            other => Err(ImageBuildError::UnsupportedArchitecture(other.to_string())),
        }
    }
}

impl fmt::Display for RunnerArch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Architecture as named by Ubuntu cloud images
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageArch {
    Amd64,
    Arm64,
}

impl ImageArch {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageArch::Amd64 => "amd64",
            ImageArch::Arm64 => "arm64",
        }
    }
}

impl fmt::Display for ImageArch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
