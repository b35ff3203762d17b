use crate::config::Config;
use crate::error::Result;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Decided once per build; selects the link tool and the generated defines.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BuildMode {
    Debug,
    Release,
}

impl BuildMode {
    pub fn is_debug(self) -> bool {
        self == BuildMode::Debug
    }

    pub fn to_str(self) -> &'static str {
        match self {
            BuildMode::Debug => "debug",
            BuildMode::Release => "release",
        }
    }
}

impl Display for BuildMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_str())
    }
}

/// Everything a build step may consult, passed explicitly to every component.
#[derive(Debug, Clone)]
pub struct Context {
    pub config: Config,
    mode: BuildMode,
}

impl Context {
    pub fn new(config: Config) -> Context {
        let mode = if config.get_bool("debug") {
            BuildMode::Debug
        } else {
            BuildMode::Release
        };

        Context { config, mode }
    }

    pub fn with_mode(config: Config, mode: BuildMode) -> Context {
        Context { config, mode }
    }

    pub fn mode(&self) -> BuildMode {
        self.mode
    }

    pub fn build_dir(&self) -> Result<PathBuf> {
        self.config.get_path("paths:build")
    }

    pub fn demo_dir(&self) -> Result<PathBuf> {
        self.config.get_path("directory")
    }

    pub fn exe_path(&self) -> Result<PathBuf> {
        self.config.get_path("paths:exe")
    }

    pub fn engine_dir(&self) -> Result<PathBuf> {
        self.config.get_path("paths:engine")
    }

    /// Path of an external tool, `tools:<name>`.
    pub fn tool(&self, name: &str) -> Result<PathBuf> {
        self.config.get_path(&format!("tools:{}", name))
    }
}
