//! Configuration handling for CCPM
//!
//! Configuration is stored in `.ccpm/config.toml` (project) and in the
//! platform config directory, e.g. `~/.config/ccpm/config.toml` (global).
//! Project values win over global ones; `CCPM_BUFFER_RATIO` wins over both.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::BufferThresholds;
use crate::services::{BufferCalculationService, DEFAULT_BUFFER_RATIO};

/// Name of the workspace directory
pub const WORKSPACE_DIR: &str = ".ccpm";

/// Environment variable overriding the buffer ratio
pub const BUFFER_RATIO_ENV: &str = "CCPM_BUFFER_RATIO";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Cut points of the buffer zones
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ThresholdConfig {
    pub green: f64,
    pub yellow: f64,
    pub red: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            green: BufferThresholds::DEFAULT_GREEN,
            yellow: BufferThresholds::DEFAULT_YELLOW,
            red: BufferThresholds::DEFAULT_RED,
        }
    }
}

/// Buffer sizing and classification settings
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BufferConfig {
    /// Project buffer as a share of the critical chain's effort
    pub ratio: f64,

    pub thresholds: ThresholdConfig,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            ratio: DEFAULT_BUFFER_RATIO,
            thresholds: ThresholdConfig::default(),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive such as `warn` or `ccpm=debug`
    pub level: Option<String>,

    /// Also write logs to `.ccpm/logs/ccpm.log`
    pub file: bool,
}

/// Project-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct ProjectConfig {
    pub buffer: Option<BufferConfig>,

    pub logging: LoggingConfig,
}

/// Global user configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct GlobalConfig {
    pub buffer: Option<BufferConfig>,

    pub logging: LoggingConfig,
}

/// Combined configuration (global + project)
#[derive(Debug, Clone)]
pub struct Config {
    pub project: ProjectConfig,
    pub global: GlobalConfig,
    pub project_root: Option<PathBuf>,

    /// Buffer ratio taken from the environment
    pub ratio_override: Option<f64>,
}

impl Config {
    /// Loads configuration from default locations
    pub fn load() -> Result<Self> {
        let global = Self::load_global()?;
        let project_root = Self::find_project_root();
        let project = match &project_root {
            Some(root) => Self::load_project_config(root)?,
            None => ProjectConfig::default(),
        };

        Ok(Self {
            project,
            global,
            project_root,
            ratio_override: Self::ratio_from_env()?,
        })
    }

    /// Loads configuration for a specific project
    pub fn for_project(project_root: &Path) -> Result<Self> {
        let global = Self::load_global()?;
        let project = Self::load_project_config(project_root)?;

        Ok(Self {
            project,
            global,
            project_root: Some(project_root.to_path_buf()),
            ratio_override: Self::ratio_from_env()?,
        })
    }

    /// Returns the global config directory
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("dev", "ccpm", "ccpm").map(|dirs| dirs.config_dir().to_path_buf())
    }

    fn ratio_from_env() -> Result<Option<f64>> {
        match std::env::var(BUFFER_RATIO_ENV) {
            Ok(raw) => Ok(Some(parse_ratio(&raw)?)),
            Err(_) => Ok(None),
        }
    }

    /// Loads global configuration
    fn load_global() -> Result<GlobalConfig> {
        let config_dir = match Self::global_config_dir() {
            Some(dir) => dir,
            None => return Ok(GlobalConfig::default()),
        };

        let config_path = config_dir.join("config.toml");
        if !config_path.exists() {
            return Ok(GlobalConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read global config: {}", config_path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse global config")
    }

    /// Loads project configuration from a specific root
    fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
        let config_path = project_root.join(WORKSPACE_DIR).join("config.toml");

        if !config_path.exists() {
            return Ok(ProjectConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read project config: {}", config_path.display()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))
            .context("Failed to parse project config")
    }

    /// Finds the workspace root by looking for `.ccpm/` from the current directory up
    pub fn find_project_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;
        Self::find_root_from(&current)
    }

    /// Finds the workspace root by looking for `.ccpm/` from `start` up
    pub fn find_root_from(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();

        loop {
            if current.join(WORKSPACE_DIR).is_dir() {
                return Some(current);
            }

            if !current.pop() {
                return None;
            }
        }
    }

    /// Effective buffer settings: environment, then project, then global
    pub fn buffer(&self) -> BufferConfig {
        let mut buffer = self
            .project
            .buffer
            .or(self.global.buffer)
            .unwrap_or_default();
        if let Some(ratio) = self.ratio_override {
            buffer.ratio = ratio;
        }
        buffer
    }

    /// Effective log filter from the configuration files
    pub fn log_level(&self) -> Option<&str> {
        self.project
            .logging
            .level
            .as_deref()
            .or(self.global.logging.level.as_deref())
    }

    /// Returns true if logs should also go to a file
    pub fn log_to_file(&self) -> bool {
        self.project.logging.file || self.global.logging.file
    }

    /// Builds a buffer service from the effective settings
    pub fn buffer_service(&self) -> Result<BufferCalculationService, ConfigError> {
        let buffer = self.buffer();
        let thresholds = BufferThresholds::new(
            buffer.thresholds.green,
            buffer.thresholds.yellow,
            buffer.thresholds.red,
        )
        .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let service = BufferCalculationService::new(buffer.ratio)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        Ok(service.with_thresholds(thresholds))
    }

}

fn parse_ratio(raw: &str) -> Result<f64, ConfigError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| ConfigError::Invalid(format!("{BUFFER_RATIO_ENV} is not a number: '{raw}'")))
}
