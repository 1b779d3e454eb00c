//! Workspace management
//!
//! Handles workspace initialization and provides access to stores.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use thiserror::Error;

use super::config::{Config, WORKSPACE_DIR};
use super::jsonl::{JsonlProjectRepository, JsonlTaskRepository, JsonlTimeRecordRepository};

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("Not in a ccpm workspace. Run 'ccpm init' first.")]
    NotInWorkspace,
}

const DEFAULT_CONFIG: &str = r#"# CCPM configuration

[buffer]
# Project buffer as a share of the critical chain's estimated effort
ratio = 0.5

[buffer.thresholds]
# Relative buffer consumption up to `green` is safe, up to `yellow` a warning
green = 0.33
yellow = 0.67
red = 1.0

[logging]
# Filter directive, e.g. "info" or "ccpm=debug" (CCPM_LOG overrides it)
level = "warn"
# Also write logs to .ccpm/logs/ccpm.log
file = false
"#;

const GITIGNORE: &str = r#"# Ignore logs
logs/

# Ignore interrupted writes
*.tmp
"#;

/// A ccpm workspace: the directory holding `.ccpm/`
pub struct Workspace {
    root: PathBuf,
    config: Config,
}

impl Workspace {
    /// Opens an existing workspace at the given path
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();

        if !Self::exists(&root) {
            return Err(WorkspaceError::NotInWorkspace.into());
        }

        let config = Config::for_project(&root)?;

        Ok(Self { root, config })
    }

    /// Opens the workspace at the current directory or a parent
    pub fn open_current() -> Result<Self> {
        let root = Config::find_project_root().ok_or(WorkspaceError::NotInWorkspace)?;

        Self::open(root)
    }

    /// Returns true if `root` already holds a workspace
    pub fn exists(root: &Path) -> bool {
        root.join(WORKSPACE_DIR).is_dir()
    }

    /// Initializes a new workspace at the given path
    ///
    /// Existing files are left alone, so initializing twice is harmless.
    pub fn init(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let ccpm_dir = root.join(WORKSPACE_DIR);

        // Create directory structure
        fs::create_dir_all(&ccpm_dir).with_context(|| {
            format!("Failed to create .ccpm directory: {}", ccpm_dir.display())
        })?;

        let logs_dir = ccpm_dir.join("logs");
        fs::create_dir_all(&logs_dir)
            .with_context(|| format!("Failed to create logs directory: {}", logs_dir.display()))?;

        // Create default config
        let config_path = ccpm_dir.join("config.toml");
        if !config_path.exists() {
            fs::write(&config_path, DEFAULT_CONFIG)
                .with_context(|| format!("Failed to write config: {}", config_path.display()))?;
        }

        let gitignore_path = ccpm_dir.join(".gitignore");
        if !gitignore_path.exists() {
            fs::write(&gitignore_path, GITIGNORE).with_context(|| {
                format!("Failed to write .gitignore: {}", gitignore_path.display())
            })?;
        }

        Self::open(root)
    }

    /// Returns the workspace root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the .ccpm directory path
    pub fn ccpm_dir(&self) -> PathBuf {
        self.root.join(WORKSPACE_DIR)
    }

    /// Returns the logs directory
    pub fn logs_dir(&self) -> PathBuf {
        self.ccpm_dir().join("logs")
    }

    /// Returns the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn tasks(&self) -> JsonlTaskRepository {
        JsonlTaskRepository::new(self.ccpm_dir().join("tasks.jsonl"))
    }

    pub fn projects(&self) -> JsonlProjectRepository {
        JsonlProjectRepository::new(self.ccpm_dir().join("projects.jsonl"))
    }

    pub fn time_records(&self) -> JsonlTimeRecordRepository {
        JsonlTimeRecordRepository::new(self.ccpm_dir().join("time_records.jsonl"))
    }
}
