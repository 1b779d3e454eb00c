//! # Storage Layer
//!
//! Persistence for CCPM with git-friendly file formats. The scheduling core
//! never touches this layer; the command-line application loads a snapshot
//! through the repositories, runs the services and saves the result.
//!
//! ## Storage Formats
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Projects | JSONL (one plain record per line) | `.ccpm/projects.jsonl` |
//! | Tasks | JSONL | `.ccpm/tasks.jsonl` |
//! | Time records | JSONL | `.ccpm/time_records.jsonl` |
//! | Config | TOML | `.ccpm/config.toml` |
//!
//! ## Concurrency Safety
//!
//! - [`JsonlStore`] uses file locking (`fs2`) for concurrent access
//! - Rewrites are atomic (temp file + rename)
//! - [`MemoryStore`] guards its map with a `RwLock`
//!
//! ## Workspace Structure
//!
//! ```text
//! .ccpm/
//! ├── projects.jsonl
//! ├── tasks.jsonl
//! ├── time_records.jsonl
//! ├── config.toml
//! ├── logs/                 # Optional log file
//! └── .gitignore
//! ```

mod config;
mod jsonl;
mod memory;
mod repository;
mod workspace;

pub use config::{
    BufferConfig, Config, ConfigError, GlobalConfig, LoggingConfig, ProjectConfig,
    ThresholdConfig, BUFFER_RATIO_ENV, WORKSPACE_DIR,
};
pub use jsonl::{JsonlProjectRepository, JsonlStore, JsonlTaskRepository, JsonlTimeRecordRepository};
pub use memory::{
    InMemoryProjectRepository, InMemoryTaskRepository, InMemoryTimeRecordRepository, MemoryStore,
};
pub use repository::{
    require, Entity, EntityStore, ProjectRepository, StorageError, TaskRepository,
    TimeRecordRepository,
};
pub use workspace::{Workspace, WorkspaceError};
