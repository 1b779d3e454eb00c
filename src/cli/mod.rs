//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting. Every command loads a
//! snapshot from the workspace, runs the domain services over it and saves
//! what changed.
//!
//! ## Command Groups
//!
//! | Group | Purpose | Examples |
//! |-------|---------|----------|
//! | Core | Workspace setup | `init` |
//! | Project | Project lifecycle | `project new`, `project list`, `project done` |
//! | Task | Work items and dependencies | `task add`, `task dep`, `task hours` |
//! | Time | Time tracking | `time start`, `time stop` |
//! | CCPM | Critical chain and buffer | `chain`, `buffer consume`, `status` |
//!
//! ## Output Formats
//!
//! All commands support `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON (entities as plain records)
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) to log at debug level on stderr:
//! ```bash
//! ccpm --verbose chain <PROJECT_ID>
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod buffer;
mod chain;
mod output;
mod project;
mod status;
mod task;
mod time;

pub use app::{Cli, Commands, run};
pub use output::{Output, OutputFormat};
