//! Main CLI application structure

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;

use super::output::{Output, OutputFormat};
use super::{buffer, chain, project, status, task, time};
use crate::logging;
use crate::storage::{Config, Workspace, WORKSPACE_DIR};

#[derive(Parser)]
#[command(name = "ccpm")]
#[command(author, version, about = "Critical chain project management")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Log at debug level on stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new ccpm workspace
    Init {
        /// Path to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Manage projects
    #[command(subcommand)]
    Project(project::ProjectCommands),

    /// Manage tasks
    #[command(subcommand)]
    Task(task::TaskCommands),

    /// Track time spent on tasks
    #[command(subcommand)]
    Time(time::TimeCommands),

    /// Recompute a project's critical chain and buffer size
    Chain {
        /// Project ID
        project: String,
    },

    /// Consume or release project buffer
    #[command(subcommand)]
    Buffer(buffer::BufferCommands),

    /// Show completion and buffer status of a project
    Status {
        /// Project ID
        project: String,
    },
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(cli.format);

    init_logging(cli.verbose)?;
    debug!("ccpm starting");

    match cli.command {
        Commands::Init { path } => {
            debug!(path = %path.display(), "initializing workspace");
            let workspace = Workspace::init(&path)?;
            debug!(dir = %workspace.ccpm_dir().display(), "workspace ready");

            if output.is_json() {
                output.data(&serde_json::json!({
                    "root": workspace.root().display().to_string(),
                }));
            } else {
                output.success(&format!(
                    "Initialized ccpm workspace at {}",
                    workspace.root().display()
                ));
            }
        }

        Commands::Project(cmd) => project::run(cmd, &output)?,
        Commands::Task(cmd) => task::run(cmd, &output)?,
        Commands::Time(cmd) => time::run(cmd, &output)?,
        Commands::Chain { project } => chain::run(&output, &project)?,
        Commands::Buffer(cmd) => buffer::run(cmd, &output)?,
        Commands::Status { project } => status::run(&output, &project)?,
    }

    debug!("command completed");
    Ok(())
}

/// Installs logging from the flags and whatever configuration is reachable
///
/// A broken configuration file does not stop logging; the command itself
/// reports it when it opens the workspace.
fn init_logging(verbose: bool) -> Result<()> {
    let config = Config::load().ok();
    let level = config.as_ref().and_then(|c| c.log_level());
    let log_file = config.as_ref().and_then(|c| match &c.project_root {
        Some(root) if c.log_to_file() => {
            Some(root.join(WORKSPACE_DIR).join("logs").join("ccpm.log"))
        }
        _ => None,
    });

    logging::init(verbose, level, log_file.as_deref())
}
