//! Project buffer commands

use anyhow::Result;
use clap::Subcommand;

use super::output::{hours, Output};
use super::project;
use crate::domain::SystemClock;
use crate::storage::{ProjectRepository, Workspace};

#[derive(Subcommand)]
pub enum BufferCommands {
    /// Consume project buffer hours
    Consume {
        /// Project ID
        project: String,

        /// Hours consumed
        hours: f64,
    },

    /// Give buffer hours back (never below zero)
    Release {
        /// Project ID
        project: String,

        /// Hours released
        hours: f64,
    },
}

pub fn run(cmd: BufferCommands, output: &Output) -> Result<()> {
    match cmd {
        BufferCommands::Consume { project, hours } => adjust(output, &project, hours, true),
        BufferCommands::Release { project, hours } => adjust(output, &project, hours, false),
    }
}

fn adjust(output: &Output, project_id: &str, amount: f64, consume: bool) -> Result<()> {
    if !amount.is_finite() || amount < 0.0 {
        anyhow::bail!("Hours must be a non-negative number, got {}", amount);
    }

    let workspace = Workspace::open_current()?;
    let mut project = project::load(&workspace, project_id)?;

    if consume {
        project.consume_buffer(amount, &SystemClock);
    } else {
        project.release_buffer(amount, &SystemClock);
    }
    let project = workspace.projects().save(project)?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "project_id": project.id,
            "buffer_size": project.buffer_size,
            "buffer_consumed": project.buffer_consumed,
            "buffer_consumption_rate": project.buffer_consumption_rate(),
        }));
    } else {
        let verb = if consume { "Consumed" } else { "Released" };
        output.success(&format!(
            "{} {} of buffer: {} of {} used",
            verb,
            hours(amount),
            hours(project.buffer_consumed),
            hours(project.buffer_size)
        ));
    }

    Ok(())
}
