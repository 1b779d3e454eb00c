//! Project CLI commands

use anyhow::Result;
use clap::Subcommand;

use super::output::{hours, Output};
use crate::domain::{Project, ProjectId, ProjectStatus, SystemClock, Task, TaskId};
use crate::storage::{require, ProjectRepository, TaskRepository, Workspace};

#[derive(Subcommand)]
pub enum ProjectCommands {
    /// Create a new project
    New {
        /// Project name
        name: String,

        /// Project description
        #[arg(long, short)]
        description: Option<String>,
    },

    /// List projects
    List {
        /// Filter by status (not_started, in_progress, completed)
        #[arg(long)]
        status: Option<ProjectStatus>,
    },

    /// Show project details
    Show {
        /// Project ID
        id: String,
    },

    /// Mark a project as in progress
    Start {
        /// Project ID
        id: String,
    },

    /// Mark a project as completed
    Done {
        /// Project ID
        id: String,
    },
}

pub fn run(cmd: ProjectCommands, output: &Output) -> Result<()> {
    match cmd {
        ProjectCommands::New { name, description } => new_project(output, &name, description.as_deref()),
        ProjectCommands::List { status } => list_projects(output, status),
        ProjectCommands::Show { id } => show_project(output, &id),
        ProjectCommands::Start { id } => start_project(output, &id),
        ProjectCommands::Done { id } => complete_project(output, &id),
    }
}

/// Loads a project that must exist
pub(super) fn load(workspace: &Workspace, id: &str) -> Result<Project> {
    let id: ProjectId = id.parse()?;
    Ok(require(workspace.projects().find_by_id(&id)?, &id)?)
}

fn new_project(output: &Output, name: &str, description: Option<&str>) -> Result<()> {
    let workspace = Workspace::open_current()?;
    let mut project = Project::new(name, &SystemClock);
    if let Some(desc) = description {
        project.description = desc.to_string();
    }

    let project = workspace.projects().save(project)?;

    if output.is_json() {
        output.record(&project)?;
    } else {
        output.success(&format!("Created project {}: {}", project.id, project.name));
    }

    Ok(())
}

fn list_projects(output: &Output, status: Option<ProjectStatus>) -> Result<()> {
    let workspace = Workspace::open_current()?;
    let projects = match status {
        Some(status) => workspace.projects().find_by_status(status)?,
        None => workspace.projects().find_all()?,
    };

    if output.is_json() {
        return output.records(&projects);
    }

    if projects.is_empty() {
        println!("No projects found.");
        return Ok(());
    }

    println!("{:<38} {:<12} {:<14} NAME", "ID", "STATUS", "BUFFER");
    println!("{}", "-".repeat(80));
    for project in &projects {
        let buffer = format!("{}/{}", hours(project.buffer_consumed), hours(project.buffer_size));
        println!(
            "{:<38} {:<12} {:<14} {}",
            project.id, project.status, buffer, project.name
        );
    }

    Ok(())
}

fn show_project(output: &Output, id: &str) -> Result<()> {
    let workspace = Workspace::open_current()?;
    let project = load(&workspace, id)?;

    if output.is_json() {
        return output.record(&project);
    }

    let tasks = workspace.tasks().find_by_project_id(&project.id)?;

    println!("Project: {}", project.id);
    println!("Name: {}", project.name);
    println!("Status: {}", project.status);
    if !project.description.is_empty() {
        println!("Description: {}", project.description);
    }
    println!("Started: {}", project.start_date.format("%Y-%m-%d %H:%M"));
    if let Some(end) = project.actual_end_date {
        println!("Completed: {}", end.format("%Y-%m-%d %H:%M"));
    }
    println!("Tasks: {}", tasks.len());
    println!(
        "Buffer: {} of {} consumed ({:.0}%)",
        hours(project.buffer_consumed),
        hours(project.buffer_size),
        project.buffer_consumption_rate() * 100.0
    );

    if !project.critical_chain.is_empty() {
        println!();
        println!("Critical chain:");
        for id in &project.critical_chain {
            println!("  {}", chain_label(id, &tasks));
        }
    }

    Ok(())
}

fn chain_label(id: &TaskId, tasks: &[Task]) -> String {
    match tasks.iter().rev().find(|task| &task.id == id) {
        Some(task) => format!("{} {}", task.id, task.name),
        None => format!("{} (missing)", id),
    }
}

fn start_project(output: &Output, id: &str) -> Result<()> {
    let workspace = Workspace::open_current()?;
    let mut project = load(&workspace, id)?;

    if !project.start(&SystemClock) {
        anyhow::bail!("Project {} is already {}", project.id, project.status);
    }
    let project = workspace.projects().save(project)?;

    if output.is_json() {
        output.record(&project)?;
    } else {
        output.success(&format!("Started project {}", project.id));
    }

    Ok(())
}

fn complete_project(output: &Output, id: &str) -> Result<()> {
    let workspace = Workspace::open_current()?;
    let mut project = load(&workspace, id)?;

    if !project.complete(&SystemClock) {
        anyhow::bail!("Project {} is already completed", project.id);
    }
    let project = workspace.projects().save(project)?;

    if output.is_json() {
        output.record(&project)?;
    } else {
        output.success(&format!("Completed project {}", project.id));
    }

    Ok(())
}
