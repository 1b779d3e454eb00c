//! Task CLI commands

use anyhow::{Context, Result};
use clap::Subcommand;

use super::output::{hours, Output};
use super::project;
use crate::domain::{DependencyGraph, SystemClock, Task, TaskId, TaskStatus};
use crate::storage::{require, TaskRepository, Workspace};

#[derive(Subcommand)]
pub enum TaskCommands {
    /// Add a new task to a project
    Add {
        /// Project ID
        project: String,

        /// Task name
        name: String,

        /// Estimated effort in hours (50% confidence)
        #[arg(long)]
        hours: f64,

        /// Task that must complete first (repeatable)
        #[arg(long = "after")]
        after: Vec<String>,

        /// Priority from 1 (highest) to 5 (lowest)
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
        priority: Option<u8>,

        /// Task description
        #[arg(long, short)]
        description: Option<String>,

        /// Free-form category
        #[arg(long)]
        category: Option<String>,

        /// Tag (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// List tasks
    List {
        /// Only tasks of this project
        project: Option<String>,

        /// Filter by status (not_started, in_progress, completed)
        #[arg(long)]
        status: Option<TaskStatus>,
    },

    /// Show task details
    Show {
        /// Task ID
        id: String,
    },

    /// Mark a task as in progress
    Start {
        /// Task ID
        id: String,
    },

    /// Mark a task as completed
    Done {
        /// Task ID
        id: String,
    },

    /// Log effort spent on a task
    Hours {
        /// Task ID
        id: String,

        /// Hours to add to the actual effort
        hours: f64,
    },

    /// Make a task depend on another
    Dep {
        /// Task that is blocked
        task: String,

        /// Task that must complete first
        depends_on: String,
    },

    /// Remove a dependency
    Undep {
        /// Task that is blocked
        task: String,

        /// Task to remove from its dependencies
        depends_on: String,
    },
}

pub fn run(cmd: TaskCommands, output: &Output) -> Result<()> {
    match cmd {
        TaskCommands::Add { project, name, hours, after, priority, description, category, tags } => {
            add_task(output, &project, &name, hours, &after, priority, description, category, tags)
        }
        TaskCommands::List { project, status } => list_tasks(output, project.as_deref(), status),
        TaskCommands::Show { id } => show_task(output, &id),
        TaskCommands::Start { id } => start_task(output, &id),
        TaskCommands::Done { id } => complete_task(output, &id),
        TaskCommands::Hours { id, hours } => log_hours(output, &id, hours),
        TaskCommands::Dep { task, depends_on } => add_dependency(output, &task, &depends_on),
        TaskCommands::Undep { task, depends_on } => remove_dependency(output, &task, &depends_on),
    }
}

/// Loads a task that must exist
pub(super) fn load(workspace: &Workspace, id: &str) -> Result<Task> {
    let id: TaskId = id.parse()?;
    Ok(require(workspace.tasks().find_by_id(&id)?, &id)?)
}

#[allow(clippy::too_many_arguments)]
fn add_task(
    output: &Output,
    project_id: &str,
    name: &str,
    estimate: f64,
    after: &[String],
    priority: Option<u8>,
    description: Option<String>,
    category: Option<String>,
    tags: Vec<String>,
) -> Result<()> {
    if !estimate.is_finite() || estimate < 0.0 {
        anyhow::bail!("Estimated hours must be a non-negative number, got {}", estimate);
    }

    let workspace = Workspace::open_current()?;
    let project = project::load(&workspace, project_id)?;
    let clock = SystemClock;

    let mut task = Task::new(project.id, name, estimate, &clock);
    if let Some(priority) = priority {
        task.priority = priority;
    }
    if let Some(desc) = description {
        task.description = desc;
    }
    if let Some(category) = category {
        task.category = category;
    }
    for tag in tags {
        task.add_tag(tag, &clock);
    }

    for dep in after {
        let dep = load(&workspace, dep).context("Invalid --after task")?;
        if dep.project_id != project.id {
            anyhow::bail!("Task {} belongs to another project", dep.id);
        }
        task.add_dependency(dep.id, &clock);
    }

    // A brand-new task has no dependents, so it cannot close a cycle
    let task = workspace.tasks().save(task)?;

    if output.is_json() {
        output.record(&task)?;
    } else {
        output.success(&format!("Created task {}: {}", task.id, task.name));
    }

    Ok(())
}

fn list_tasks(output: &Output, project_id: Option<&str>, status: Option<TaskStatus>) -> Result<()> {
    let workspace = Workspace::open_current()?;
    let store = workspace.tasks();

    let tasks = match project_id {
        Some(id) => {
            let project = project::load(&workspace, id)?;
            match status {
                Some(status) => store.find_by_project_and_status(&project.id, status)?,
                None => store.find_by_project_id(&project.id)?,
            }
        }
        None => match status {
            Some(status) => store.find_by_status(status)?,
            None => store.find_all()?,
        },
    };

    if output.is_json() {
        return output.records(&tasks);
    }

    if tasks.is_empty() {
        println!("No tasks found.");
        return Ok(());
    }

    println!("{:<38} {:<12} {:>8} {:>8} NAME", "ID", "STATUS", "EST", "ACTUAL");
    println!("{}", "-".repeat(86));
    for task in &tasks {
        println!(
            "{:<38} {:<12} {:>8} {:>8} {}",
            task.id,
            task.status,
            hours(task.estimated_hours),
            hours(task.actual_hours),
            task.name
        );
    }

    Ok(())
}

fn show_task(output: &Output, id: &str) -> Result<()> {
    let workspace = Workspace::open_current()?;
    let task = load(&workspace, id)?;

    if output.is_json() {
        return output.record(&task);
    }

    println!("Task: {}", task.id);
    println!("Name: {}", task.name);
    println!("Project: {}", task.project_id);
    println!("Status: {}", task.status);
    println!("Priority: {}", task.priority);
    if !task.description.is_empty() {
        println!("Description: {}", task.description);
    }
    if !task.category.is_empty() {
        println!("Category: {}", task.category);
    }
    if !task.tags.is_empty() {
        println!("Tags: {}", task.tags.join(", "));
    }
    println!(
        "Effort: {} actual / {} estimated (variance {:+.1}h)",
        hours(task.actual_hours),
        hours(task.estimated_hours),
        task.variance()
    );
    if let Some(start) = task.start_date {
        println!("Started: {}", start.format("%Y-%m-%d %H:%M"));
    }
    if let Some(end) = task.end_date {
        println!("Completed: {}", end.format("%Y-%m-%d %H:%M"));
    }

    if !task.dependencies.is_empty() {
        println!();
        println!("Depends on:");
        let store = workspace.tasks();
        for dep_id in &task.dependencies {
            match store.find_by_id(dep_id)? {
                Some(dep) => println!("  {} [{}] {}", dep.id, dep.status, dep.name),
                None => println!("  {} (missing)", dep_id),
            }
        }
    }

    Ok(())
}

fn start_task(output: &Output, id: &str) -> Result<()> {
    let workspace = Workspace::open_current()?;
    let mut task = load(&workspace, id)?;

    if !task.start(&SystemClock) {
        anyhow::bail!("Task {} is already {}", task.id, task.status);
    }
    let task = workspace.tasks().save(task)?;

    if output.is_json() {
        output.record(&task)?;
    } else {
        output.success(&format!("Started task {}: {}", task.id, task.name));
    }

    Ok(())
}

fn complete_task(output: &Output, id: &str) -> Result<()> {
    let workspace = Workspace::open_current()?;
    let mut task = load(&workspace, id)?;

    if !task.complete(&SystemClock) {
        anyhow::bail!("Task {} is already completed", task.id);
    }
    let task = workspace.tasks().save(task)?;

    if output.is_json() {
        output.record(&task)?;
    } else {
        output.success(&format!("Completed task {}: {}", task.id, task.name));
    }

    Ok(())
}

fn log_hours(output: &Output, id: &str, amount: f64) -> Result<()> {
    let workspace = Workspace::open_current()?;
    let mut task = load(&workspace, id)?;

    if !task.log_hours(amount, &SystemClock) {
        anyhow::bail!("Hours must be a non-negative number, got {}", amount);
    }
    let task = workspace.tasks().save(task)?;

    if output.is_json() {
        output.record(&task)?;
    } else {
        output.success(&format!(
            "Logged {} on {} ({} total)",
            hours(amount),
            task.id,
            hours(task.actual_hours)
        ));
    }

    Ok(())
}

fn add_dependency(output: &Output, task_id: &str, depends_on: &str) -> Result<()> {
    let workspace = Workspace::open_current()?;
    let store = workspace.tasks();
    let mut task = load(&workspace, task_id)?;
    let dep = load(&workspace, depends_on)?;

    if dep.project_id != task.project_id {
        anyhow::bail!("Task {} belongs to another project", dep.id);
    }

    if !task.add_dependency(dep.id, &SystemClock) {
        if output.is_json() {
            output.record(&task)?;
        } else {
            output.success(&format!("{} already depends on {}", task.id, dep.id));
        }
        return Ok(());
    }

    // Reject the edge if the project's graph would no longer be acyclic
    let mut siblings = store.find_by_project_id(&task.project_id)?;
    for sibling in siblings.iter_mut().filter(|t| t.id == task.id) {
        *sibling = task.clone();
    }
    DependencyGraph::from_tasks(&siblings)
        .with_context(|| format!("Cannot make {} depend on {}", task.id, dep.id))?;

    let task = store.save(task)?;

    if output.is_json() {
        output.record(&task)?;
    } else {
        output.success(&format!("{} now depends on {}", task.id, dep.id));
    }

    Ok(())
}

fn remove_dependency(output: &Output, task_id: &str, depends_on: &str) -> Result<()> {
    let workspace = Workspace::open_current()?;
    let mut task = load(&workspace, task_id)?;
    let dep_id: TaskId = depends_on.parse()?;

    if !task.remove_dependency(&dep_id, &SystemClock) {
        anyhow::bail!("{} does not depend on {}", task.id, dep_id);
    }
    let task = workspace.tasks().save(task)?;

    if output.is_json() {
        output.record(&task)?;
    } else {
        output.success(&format!("{} no longer depends on {}", task.id, dep_id));
    }

    Ok(())
}
