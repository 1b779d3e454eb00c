//! Critical chain command

use anyhow::{Context, Result};
use tracing::info;

use super::output::{hours, Output};
use super::project;
use crate::domain::SystemClock;
use crate::services::CriticalChainService;
use crate::storage::{ProjectRepository, TaskRepository, Workspace};

/// Recomputes the critical chain and sizes the project buffer
pub fn run(output: &Output, project_id: &str) -> Result<()> {
    let workspace = Workspace::open_current()?;
    let buffers = workspace.config().buffer_service()?;
    let mut project = project::load(&workspace, project_id)?;
    let tasks = workspace.tasks().find_by_project_id(&project.id)?;

    let id = project.id;
    let service = CriticalChainService::new();
    service
        .update_project_critical_chain(&mut project, &tasks)
        .with_context(|| format!("Cannot compute the critical chain of {}", id))?;

    let chain = service.get_critical_chain_tasks(&project, &tasks);
    let chain_effort: f64 = chain.iter().map(|task| task.estimated_hours).sum();
    project.set_buffer_size(
        buffers.calculate_project_buffer(chain.iter().copied()),
        &SystemClock,
    );

    let project = workspace.projects().save(project)?;
    info!(
        project = %project.id,
        tasks = chain.len(),
        buffer = project.buffer_size,
        "critical chain updated"
    );

    if output.is_json() {
        output.data(&serde_json::json!({
            "project_id": project.id,
            "critical_chain": chain.iter().map(|task| serde_json::json!({
                "id": task.id,
                "name": task.name,
                "estimated_hours": task.estimated_hours,
            })).collect::<Vec<_>>(),
            "chain_hours": chain_effort,
            "buffer_ratio": buffers.ratio(),
            "buffer_size": project.buffer_size,
        }));
    } else if chain.is_empty() {
        println!("No critical chain: {} has no estimated work.", project.name);
    } else {
        println!("Critical chain of {}:", project.name);
        println!("{:<4} {:<38} {:>8} NAME", "#", "ID", "EST");
        println!("{}", "-".repeat(70));
        for (position, task) in chain.iter().enumerate() {
            println!(
                "{:<4} {:<38} {:>8} {}",
                position + 1,
                task.id,
                hours(task.estimated_hours),
                task.name
            );
        }
        println!();
        println!("Chain effort: {}", hours(chain_effort));
        println!(
            "Project buffer: {} ({:.0}% of the chain)",
            hours(project.buffer_size),
            buffers.ratio() * 100.0
        );
    }

    Ok(())
}
