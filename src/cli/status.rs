//! Project status report

use anyhow::Result;

use super::output::{hours, percent, Output};
use super::project;
use crate::services::CriticalChainService;
use crate::storage::{TaskRepository, Workspace};

/// Reports completion and buffer health of a project
///
/// Works on the stored critical chain; run `ccpm chain` first to refresh it.
pub fn run(output: &Output, project_id: &str) -> Result<()> {
    let workspace = Workspace::open_current()?;
    let buffers = workspace.config().buffer_service()?;
    let project = project::load(&workspace, project_id)?;
    let tasks = workspace.tasks().find_by_project_id(&project.id)?;

    let chains = CriticalChainService::new();
    let chain = chains.get_critical_chain_tasks(&project, &tasks);
    let completion = chains.calculate_project_completion(&project, &tasks);
    let status = buffers.get_buffer_status(&project, completion);

    if output.is_json() {
        output.data(&serde_json::json!({
            "project_id": project.id,
            "name": project.name,
            "completion": completion,
            "buffer_size": project.buffer_size,
            "buffer_consumed": project.buffer_consumed,
            "buffer_status": status.summary(),
            "critical_chain": chain.iter().map(|task| serde_json::json!({
                "id": task.id,
                "name": task.name,
                "status": task.status,
                "estimated_hours": task.estimated_hours,
                "actual_hours": task.actual_hours,
                "buffer_impact": buffers.calculate_buffer_impact(task),
            })).collect::<Vec<_>>(),
        }));
        return Ok(());
    }

    let (color, _, description) = status.display_info();

    println!("Project: {} ({})", project.name, project.status);
    println!("Chain completion: {}", percent(completion));
    println!(
        "Buffer: {} of {} consumed",
        hours(project.buffer_consumed),
        hours(project.buffer_size)
    );
    println!(
        "Consumption vs. progress: {:.2} [{}] {}",
        status.consumption_rate(),
        color,
        description
    );

    if chain.is_empty() {
        println!();
        println!("No critical chain recorded. Run 'ccpm chain {}' first.", project.id);
        return Ok(());
    }

    println!();
    println!("{:<38} {:<12} {:>8} {:>8} {:>8} NAME", "ID", "STATUS", "EST", "ACTUAL", "IMPACT");
    println!("{}", "-".repeat(96));
    for task in &chain {
        println!(
            "{:<38} {:<12} {:>8} {:>8} {:>+8.1} {}",
            task.id,
            task.status,
            hours(task.estimated_hours),
            hours(task.actual_hours),
            buffers.calculate_buffer_impact(task),
            task.name
        );
    }

    Ok(())
}
