//! Critical chain identification and project completion

use std::collections::HashMap;
use tracing::{debug, warn};

use crate::domain::{DependencyGraph, GraphError, Project, Task, TaskId, TaskStatus};

/// Identifies critical chains and measures progress along them
#[derive(Debug, Clone, Copy, Default)]
pub struct CriticalChainService;

impl CriticalChainService {
    pub fn new() -> Self {
        Self
    }

    /// Returns the critical chain of a task snapshot as task IDs in dependency order
    ///
    /// Fails without a partial result if the dependencies form a cycle.
    pub fn identify_critical_chain(&self, tasks: &[Task]) -> Result<Vec<TaskId>, GraphError> {
        if tasks.is_empty() {
            return Ok(Vec::new());
        }

        let graph = DependencyGraph::from_tasks(tasks)?;
        let chain = graph.critical_path();
        debug!(tasks = tasks.len(), chain = chain.len(), "Identified critical chain");
        Ok(chain)
    }

    /// Recomputes and stores the project's critical chain
    pub fn update_project_critical_chain<'p>(
        &self,
        project: &'p mut Project,
        tasks: &[Task],
    ) -> Result<&'p mut Project, GraphError> {
        let chain = self.identify_critical_chain(tasks)?;
        project.set_critical_chain(chain);
        Ok(project)
    }

    /// Resolves the project's stored chain against a task snapshot
    ///
    /// IDs missing from the snapshot are dropped. When an ID appears more than
    /// once in the snapshot, its last record is used.
    pub fn get_critical_chain_tasks<'t>(&self, project: &Project, tasks: &'t [Task]) -> Vec<&'t Task> {
        let by_id: HashMap<TaskId, &Task> = tasks.iter().map(|task| (task.id, task)).collect();

        project
            .critical_chain
            .iter()
            .filter_map(|id| {
                let task = by_id.get(id).copied();
                if task.is_none() {
                    warn!(project = %project.id, task = %id, "Critical chain task not in snapshot");
                }
                task
            })
            .collect()
    }

    /// Share of the critical chain's effort that is done, in [0, 1]
    ///
    /// Completed tasks count in full. In-progress tasks count their actual
    /// effort, capped at their own estimate.
    pub fn calculate_project_completion(&self, project: &Project, tasks: &[Task]) -> f64 {
        let chain = self.get_critical_chain_tasks(project, tasks);
        if chain.is_empty() {
            return 0.0;
        }

        let total: f64 = chain.iter().map(|task| task.estimated_hours).sum();
        if total <= 0.0 {
            return 0.0;
        }

        let completed: f64 = chain
            .iter()
            .filter(|task| task.is_completed())
            .map(|task| task.estimated_hours)
            .sum();

        let in_progress: f64 = chain
            .iter()
            .filter(|task| task.status == TaskStatus::InProgress && task.estimated_hours > 0.0)
            .map(|task| (task.actual_hours / task.estimated_hours).min(1.0) * task.estimated_hours)
            .sum();

        ((completed + in_progress) / total).clamp(0.0, 1.0)
    }
}
