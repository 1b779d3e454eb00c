//! Project domain model
//!
//! A project groups tasks and owns the project buffer: a reserve of hours
//! placed after the critical chain. The critical chain itself is stored as an
//! ordered list of task IDs and is always recomputed, never edited in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::clock::Clock;
use super::id::{ProjectId, TaskId};
use super::record::PlainRecord;

/// Status of a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

impl ProjectStatus {
    /// Next status when the project starts, if allowed from here
    pub fn start(self) -> Option<ProjectStatus> {
        match self {
            ProjectStatus::NotStarted => Some(ProjectStatus::InProgress),
            _ => None,
        }
    }

    /// Next status when the project completes, if allowed from here
    pub fn complete(self) -> Option<ProjectStatus> {
        match self {
            ProjectStatus::Completed => None,
            _ => Some(ProjectStatus::Completed),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::NotStarted => "not_started",
            ProjectStatus::InProgress => "in_progress",
            ProjectStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProjectStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "not_started" => Ok(ProjectStatus::NotStarted),
            "in_progress" => Ok(ProjectStatus::InProgress),
            "completed" => Ok(ProjectStatus::Completed),
            other => Err(format!(
                "unknown project status '{}' (expected not_started, in_progress or completed)",
                other
            )),
        }
    }
}

/// A project and its buffer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub id: ProjectId,

    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default = "Utc::now")]
    pub start_date: DateTime<Utc>,

    #[serde(default)]
    pub planned_end_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub actual_end_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub status: ProjectStatus,

    /// Project buffer in hours
    #[serde(default)]
    pub buffer_size: f64,

    /// Buffer hours consumed so far (never below zero)
    #[serde(default)]
    pub buffer_consumed: f64,

    /// Task IDs on the critical chain, in dependency order
    #[serde(default)]
    pub critical_chain: Vec<TaskId>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Creates a not-started project with no buffer
    pub fn new(name: impl Into<String>, clock: &dyn Clock) -> Self {
        let now = clock.now();
        Self {
            id: ProjectId::new(),
            name: name.into(),
            description: String::new(),
            start_date: now,
            planned_end_date: None,
            actual_end_date: None,
            status: ProjectStatus::NotStarted,
            buffer_size: 0.0,
            buffer_consumed: 0.0,
            critical_chain: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Raw share of the buffer consumed, in [0, 1]
    ///
    /// Unlike the progress-relative rate computed by the buffer service, this
    /// does not account for how far the project has advanced.
    pub fn buffer_consumption_rate(&self) -> f64 {
        if self.buffer_size <= 0.0 {
            return 0.0;
        }
        (self.buffer_consumed / self.buffer_size).min(1.0)
    }

    /// Replaces the critical chain wholesale
    pub fn set_critical_chain(&mut self, chain: Vec<TaskId>) {
        self.critical_chain = chain;
    }

    /// Transitions to in progress, resetting the start date
    pub fn start(&mut self, clock: &dyn Clock) -> bool {
        let Some(next) = self.status.start() else {
            return false;
        };
        let now = clock.now();
        self.status = next;
        self.start_date = now;
        self.updated_at = now;
        true
    }

    /// Transitions to completed, stamping the actual end date
    pub fn complete(&mut self, clock: &dyn Clock) -> bool {
        let Some(next) = self.status.complete() else {
            return false;
        };
        let now = clock.now();
        self.status = next;
        self.actual_end_date = Some(now);
        self.updated_at = now;
        true
    }

    /// Sets the buffer sized for the current critical chain
    pub fn set_buffer_size(&mut self, hours: f64, clock: &dyn Clock) {
        self.buffer_size = hours;
        self.updated_at = clock.now();
    }

    /// Records buffer consumption
    pub fn consume_buffer(&mut self, hours: f64, clock: &dyn Clock) {
        self.buffer_consumed += hours;
        self.updated_at = clock.now();
    }

    /// Gives buffer back; consumption never drops below zero
    pub fn release_buffer(&mut self, hours: f64, clock: &dyn Clock) {
        self.buffer_consumed = (self.buffer_consumed - hours).max(0.0);
        self.updated_at = clock.now();
    }
}

impl PlainRecord for Project {
    const KIND: &'static str = "project";

    fn derived_fields(&self) -> Vec<(&'static str, Value)> {
        vec![(
            "buffer_consumption_rate",
            Value::from(self.buffer_consumption_rate()),
        )]
    }

    fn derived_keys() -> &'static [&'static str] {
        &["buffer_consumption_rate"]
    }
}
