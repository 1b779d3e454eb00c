//! Task domain model
//!
//! Tasks are the units of work within a project. Each carries a 50%-confidence
//! effort estimate and the actual effort spent so far, both in hours, and the
//! IDs of the tasks that must complete before it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::clock::Clock;
use super::id::{ProjectId, TaskId};
use super::record::PlainRecord;

/// Default priority for new tasks (1 = highest, 5 = lowest)
pub const DEFAULT_PRIORITY: u8 = 3;

/// Status of a task
///
/// Status only moves forward: not started, in progress, completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

impl TaskStatus {
    /// Next status when work starts, if starting is allowed from here
    pub fn start(self) -> Option<TaskStatus> {
        match self {
            TaskStatus::NotStarted => Some(TaskStatus::InProgress),
            _ => None,
        }
    }

    /// Next status when work completes, if completing is allowed from here
    pub fn complete(self) -> Option<TaskStatus> {
        match self {
            TaskStatus::Completed => None,
            _ => Some(TaskStatus::Completed),
        }
    }

    /// Returns true if this status represents completion
    pub fn is_complete(&self) -> bool {
        matches!(self, TaskStatus::Completed)
    }

    /// Returns true if this task is currently being worked on
    pub fn is_active(&self) -> bool {
        matches!(self, TaskStatus::InProgress)
    }

    /// Returns the record/CLI label
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "not_started",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "not_started" => Ok(TaskStatus::NotStarted),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            other => Err(format!(
                "unknown task status '{}' (expected not_started, in_progress or completed)",
                other
            )),
        }
    }
}

fn default_priority() -> u8 {
    DEFAULT_PRIORITY
}

/// A task within a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier
    #[serde(default)]
    pub id: TaskId,

    /// Owning project
    pub project_id: ProjectId,

    /// Human-readable name
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub status: TaskStatus,

    /// Priority, 1 (highest) to 5 (lowest)
    #[serde(default = "default_priority")]
    pub priority: u8,

    /// Effort estimate in hours
    #[serde(default)]
    pub estimated_hours: f64,

    /// Effort spent so far in hours
    #[serde(default)]
    pub actual_hours: f64,

    /// Tasks that must complete before this one, in insertion order
    #[serde(default)]
    pub dependencies: Vec<TaskId>,

    /// When work started
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,

    /// When work completed
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub category: String,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a not-started task with no effort recorded
    pub fn new(
        project_id: ProjectId,
        name: impl Into<String>,
        estimated_hours: f64,
        clock: &dyn Clock,
    ) -> Self {
        let now = clock.now();
        Self {
            id: TaskId::new(),
            project_id,
            name: name.into(),
            description: String::new(),
            status: TaskStatus::NotStarted,
            priority: DEFAULT_PRIORITY,
            estimated_hours,
            actual_hours: 0.0,
            dependencies: Vec::new(),
            start_date: None,
            end_date: None,
            category: String::new(),
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns true once work has started (in progress or completed)
    pub fn is_started(&self) -> bool {
        matches!(self.status, TaskStatus::InProgress | TaskStatus::Completed)
    }

    /// Returns true if the task is completed
    pub fn is_completed(&self) -> bool {
        self.status.is_complete()
    }

    /// Actual minus estimated effort
    ///
    /// Positive values mean the task overran its estimate.
    pub fn variance(&self) -> f64 {
        self.actual_hours - self.estimated_hours
    }

    /// Actual over estimated effort, or 1.0 when there is no estimate
    pub fn variance_ratio(&self) -> f64 {
        if self.estimated_hours <= 0.0 {
            return 1.0;
        }
        self.actual_hours / self.estimated_hours
    }

    /// Transitions to in progress, stamping the start date
    ///
    /// Returns false (and changes nothing) unless the task was not started.
    pub fn start(&mut self, clock: &dyn Clock) -> bool {
        let Some(next) = self.status.start() else {
            return false;
        };
        let now = clock.now();
        self.status = next;
        self.start_date = Some(now);
        self.updated_at = now;
        true
    }

    /// Transitions to completed, stamping the end date
    ///
    /// Returns false (and changes nothing) if the task was already completed.
    pub fn complete(&mut self, clock: &dyn Clock) -> bool {
        let Some(next) = self.status.complete() else {
            return false;
        };
        let now = clock.now();
        self.status = next;
        self.end_date = Some(now);
        self.updated_at = now;
        true
    }

    /// Adds effort to the actual hours
    ///
    /// Negative or non-finite amounts are ignored.
    pub fn log_hours(&mut self, hours: f64, clock: &dyn Clock) -> bool {
        if !hours.is_finite() || hours < 0.0 {
            return false;
        }
        self.actual_hours += hours;
        self.updated_at = clock.now();
        true
    }

    /// Adds a dependency on another task
    pub fn add_dependency(&mut self, task_id: TaskId, clock: &dyn Clock) -> bool {
        if self.dependencies.contains(&task_id) {
            return false;
        }
        self.dependencies.push(task_id);
        self.updated_at = clock.now();
        true
    }

    /// Removes a dependency on another task
    pub fn remove_dependency(&mut self, task_id: &TaskId, clock: &dyn Clock) -> bool {
        let len_before = self.dependencies.len();
        self.dependencies.retain(|dep| dep != task_id);
        if self.dependencies.len() == len_before {
            return false;
        }
        self.updated_at = clock.now();
        true
    }

    pub fn add_tag(&mut self, tag: impl Into<String>, clock: &dyn Clock) -> bool {
        let tag = tag.into();
        if self.tags.contains(&tag) {
            return false;
        }
        self.tags.push(tag);
        self.updated_at = clock.now();
        true
    }

    pub fn remove_tag(&mut self, tag: &str, clock: &dyn Clock) -> bool {
        let len_before = self.tags.len();
        self.tags.retain(|t| t != tag);
        if self.tags.len() == len_before {
            return false;
        }
        self.updated_at = clock.now();
        true
    }
}

impl PlainRecord for Task {
    const KIND: &'static str = "task";

    fn derived_fields(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("variance", Value::from(self.variance())),
            ("variance_ratio", Value::from(self.variance_ratio())),
        ]
    }

    fn derived_keys() -> &'static [&'static str] {
        &["variance", "variance_ratio"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clock::FixedClock;
    use chrono::TimeZone;

    fn clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap())
    }

    fn make_task(hours: f64) -> Task {
        Task::new(ProjectId::new(), "Design", hours, &clock())
    }

    #[test]
    fn new_task_defaults() {
        let task = make_task(8.0);
        assert_eq!(task.status, TaskStatus::NotStarted);
        assert_eq!(task.priority, DEFAULT_PRIORITY);
        assert_eq!(task.actual_hours, 0.0);
        assert!(!task.is_started());
        assert!(task.dependencies.is_empty());
        assert_eq!(task.created_at, clock().now());
    }

    #[test]
    fn status_transition_table() {
        assert_eq!(TaskStatus::NotStarted.start(), Some(TaskStatus::InProgress));
        assert_eq!(TaskStatus::InProgress.start(), None);
        assert_eq!(TaskStatus::Completed.start(), None);

        assert_eq!(TaskStatus::NotStarted.complete(), Some(TaskStatus::Completed));
        assert_eq!(TaskStatus::InProgress.complete(), Some(TaskStatus::Completed));
        assert_eq!(TaskStatus::Completed.complete(), None);
    }

    #[test]
    fn start_and_complete_stamp_dates() {
        let mut task = make_task(8.0);
        let later = FixedClock(Utc.with_ymd_and_hms(2025, 3, 2, 10, 0, 0).unwrap());

        assert!(task.start(&later));
        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(task.start_date, Some(later.now()));
        assert!(task.is_started());

        // Starting twice is a no-op
        assert!(!task.start(&clock()));
        assert_eq!(task.start_date, Some(later.now()));

        let done_at = FixedClock(Utc.with_ymd_and_hms(2025, 3, 3, 17, 0, 0).unwrap());
        assert!(task.complete(&done_at));
        assert!(task.is_completed());
        assert_eq!(task.end_date, Some(done_at.now()));
        assert_eq!(task.updated_at, done_at.now());

        assert!(!task.complete(&clock()));
        assert_eq!(task.end_date, Some(done_at.now()));
    }

    #[test]
    fn complete_from_not_started_skips_start_date() {
        let mut task = make_task(8.0);
        assert!(task.complete(&clock()));
        assert!(task.start_date.is_none());
        assert!(task.end_date.is_some());
    }

    #[test]
    fn variance_and_ratio() {
        let mut task = make_task(20.0);
        task.actual_hours = 25.0;
        assert_eq!(task.variance(), 5.0);
        assert_eq!(task.variance_ratio(), 1.25);

        task.actual_hours = 10.0;
        assert_eq!(task.variance(), -10.0);
        assert_eq!(task.variance_ratio(), 0.5);
    }

    #[test]
    fn variance_ratio_without_estimate_is_one() {
        let mut task = make_task(0.0);
        task.actual_hours = 3.0;
        assert_eq!(task.variance_ratio(), 1.0);
    }

    #[test]
    fn dependencies_are_a_set_in_insertion_order() {
        let mut task = make_task(1.0);
        let a = TaskId::new();
        let b = TaskId::new();

        assert!(task.add_dependency(a, &clock()));
        assert!(task.add_dependency(b, &clock()));
        assert!(!task.add_dependency(a, &clock()));
        assert_eq!(task.dependencies, vec![a, b]);

        assert!(task.remove_dependency(&a, &clock()));
        assert!(!task.remove_dependency(&a, &clock()));
        assert_eq!(task.dependencies, vec![b]);
    }

    #[test]
    fn tags() {
        let mut task = make_task(1.0);
        assert!(task.add_tag("backend", &clock()));
        assert!(!task.add_tag("backend", &clock()));
        assert!(task.remove_tag("backend", &clock()));
        assert!(task.tags.is_empty());
    }

    #[test]
    fn log_hours_rejects_negative() {
        let mut task = make_task(4.0);
        assert!(task.log_hours(1.5, &clock()));
        assert!(!task.log_hours(-1.0, &clock()));
        assert!(!task.log_hours(f64::NAN, &clock()));
        assert_eq!(task.actual_hours, 1.5);
    }

    #[test]
    fn status_parse_and_display() {
        for status in [
            TaskStatus::NotStarted,
            TaskStatus::InProgress,
            TaskStatus::Completed,
        ] {
            assert_eq!(status.to_string().parse::<TaskStatus>(), Ok(status));
        }
        assert!("done".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn record_roundtrip_recomputes_derived_fields() {
        let mut task = make_task(20.0);
        task.actual_hours = 10.0;
        task.dependencies.push(TaskId::new());
        task.tags.push("api".to_string());
        task.start(&clock());

        let mut record = task.to_record().unwrap();
        assert_eq!(record["variance"], Value::from(-10.0));
        assert_eq!(record["variance_ratio"], Value::from(0.5));
        assert_eq!(record["status"], Value::from("in_progress"));
        assert_eq!(record["end_date"], Value::Null);
        assert_eq!(record["id"], Value::from(task.id.to_string()));

        // Stale derived values are not trusted
        record.insert("variance".to_string(), Value::from(999.0));
        let decoded = Task::from_record(record).unwrap();
        assert_eq!(decoded, task);
        assert_eq!(decoded.variance(), -10.0);
    }

    #[test]
    fn record_defaults_for_missing_fields() {
        let project_id = ProjectId::new();
        let record = serde_json::json!({
            "project_id": project_id.to_string(),
            "name": "Minimal",
        });

        let task = Task::from_value(record).unwrap();
        assert_eq!(task.project_id, project_id);
        assert_eq!(task.status, TaskStatus::NotStarted);
        assert_eq!(task.priority, DEFAULT_PRIORITY);
        assert_eq!(task.estimated_hours, 0.0);
        assert!(task.start_date.is_none());
    }

    #[test]
    fn record_with_bad_status_rejected() {
        let record = serde_json::json!({
            "project_id": ProjectId::new().to_string(),
            "name": "Broken",
            "status": "done",
        });

        let err = Task::from_value(record).unwrap_err();
        assert!(err.to_string().contains("Invalid task record"));
    }

    mod encoding {
        use super::*;
        use proptest::prelude::*;

        fn finite_hours() -> impl Strategy<Value = f64> {
            prop::num::f64::POSITIVE
                | prop::num::f64::NORMAL
                | prop::num::f64::SUBNORMAL
                | prop::num::f64::ZERO
        }

        proptest! {
            #[test]
            fn hours_survive_a_jsonl_line(estimated in finite_hours(), actual in finite_hours()) {
                let mut task = make_task(estimated);
                task.actual_hours = actual;

                let line = serde_json::to_string(&Value::Object(task.to_record().unwrap())).unwrap();
                let decoded = Task::from_value(serde_json::from_str(&line).unwrap()).unwrap();

                prop_assert_eq!(decoded.estimated_hours.to_bits(), estimated.to_bits());
                prop_assert_eq!(decoded.actual_hours.to_bits(), actual.to_bits());
            }
        }

        #[test]
        fn timer_durations_survive_a_jsonl_line() {
            let mut task = make_task(207.96181086732759);
            task.actual_hours = 1234567.0 / 3.6e6;

            let line = serde_json::to_string(&Value::Object(task.to_record().unwrap())).unwrap();
            let decoded = Task::from_value(serde_json::from_str(&line).unwrap()).unwrap();

            assert_eq!(decoded, task);
        }
    }
}
