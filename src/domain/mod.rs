//! Domain models for CCPM
//!
//! Contains the entities, the dependency graph and the buffer status value
//! without any I/O concerns.

mod buffer_status;
mod clock;
mod graph;
mod id;
mod project;
mod record;
mod task;
mod time_record;

pub use buffer_status::{
    BufferStatus, BufferStatusSummary, BufferThresholds, BufferZone, ThresholdError,
};
pub use clock::{Clock, FixedClock, SystemClock};
pub use graph::{DependencyGraph, GraphError};
pub use id::{IdError, ProjectId, TaskId, TimeRecordId};
pub use project::{Project, ProjectStatus};
pub use record::{PlainRecord, RecordError};
pub use task::{Task, TaskStatus, DEFAULT_PRIORITY};
pub use time_record::TimeRecord;
