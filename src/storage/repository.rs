//! Repository traits
//!
//! One capability set per entity. The scoped finders are provided on top of
//! `find_all`. Adapters implement the generic [`EntityStore`] and
//! `impl_repositories!` wires it to all three repositories. Every list comes back ordered by creation time,
//! then ID.

use chrono::{DateTime, Utc};
use std::fmt;
use std::hash::Hash;
use std::path::PathBuf;
use thiserror::Error;

use super::jsonl::JsonlStore;
use super::memory::MemoryStore;
use crate::domain::{
    PlainRecord, Project, ProjectId, ProjectStatus, RecordError, Task, TaskId, TaskStatus,
    TimeRecord, TimeRecordId,
};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed line {line} in {path}: {source}")]
    Json {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Bad record at line {line} in {path}: {source}")]
    Record {
        path: PathBuf,
        line: usize,
        #[source]
        source: RecordError,
    },

    #[error("Failed to encode {kind}: {source}")]
    Encode {
        kind: &'static str,
        #[source]
        source: RecordError,
    },

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("In-memory store lock poisoned")]
    Poisoned,
}

/// An entity that can be kept in a repository
pub trait Entity: PlainRecord + Clone {
    type Id: Copy + Eq + Ord + Hash + fmt::Display + fmt::Debug;

    fn id(&self) -> Self::Id;

    fn created_at(&self) -> DateTime<Utc>;
}

impl Entity for Task {
    type Id = TaskId;

    fn id(&self) -> TaskId {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Entity for Project {
    type Id = ProjectId;

    fn id(&self) -> ProjectId {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Entity for TimeRecord {
    type Id = TimeRecordId;

    fn id(&self) -> TimeRecordId {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Sorts entities by creation time, then ID
pub(crate) fn sort_entities<T: Entity>(entities: &mut [T]) {
    entities.sort_by(|a, b| {
        a.created_at()
            .cmp(&b.created_at())
            .then_with(|| a.id().cmp(&b.id()))
    });
}

/// Looks up an entity that must exist
pub fn require<T: Entity>(found: Option<T>, id: &T::Id) -> Result<T, StorageError> {
    found.ok_or_else(|| StorageError::NotFound {
        kind: T::KIND,
        id: id.to_string(),
    })
}

pub trait TaskRepository {
    /// Inserts or replaces a task
    fn save(&self, task: Task) -> Result<Task, StorageError>;

    fn find_by_id(&self, id: &TaskId) -> Result<Option<Task>, StorageError>;

    fn find_all(&self) -> Result<Vec<Task>, StorageError>;

    /// Removes a task; false if it did not exist
    fn delete(&self, id: &TaskId) -> Result<bool, StorageError>;

    fn find_by_project_id(&self, project_id: &ProjectId) -> Result<Vec<Task>, StorageError> {
        let mut tasks = self.find_all()?;
        tasks.retain(|task| &task.project_id == project_id);
        Ok(tasks)
    }

    fn find_by_status(&self, status: TaskStatus) -> Result<Vec<Task>, StorageError> {
        let mut tasks = self.find_all()?;
        tasks.retain(|task| task.status == status);
        Ok(tasks)
    }

    fn find_by_project_and_status(
        &self,
        project_id: &ProjectId,
        status: TaskStatus,
    ) -> Result<Vec<Task>, StorageError> {
        let mut tasks = self.find_by_project_id(project_id)?;
        tasks.retain(|task| task.status == status);
        Ok(tasks)
    }
}

pub trait ProjectRepository {
    /// Inserts or replaces a project
    fn save(&self, project: Project) -> Result<Project, StorageError>;

    fn find_by_id(&self, id: &ProjectId) -> Result<Option<Project>, StorageError>;

    fn find_all(&self) -> Result<Vec<Project>, StorageError>;

    /// Removes a project; false if it did not exist
    fn delete(&self, id: &ProjectId) -> Result<bool, StorageError>;

    fn find_by_status(&self, status: ProjectStatus) -> Result<Vec<Project>, StorageError> {
        let mut projects = self.find_all()?;
        projects.retain(|project| project.status == status);
        Ok(projects)
    }
}

pub trait TimeRecordRepository {
    /// Inserts or replaces a time record
    fn save(&self, record: TimeRecord) -> Result<TimeRecord, StorageError>;

    fn find_by_id(&self, id: &TimeRecordId) -> Result<Option<TimeRecord>, StorageError>;

    fn find_all(&self) -> Result<Vec<TimeRecord>, StorageError>;

    /// Removes a time record; false if it did not exist
    fn delete(&self, id: &TimeRecordId) -> Result<bool, StorageError>;

    fn find_by_task_id(&self, task_id: &TaskId) -> Result<Vec<TimeRecord>, StorageError> {
        let mut records = self.find_all()?;
        records.retain(|record| &record.task_id == task_id);
        Ok(records)
    }

    /// The running record for a task, if any
    ///
    /// Should several be running, the most recently started one wins.
    fn find_active_record(&self, task_id: &TaskId) -> Result<Option<TimeRecord>, StorageError> {
        Ok(self
            .find_by_task_id(task_id)?
            .into_iter()
            .filter(TimeRecord::is_active)
            .max_by_key(|record| record.start_time))
    }

    /// Records that started within `[start, end]`
    fn find_by_date_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TimeRecord>, StorageError> {
        let mut records = self.find_all()?;
        records.retain(|record| record.start_time >= start && record.start_time <= end);
        Ok(records)
    }
}

/// Generic keyed storage for one entity type
pub trait EntityStore<T: Entity> {
    fn put(&self, entity: T) -> Result<T, StorageError>;

    fn get(&self, id: &T::Id) -> Result<Option<T>, StorageError>;

    /// All entities, ordered by creation time then ID
    fn list(&self) -> Result<Vec<T>, StorageError>;

    fn remove(&self, id: &T::Id) -> Result<bool, StorageError>;
}

macro_rules! impl_repositories {
    ($($store:ident),+) => {$(
        impl TaskRepository for $store<Task> {
            fn save(&self, task: Task) -> Result<Task, StorageError> {
                EntityStore::put(self, task)
            }

            fn find_by_id(&self, id: &TaskId) -> Result<Option<Task>, StorageError> {
                EntityStore::get(self, id)
            }

            fn find_all(&self) -> Result<Vec<Task>, StorageError> {
                EntityStore::list(self)
            }

            fn delete(&self, id: &TaskId) -> Result<bool, StorageError> {
                EntityStore::remove(self, id)
            }
        }

        impl ProjectRepository for $store<Project> {
            fn save(&self, project: Project) -> Result<Project, StorageError> {
                EntityStore::put(self, project)
            }

            fn find_by_id(&self, id: &ProjectId) -> Result<Option<Project>, StorageError> {
                EntityStore::get(self, id)
            }

            fn find_all(&self) -> Result<Vec<Project>, StorageError> {
                EntityStore::list(self)
            }

            fn delete(&self, id: &ProjectId) -> Result<bool, StorageError> {
                EntityStore::remove(self, id)
            }
        }

        impl TimeRecordRepository for $store<TimeRecord> {
            fn save(&self, record: TimeRecord) -> Result<TimeRecord, StorageError> {
                EntityStore::put(self, record)
            }

            fn find_by_id(&self, id: &TimeRecordId) -> Result<Option<TimeRecord>, StorageError> {
                EntityStore::get(self, id)
            }

            fn find_all(&self) -> Result<Vec<TimeRecord>, StorageError> {
                EntityStore::list(self)
            }

            fn delete(&self, id: &TimeRecordId) -> Result<bool, StorageError> {
                EntityStore::remove(self, id)
            }
        }
    )+};
}

impl_repositories!(MemoryStore, JsonlStore);
