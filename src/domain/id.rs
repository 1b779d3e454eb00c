//! Identifiers for projects, tasks and time records
//!
//! Every entity is identified by a random UUID (v4). The canonical text form
//! is the lowercase hyphenated UUID (e.g. `67e55044-10b1-426f-9247-bb680e5fe0c8`),
//! which is also what the plain-record encoding and the CLI use.
//!
//! The three ID types are distinct so a task id can never be passed where a
//! project id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq)]
pub enum IdError {
    #[error("Invalid {kind} ID: expected a UUID, got '{value}'")]
    Invalid { kind: &'static str, value: String },
}

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(Uuid);

        impl $name {
            /// Generates a new random ID
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wraps an existing UUID
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0.hyphenated())
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                Uuid::parse_str(s).map(Self).map_err(|_| IdError::Invalid {
                    kind: $kind,
                    value: s.to_string(),
                })
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.to_string()
            }
        }
    };
}

entity_id!(
    /// Identifier of a project
    ProjectId,
    "project"
);

entity_id!(
    /// Identifier of a task
    TaskId,
    "task"
);

entity_id!(
    /// Identifier of a time record
    TimeRecordId,
    "time record"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_ids_are_unique() {
        let a = TaskId::new();
        let b = TaskId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn display_is_canonical_hyphenated_form() {
        let uuid = Uuid::parse_str("67E55044-10B1-426F-9247-BB680E5FE0C8").unwrap();
        let id = ProjectId::from_uuid(uuid);
        assert_eq!(id.to_string(), "67e55044-10b1-426f-9247-bb680e5fe0c8");
    }

    #[test]
    fn parse_roundtrip() {
        let id = TaskId::new();
        let parsed: TaskId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn parse_trims_whitespace() {
        let id = TimeRecordId::new();
        let parsed: TimeRecordId = format!("  {}  ", id).parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn invalid_id_rejected() {
        let err = "t-1234567".parse::<TaskId>().unwrap_err();
        assert_eq!(
            err,
            IdError::Invalid {
                kind: "task",
                value: "t-1234567".to_string()
            }
        );
        assert!(err.to_string().contains("Invalid task ID"));
    }

    #[test]
    fn serde_as_string() {
        let id = ProjectId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));

        let back: ProjectId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn serde_rejects_garbage() {
        let result: Result<TaskId, _> = serde_json::from_str("\"not-a-uuid\"");
        assert!(result.is_err());
    }
}
