//! Plain-record encoding
//!
//! Entities cross the storage boundary as flat JSON objects: field name to
//! primitive value. IDs are canonical UUID strings, timestamps are ISO-8601
//! strings (`null` when absent), numbers are reals and collections are
//! ordered lists of string IDs.
//!
//! Derived values (variance, consumption rate, ...) are written alongside the
//! stored fields for the benefit of readers, but they are never trusted on
//! decode: they are dropped and recomputed from the stored fields.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Invalid {kind} record: {source}")]
    Invalid {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid {kind} record: expected an object")]
    NotAnObject { kind: &'static str },
}

/// An entity with a lossless plain-record form
pub trait PlainRecord: Serialize + DeserializeOwned {
    /// Entity name used in error messages
    const KIND: &'static str;

    /// Derived values emitted on encode and ignored on decode
    fn derived_fields(&self) -> Vec<(&'static str, Value)> {
        Vec::new()
    }

    /// Encodes the entity, including its derived values
    fn to_record(&self) -> Result<Map<String, Value>, RecordError> {
        let value = serde_json::to_value(self).map_err(|source| RecordError::Invalid {
            kind: Self::KIND,
            source,
        })?;

        let Value::Object(mut record) = value else {
            return Err(RecordError::NotAnObject { kind: Self::KIND });
        };

        for (key, derived) in self.derived_fields() {
            record.insert(key.to_string(), derived);
        }

        Ok(record)
    }

    /// Decodes an entity, recomputing anything derived
    fn from_record(mut record: Map<String, Value>) -> Result<Self, RecordError> {
        for key in Self::derived_keys() {
            record.remove(*key);
        }

        serde_json::from_value(Value::Object(record)).map_err(|source| RecordError::Invalid {
            kind: Self::KIND,
            source,
        })
    }

    /// Decodes an entity from an arbitrary JSON value
    fn from_value(value: Value) -> Result<Self, RecordError> {
        match value {
            Value::Object(record) => Self::from_record(record),
            _ => Err(RecordError::NotAnObject { kind: Self::KIND }),
        }
    }

    /// Keys of the derived values
    fn derived_keys() -> &'static [&'static str] {
        &[]
    }
}
