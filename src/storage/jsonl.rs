//! JSONL storage for entities
//!
//! Each entity type lives in its own file under `.ccpm/` with one plain record
//! per line. Saves append a line; when an ID appears on several lines the last
//! one wins. Deletes rewrite the file atomically, and so does a save once
//! superseded lines outnumber live ones. Uses file locking for concurrent
//! access safety.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde_json::Value;
use tracing::debug;

use super::repository::{sort_entities, Entity, EntityStore, StorageError};
use crate::domain::{Project, Task, TimeRecord};

pub type JsonlTaskRepository = JsonlStore<Task>;
pub type JsonlProjectRepository = JsonlStore<Project>;
pub type JsonlTimeRecordRepository = JsonlStore<TimeRecord>;

/// Superseded lines a file may carry before a save rewrites it
const COMPACT_MIN_SUPERSEDED: usize = 32;

/// Store for one entity type in JSONL format
#[derive(Debug)]
pub struct JsonlStore<T: Entity> {
    path: PathBuf,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> JsonlStore<T> {
    /// Creates a new store at the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _entity: PhantomData,
        }
    }

    /// Returns the path to the store file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Reads all entities, keyed by ID
    pub fn read_all(&self) -> Result<BTreeMap<T::Id, T>, StorageError> {
        self.read_entries().map(|(entities, _)| entities)
    }

    /// Reads all entities along with the number of records in the file
    fn read_entries(&self) -> Result<(BTreeMap<T::Id, T>, usize), StorageError> {
        if !self.path.exists() {
            return Ok((BTreeMap::new(), 0));
        }

        let file = File::open(&self.path).map_err(|e| self.io_error(e))?;

        // Acquire shared lock for reading
        file.lock_shared().map_err(|e| self.io_error(e))?;

        let reader = BufReader::new(&file);
        let mut entities = BTreeMap::new();
        let mut records = 0;

        for (index, line) in reader.lines().enumerate() {
            let line_num = index + 1;
            let line = line.map_err(|e| self.io_error(e))?;

            if line.trim().is_empty() {
                continue;
            }

            let value: Value = serde_json::from_str(&line).map_err(|source| StorageError::Json {
                path: self.path.clone(),
                line: line_num,
                source,
            })?;

            let entity = T::from_value(value).map_err(|source| StorageError::Record {
                path: self.path.clone(),
                line: line_num,
                source,
            })?;

            entities.insert(entity.id(), entity);
            records += 1;
        }

        // Lock is released when file is dropped
        Ok((entities, records))
    }

    fn ensure_parent(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| StorageError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        Ok(())
    }

    fn encode(entity: &T) -> Result<String, StorageError> {
        let record = entity
            .to_record()
            .map_err(|source| StorageError::Encode { kind: T::KIND, source })?;
        Ok(Value::Object(record).to_string())
    }

    /// Writes all entities to the store (full rewrite)
    pub fn write_all(&self, entities: &BTreeMap<T::Id, T>) -> Result<(), StorageError> {
        self.ensure_parent()?;

        // Write to temp file first
        let temp_path = self.path.with_extension("jsonl.tmp");
        let temp_error = |source| StorageError::Io {
            path: temp_path.clone(),
            source,
        };

        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .map_err(temp_error)?;

            // Acquire exclusive lock
            file.lock_exclusive().map_err(temp_error)?;

            let mut writer = BufWriter::new(&file);

            let mut sorted: Vec<T> = entities.values().cloned().collect();
            sort_entities(&mut sorted);

            for entity in &sorted {
                writeln!(writer, "{}", Self::encode(entity)?).map_err(temp_error)?;
            }

            writer.flush().map_err(temp_error)?;
        }

        // Atomic rename
        fs::rename(&temp_path, &self.path).map_err(|e| self.io_error(e))?;

        Ok(())
    }

    /// Appends a single entity without rewriting the file
    pub fn append(&self, entity: &T) -> Result<(), StorageError> {
        self.ensure_parent()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_error(e))?;

        // Acquire exclusive lock
        file.lock_exclusive().map_err(|e| self.io_error(e))?;

        let mut writer = BufWriter::new(&file);
        writeln!(writer, "{}", Self::encode(entity)?).map_err(|e| self.io_error(e))?;
        writer.flush().map_err(|e| self.io_error(e))?;

        Ok(())
    }

}

impl<T: Entity> EntityStore<T> for JsonlStore<T> {
    fn put(&self, entity: T) -> Result<T, StorageError> {
        let (mut entities, records) = self.read_entries()?;
        entities.insert(entity.id(), entity.clone());

        let live = entities.len();
        let superseded = (records + 1).saturating_sub(live);
        if superseded >= COMPACT_MIN_SUPERSEDED && superseded > live {
            self.write_all(&entities)?;
            debug!(path = %self.path.display(), live, superseded, "Compacted store");
        } else {
            self.append(&entity)?;
        }

        Ok(entity)
    }

    fn get(&self, id: &T::Id) -> Result<Option<T>, StorageError> {
        Ok(self.read_all()?.remove(id))
    }

    fn list(&self) -> Result<Vec<T>, StorageError> {
        let mut all: Vec<T> = self.read_all()?.into_values().collect();
        sort_entities(&mut all);
        Ok(all)
    }

    fn remove(&self, id: &T::Id) -> Result<bool, StorageError> {
        let mut entities = self.read_all()?;
        let removed = entities.remove(id).is_some();
        if removed {
            self.write_all(&entities)?;
        }
        Ok(removed)
    }
}
