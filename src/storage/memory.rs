//! In-memory repositories
//!
//! Used by tests and by embedders that keep their own persistence.

use std::collections::BTreeMap;
use std::sync::RwLock;

use super::repository::{sort_entities, Entity, EntityStore, StorageError};
use crate::domain::{Project, Task, TimeRecord};

/// Entities held in an ordered map behind a lock
#[derive(Debug)]
pub struct MemoryStore<T: Entity> {
    items: RwLock<BTreeMap<T::Id, T>>,
}

pub type InMemoryTaskRepository = MemoryStore<Task>;
pub type InMemoryProjectRepository = MemoryStore<Project>;
pub type InMemoryTimeRecordRepository = MemoryStore<TimeRecord>;

impl<T: Entity> MemoryStore<T> {
    pub fn new() -> Self {
        Self {
            items: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of stored entities
    pub fn len(&self) -> usize {
        self.items.read().map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Entity> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> EntityStore<T> for MemoryStore<T> {
    fn put(&self, entity: T) -> Result<T, StorageError> {
        let mut items = self.items.write().map_err(|_| StorageError::Poisoned)?;
        items.insert(entity.id(), entity.clone());
        Ok(entity)
    }

    fn get(&self, id: &T::Id) -> Result<Option<T>, StorageError> {
        let items = self.items.read().map_err(|_| StorageError::Poisoned)?;
        Ok(items.get(id).cloned())
    }

    fn list(&self) -> Result<Vec<T>, StorageError> {
        let items = self.items.read().map_err(|_| StorageError::Poisoned)?;
        let mut all: Vec<T> = items.values().cloned().collect();
        sort_entities(&mut all);
        Ok(all)
    }

    fn remove(&self, id: &T::Id) -> Result<bool, StorageError> {
        let mut items = self.items.write().map_err(|_| StorageError::Poisoned)?;
        Ok(items.remove(id).is_some())
    }
}
