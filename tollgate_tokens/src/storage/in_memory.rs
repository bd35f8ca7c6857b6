//! An in-memory credential storage backend

use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};

use async_trait::async_trait;

use super::{CredentialStorage, StorageError};

/// Process-local credential storage
///
/// Values do not survive a restart.
#[derive(Default, Debug)]
pub struct InMemoryStorage {
    slots: Mutex<HashMap<String, String>>,
}

impl InMemoryStorage {
    /// Constructs a new, empty in-memory storage
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStorage for InMemoryStorage {
    async fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(slots.get(key).cloned())
    }

    async fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.remove(key);
        Ok(())
    }
}
