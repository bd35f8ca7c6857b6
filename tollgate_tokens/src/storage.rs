//! Persistence backends for credentials

use async_trait::async_trait;
use std::error;

#[cfg(feature = "file")]
pub mod file;
pub mod in_memory;

#[cfg(feature = "file")]
pub use file::FileStorage;
pub use in_memory::InMemoryStorage;

/// The error type returned by a storage backend
pub type StorageError = Box<dyn error::Error + Send + Sync + 'static>;

/// Raw key-value persistence for credentials
///
/// Backends report faults faithfully. Turning faults into "value absent" is
/// the job of [`CredentialStore`][crate::CredentialStore], which wraps a backend.
#[async_trait]
pub trait CredentialStorage: Send + Sync {
    /// Reads the value stored under `key`
    async fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Stores `value` under `key`, replacing any existing value
    async fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes any value stored under `key`
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}
