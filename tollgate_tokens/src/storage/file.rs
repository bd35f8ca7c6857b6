//! A file-backed credential storage backend

use std::{collections::BTreeMap, ffi::OsString, io, path::PathBuf};

use async_trait::async_trait;
use tokio::{fs::OpenOptions, sync::Mutex};

use super::{CredentialStorage, StorageError};

type Slots = BTreeMap<String, String>;

/// Credential storage that persists all slots to a single local JSON file
///
/// A missing file is treated as empty storage. The file is created readable
/// only by its owner.
///
/// Updates are written to a staging file next to `path` and renamed over it,
/// so the file on disk always holds a complete document.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    staging_path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    /// Constructs a new file storage backed by `path`
    pub fn new(path: PathBuf) -> Self {
        let mut staging_name = path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("credentials"));
        staging_name.push(".tmp");
        let staging_path = path.with_file_name(staging_name);

        Self {
            path,
            staging_path,
            lock: Mutex::new(()),
        }
    }

    async fn read_slots(&self) -> Result<Slots, io::Error> {
        use tokio::io::AsyncReadExt;

        let mut file = match OpenOptions::new().read(true).open(&self.path).await {
            Ok(file) => file,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Slots::new()),
            Err(error) => return Err(error),
        };

        let mut data = String::new();
        file.read_to_string(&mut data).await?;
        if data.trim().is_empty() {
            return Ok(Slots::new());
        }

        let slots = serde_json::from_str(&data)?;
        Ok(slots)
    }

    async fn write_slots(&self, slots: &Slots) -> Result<(), io::Error> {
        use tokio::io::AsyncWriteExt;

        let mut file_opts = OpenOptions::new();

        file_opts.create(true).truncate(true).write(true);

        #[cfg(unix)]
        file_opts.mode(0o600);

        let mut file = file_opts.open(&self.staging_path).await?;
        let data = serde_json::to_string_pretty(slots)?;
        file.write_all(data.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&self.staging_path, &self.path).await
    }
}

#[async_trait]
impl CredentialStorage for FileStorage {
    async fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock().await;
        let mut slots = self.read_slots().await?;
        Ok(slots.remove(key))
    }

    async fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let mut slots = self.read_slots().await?;
        slots.insert(key.to_owned(), value.to_owned());
        Ok(self.write_slots(&slots).await?)
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let mut slots = self.read_slots().await?;
        if slots.remove(key).is_some() {
            self.write_slots(&slots).await?;
        }
        Ok(())
    }
}
