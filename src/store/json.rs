use crate::error::{Error, Result};
use crate::store::{Entry, EntryStore};
use crate::store::EntryUpdate;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// [`EntryStore`] backed by one pretty-printed JSON file
///
/// Writes, and every load-modify-save done through [`EntryStore::update`],
/// are serialized by a lock shared between clones of the store.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl JsonFileStore {
    /// Create a store reading and writing `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// File holding the entries
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `entries`; callers hold `write_lock`
    async fn write(&self, entries: &[Entry]) -> Result<()> {
        let persistence = |e: std::io::Error| {
            tracing::error!(error = %e, "Failed to write entry file");
            Error::Persistence(format!("Failed to write {}: {}", self.path.display(), e))
        };

        if let Some(dir) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await.map_err(persistence)?;
        }

        let json = serde_json::to_string_pretty(entries)?;

        // Write beside the target and rename so readers never see a torn file.
        // The name is unique so a writer in another process cannot collide.
        let tmp = self
            .path
            .with_extension(format!("json.{}.tmp", Uuid::new_v4().simple()));
        tokio::fs::write(&tmp, json).await.map_err(persistence)?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(persistence(e));
        }

        tracing::info!(count = entries.len(), "Saved entries");
        Ok(())
    }
}

#[async_trait]
impl EntryStore for JsonFileStore {
    #[tracing::instrument(skip(self), fields(path = %self.path.display()))]
    async fn load(&self) -> Result<Vec<Entry>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No entry file yet, starting empty");
                return Ok(Vec::new());
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to read entry file");
                return Err(Error::Persistence(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };

        let entries: Vec<Entry> = serde_json::from_str(&content).map_err(|e| {
            tracing::error!(error = %e, "Entry file is not a valid entry list");
            Error::Serialization(format!("Invalid entry file {}: {}", self.path.display(), e))
        })?;
        tracing::debug!(count = entries.len(), "Loaded entries");
        Ok(entries)
    }

    #[tracing::instrument(skip(self, entries), fields(path = %self.path.display(), count = entries.len()))]
    async fn save(&self, entries: &[Entry]) -> Result<()> {
        let _write = self.write_lock.lock().await;
        self.write(entries).await
    }

    #[tracing::instrument(skip(self, apply), fields(path = %self.path.display()))]
    async fn update(&self, apply: EntryUpdate) -> Result<Vec<Entry>> {
        let _write = self.write_lock.lock().await;
        let mut entries = self.load().await?;
        apply(&mut entries);
        self.write(&entries).await?;
        Ok(entries)
    }
}

/// Read an entry list from an arbitrary JSON file.
///
/// # Errors
///
/// [`Error::EntryNotFound`] when the file does not exist,
/// [`Error::Serialization`] when it is not a JSON entry list.
#[tracing::instrument(skip(path), fields(path = %path.as_ref().display()))]
pub async fn import_entries(path: impl AsRef<Path>) -> Result<Vec<Entry>> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::EntryNotFound(format!("File does not exist: {}", path.display()))
        } else {
            Error::Persistence(format!("Failed to read {}: {}", path.display(), e))
        }
    })?;

    let entries: Vec<Entry> = serde_json::from_str(&content)?;
    tracing::info!(count = entries.len(), "Imported entries");
    Ok(entries)
}
