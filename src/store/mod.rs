//! Persistent list of registered dev servers.
//!
//! An [`Entry`] describes one dev server: its display name, the port it
//! binds, and the command file that starts it. The list is kept by an
//! [`EntryStore`]; [`JsonFileStore`] writes it as pretty-printed JSON to
//! `<dataDir>/ports.json`.
//!
//! The `isRunning` flag stored with each entry is a cached view only. Use
//! [`refresh`] to reconcile it with the ports.
mod json;

pub use json::{JsonFileStore, import_entries};

use crate::error::Result;
use crate::process::{EntryId, LifecycleManager};
use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// A registered dev server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// Identity, assigned once at creation
    pub id: EntryId,
    /// Display name
    pub name: String,
    /// TCP port the server binds
    pub port: u16,
    /// Command file that starts the server
    #[serde(default)]
    pub command_path: Option<String>,
    /// Project folder
    #[serde(default)]
    pub folder_path: Option<String>,
    /// Deployed URL
    #[serde(default)]
    pub deploy_url: Option<String>,
    /// Repository URL
    #[serde(default)]
    pub github_url: Option<String>,
    /// Last known running state
    #[serde(default)]
    pub is_running: bool,
}

impl Entry {
    /// Create an entry with a fresh millisecond-timestamp id
    pub fn new(name: impl Into<String>, port: u16) -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        Self {
            id: EntryId::new(millis.to_string()),
            name: name.into(),
            port,
            command_path: None,
            folder_path: None,
            deploy_url: None,
            github_url: None,
            is_running: false,
        }
    }

    /// Set the command file, deriving the folder from its parent directory
    pub fn with_command(mut self, command_path: impl AsRef<Path>) -> Self {
        let command_path = command_path.as_ref();
        self.folder_path = command_path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(|dir| dir.display().to_string());
        self.command_path = Some(command_path.display().to_string());
        self
    }
}

/// Where the entry list is kept
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Load every entry. A store that was never written is empty.
    async fn load(&self) -> Result<Vec<Entry>>;

    /// Replace the stored list with `entries`
    async fn save(&self, entries: &[Entry]) -> Result<()>;

    /// Load, modify and save as one step, returning the saved list.
    ///
    /// No other `save` or `update` on the same store runs in between.
    async fn update(&self, apply: EntryUpdate) -> Result<Vec<Entry>>;
}

/// In-place change applied by [`EntryStore::update`]
pub type EntryUpdate = Box<dyn FnOnce(&mut Vec<Entry>) + Send>;

/// Probe every entry's port concurrently.
///
/// Entries whose port cannot be probed are left out of the result.
async fn port_states(manager: &LifecycleManager, entries: &[Entry]) -> HashMap<EntryId, bool> {
    let checks = entries.iter().map(|entry| manager.check_status(entry.port));
    let results = join_all(checks).await;

    let mut states = HashMap::new();
    for (entry, result) in entries.iter().zip(results) {
        match result {
            Ok(running) => {
                states.insert(entry.id.clone(), running);
            }
            Err(e) => {
                tracing::warn!(
                    entry_id = %entry.id,
                    port = entry.port,
                    error = %e,
                    "Could not check port, keeping cached status"
                );
            }
        }
    }
    states
}

fn apply_states(entries: &mut [Entry], states: &HashMap<EntryId, bool>) {
    for entry in entries {
        if let Some(&running) = states.get(&entry.id) {
            entry.is_running = running;
        }
    }
}

/// Reconcile the cached `isRunning` flags with the ports.
///
/// Ports are probed concurrently. An entry whose port cannot be probed keeps
/// its cached flag.
#[tracing::instrument(skip_all, fields(count = entries.len()))]
pub async fn refresh(manager: &LifecycleManager, mut entries: Vec<Entry>) -> Vec<Entry> {
    let states = port_states(manager, &entries).await;
    apply_states(&mut entries, &states);
    entries
}

/// Reconcile the flags of the entries in `store` and persist them.
///
/// Ports are probed outside the store's write lock; the flags are then
/// applied to the list as it is at save time, so entries added or removed
/// meanwhile are kept as they are.
#[tracing::instrument(skip_all)]
pub async fn refresh_stored(manager: &LifecycleManager, store: &dyn EntryStore) -> Result<Vec<Entry>> {
    let entries = store.load().await?;
    let states = port_states(manager, &entries).await;
    store
        .update(Box::new(move |entries: &mut Vec<Entry>| {
            apply_states(entries, &states)
        }))
        .await
}
