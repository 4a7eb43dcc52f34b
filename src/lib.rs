/*!
 # Port Manager

 A Rust library and service for starting, stopping and force-restarting local
 development servers, identified by the TCP port they serve.

 ## Overview

 Port Manager provides functionality to:
 - Keep a list of registered dev servers (name, port, command file)
 - Launch a server's command file as a detached child with its output logged
 - Find every process bound to a port and terminate it gracefully or forcefully
 - Report whether a port is in use
 - Serve all of the above over a small JSON HTTP API with a live event stream

 ## Basic Usage

 ```no_run
 use port_manager::{PortManager, Result};
 use port_manager::process::EntryId;

 #[tokio::main]
 async fn main() -> Result<()> {
     let manager = PortManager::from_config_file("port-manager.json")?;

     let id = EntryId::from("1712345678901");
     let process = manager.start(&id, "/home/me/shop/dev.command").await?;
     println!("Started with PID {}", process.pid);

     if manager.check_status(3000).await? {
         println!("Port 3000 is in use");
     }

     // Kill whatever holds the port and relaunch
     manager.force_restart(&id, 3000, "/home/me/shop/dev.command").await?;

     let report = manager.stop(&id, 3000).await?;
     println!("Stopped {:?}", report.killed);

     Ok(())
 }
 ```

 ## Features

 - **Lifecycle**: Start, stop, force restart and status checks, serialized per entry
 - **Port ownership**: Processes bound to a port are found with `lsof`
 - **Persistence**: Entries stored as JSON, with import from other files
 - **Port detection**: Ports read from launch scripts
 - **HTTP API**: Actix Web with CORS and server-sent lifecycle events
*/

pub mod api;
pub mod config;
pub mod detect;
pub mod error;
pub mod process;
pub mod store;

pub use api::ApiServerHandle;
pub use config::Config;
pub use error::{Error, Result};
pub use process::{EntryId, LifecycleManager, ManagedProcess, TerminationReport};
pub use store::{Entry, EntryStore, JsonFileStore};

use api::{ApiServer, ApiState};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Manage registered dev servers
///
/// Owns the configuration, the entry store, the [`LifecycleManager`] and, once
/// started, the HTTP API server. All public methods are instrumented with
/// `tracing` spans.
pub struct PortManager {
    /// Configuration
    config: Config,
    /// Lifecycle operations
    lifecycle: Arc<LifecycleManager>,
    /// Entry persistence
    store: Arc<dyn EntryStore>,
    /// API server handle (if running)
    api_handle: Option<ApiServerHandle>,
}

impl PortManager {
    /// Create a manager from a configuration file path
    ///
    /// Must be called inside a Tokio runtime.
    #[tracing::instrument(skip(path), fields(config_path = ?path.as_ref()))]
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self> {
        tracing::info!("Loading configuration from file");
        let config = Config::from_file(path)?;
        Self::new(config)
    }

    /// Create a manager from a configuration string
    ///
    /// Must be called inside a Tokio runtime.
    #[tracing::instrument(skip(config))]
    pub fn from_config_str(config: &str) -> Result<Self> {
        tracing::info!("Loading configuration from string");
        let config = Config::parse_from_str(config)?;
        Self::new(config)
    }

    /// Create a manager backed by the real OS and the JSON entry file
    ///
    /// Must be called inside a Tokio runtime.
    #[tracing::instrument(skip(config), fields(data_dir = %config.data_dir.display()))]
    pub fn new(config: Config) -> Result<Self> {
        config::validate_config(&config)?;
        tracing::info!("Creating new PortManager");
        let lifecycle = Arc::new(LifecycleManager::new(&config));
        let store = Arc::new(JsonFileStore::new(config.ports_file()));
        Ok(Self::with_parts(config, lifecycle, store))
    }

    /// Create a manager from explicit parts
    pub fn with_parts(
        config: Config,
        lifecycle: Arc<LifecycleManager>,
        store: Arc<dyn EntryStore>,
    ) -> Self {
        Self {
            config,
            lifecycle,
            store,
            api_handle: None,
        }
    }

    /// The configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The lifecycle manager
    pub fn lifecycle(&self) -> &Arc<LifecycleManager> {
        &self.lifecycle
    }

    /// The entry store
    pub fn store(&self) -> &Arc<dyn EntryStore> {
        &self.store
    }

    /// Launch `command_path` for `entry_id`; see [`LifecycleManager::start`]
    pub async fn start(&self, entry_id: &EntryId, command_path: impl AsRef<Path>) -> Result<ManagedProcess> {
        self.lifecycle.start(entry_id, command_path).await
    }

    /// Stop `entry_id` and everything on `port`; see [`LifecycleManager::stop`]
    pub async fn stop(&self, entry_id: &EntryId, port: impl Into<Option<u16>>) -> Result<TerminationReport> {
        self.lifecycle.stop(entry_id, port).await
    }

    /// Kill everything on `port` and relaunch; see [`LifecycleManager::force_restart`]
    pub async fn force_restart(
        &self,
        entry_id: &EntryId,
        port: u16,
        command_path: impl AsRef<Path>,
    ) -> Result<ManagedProcess> {
        self.lifecycle
            .force_restart(entry_id, port, command_path)
            .await
    }

    /// Whether anything is bound to `port`
    pub async fn check_status(&self, port: u16) -> Result<bool> {
        self.lifecycle.check_status(port).await
    }

    /// Every stored entry
    pub async fn entries(&self) -> Result<Vec<Entry>> {
        self.store.load().await
    }

    /// Replace the stored entries
    pub async fn save_entries(&self, entries: &[Entry]) -> Result<()> {
        self.store.save(entries).await
    }

    /// Stored entry with `entry_id`
    ///
    /// # Errors
    ///
    /// [`Error::EntryNotFound`] when no such entry is stored.
    pub async fn entry(&self, entry_id: &EntryId) -> Result<Entry> {
        self.entries()
            .await?
            .into_iter()
            .find(|entry| &entry.id == entry_id)
            .ok_or_else(|| Error::EntryNotFound(format!("No entry with id {}", entry_id)))
    }

    /// Append `entry` to the stored list
    #[tracing::instrument(skip(self, entry), fields(entry_id = %entry.id, port = entry.port))]
    pub async fn add_entry(&self, entry: Entry) -> Result<()> {
        self.store
            .update(Box::new(move |entries: &mut Vec<Entry>| entries.push(entry)))
            .await
            .map(|_| ())
    }

    /// Start a stored entry with its own command file
    ///
    /// # Errors
    ///
    /// [`Error::EntryNotFound`] for an unknown id, [`Error::InvalidRequest`]
    /// when the entry has no command file.
    #[tracing::instrument(skip(self), fields(entry_id = %entry_id))]
    pub async fn start_entry(&self, entry_id: &EntryId) -> Result<ManagedProcess> {
        let entry = self.entry(entry_id).await?;
        let command_path = entry.command_path.ok_or_else(|| {
            Error::InvalidRequest(format!("Entry {} has no command file", entry_id))
        })?;
        self.start(entry_id, command_path).await
    }

    /// Probe every stored entry's port and persist the reconciled flags
    #[tracing::instrument(skip(self))]
    pub async fn refresh_entries(&self) -> Result<Vec<Entry>> {
        store::refresh_stored(&self.lifecycle, self.store.as_ref()).await
    }

    /// Log file receiving the output of `entry_id`'s process
    pub fn log_path(&self, entry_id: &EntryId) -> PathBuf {
        process::log_path(&self.config.logs_dir(), entry_id)
    }

    /// Start the HTTP API server
    ///
    /// # Errors
    ///
    /// [`Error::ConfigInvalid`] when the configuration has no `api` section.
    #[tracing::instrument(skip(self))]
    pub async fn start_api_server(&mut self) -> Result<SocketAddr> {
        if let Some(handle) = &self.api_handle {
            tracing::debug!("API server already running");
            return Ok(handle.local_addr());
        }

        let api_config = self.config.api.as_ref().ok_or_else(|| {
            tracing::warn!("Attempted to start API server but it's not configured");
            Error::ConfigInvalid("API server not configured".to_string())
        })?;

        let state = ApiState {
            manager: Arc::clone(&self.lifecycle),
            store: Arc::clone(&self.store),
        };
        let handle = ApiServer::start(state, api_config).await?;
        let addr = handle.local_addr();
        self.api_handle = Some(handle);
        Ok(addr)
    }

    /// The running API server, if any
    pub fn api_handle(&self) -> Option<&ApiServerHandle> {
        self.api_handle.as_ref()
    }

    /// Stop the API server and optionally every tracked process
    #[tracing::instrument(skip(self))]
    pub async fn shutdown(&mut self, stop_processes: bool) -> Result<TerminationReport> {
        if let Some(handle) = self.api_handle.take() {
            if let Err(e) = handle.shutdown().await {
                tracing::warn!(error = %e, "Error shutting down API server");
            }
        }

        Ok(self.lifecycle.shutdown(stop_processes).await)
    }
}
