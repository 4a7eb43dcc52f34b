//! HTTP API for the dashboard front end.
//!
//! JSON over HTTP with permissive CORS, served by Actix Web. Errors are
//! rendered as `{ "error": ..., "code": ... }`: missing fields give 400,
//! unknown files 404, timeouts 504 and other failures 500.
//!
//! # Examples
//!
//! ```no_run
//! use port_manager::api::{ApiServer, ApiState};
//! use port_manager::config::{ApiConfig, Config};
//! use port_manager::process::LifecycleManager;
//! use port_manager::store::JsonFileStore;
//! use std::sync::Arc;
//!
//! # async fn run() -> port_manager::Result<()> {
//! let config = Config::default();
//! let state = ApiState {
//!     manager: Arc::new(LifecycleManager::new(&config)),
//!     store: Arc::new(JsonFileStore::new(config.ports_file())),
//! };
//!
//! let handle = ApiServer::start(state, &ApiConfig::default()).await?;
//! println!("Listening on {}", handle.local_addr());
//! handle.shutdown().await?;
//! # Ok(())
//! # }
//! ```
pub mod actix_error;
pub mod handlers;
pub mod server;
pub mod types;

pub use server::{ApiServer, ApiServerHandle};

use crate::process::LifecycleManager;
use crate::store::EntryStore;
use actix_web::web;
use std::sync::Arc;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct ApiState {
    /// Lifecycle operations
    pub manager: Arc<LifecycleManager>,
    /// Entry persistence
    pub store: Arc<dyn EntryStore>,
}

/// Register every API route
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/ports", web::get().to(handlers::list_ports))
        .route("/api/ports", web::post().to(handlers::save_ports))
        .route("/api/execute-command", web::post().to(handlers::execute_command))
        .route("/api/stop-command", web::post().to(handlers::stop_command))
        .route(
            "/api/force-restart-command",
            web::post().to(handlers::force_restart_command),
        )
        .route(
            "/api/check-port-status",
            web::post().to(handlers::check_port_status),
        )
        .route("/api/detect-port", web::post().to(handlers::detect_port))
        .route("/api/import-ports", web::post().to(handlers::import_ports))
        .route("/api/events", web::get().to(handlers::events))
        .route("/api/events/recent", web::get().to(handlers::recent_events))
        .route("/api/health", web::get().to(handlers::health));
}
