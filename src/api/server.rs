//! Actix Web server hosting the HTTP API.

use crate::api::{ApiState, configure};
use crate::config::ApiConfig;
use crate::error::{Error, Result};

use actix_cors::Cors;
use actix_web::{App, HttpServer, dev::ServerHandle, middleware, web::Data};

use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// How long [`ApiServerHandle::shutdown`] waits for the server task
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle for controlling a running API server
#[derive(Clone)]
pub struct ApiServerHandle {
    server: ServerHandle,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
    local_addr: SocketAddr,
}

impl ApiServerHandle {
    /// Address the server is listening on
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections and wait for the server to finish
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!(address = %self.local_addr, "Stopping API server");
        self.server.stop(true).await;

        let mut task = self.task.lock().await;
        if let Some(task) = task.take() {
            match tokio::time::timeout(SHUTDOWN_TIMEOUT, task).await {
                Ok(Err(e)) => tracing::warn!("Error while joining API server task: {}", e),
                Ok(Ok(())) => {}
                Err(_) => tracing::warn!("Timeout waiting for API server task to finish"),
            }
        }

        Ok(())
    }
}

/// HTTP API server
pub struct ApiServer;

impl ApiServer {
    /// Bind and start serving in a background task.
    ///
    /// # Errors
    ///
    /// [`Error::Other`] when the address cannot be resolved or bound.
    #[tracing::instrument(skip(state, config), fields(address = %config.address, port = config.port))]
    pub async fn start(state: ApiState, config: &ApiConfig) -> Result<ApiServerHandle> {
        let addr_str = format!("{}:{}", config.address, config.port);
        let addr = addr_str
            .to_socket_addrs()
            .map_err(|e| Error::Other(format!("Failed to parse socket address: {}", e)))?
            .next()
            .ok_or_else(|| Error::Other(format!("Could not parse socket address: {}", addr_str)))?;

        let state = Data::new(state);
        let server_builder = HttpServer::new(move || {
            let cors = Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
                .max_age(3600);

            App::new()
                .wrap(middleware::Logger::default())
                .wrap(cors)
                .app_data(state.clone())
                .configure(configure)
        })
        .workers(config.workers)
        .disable_signals();

        let server_builder = server_builder
            .bind(addr)
            .map_err(|e| Error::Other(format!("Failed to bind API server to {}: {}", addr, e)))?;
        let local_addr = server_builder.addrs().first().copied().unwrap_or(addr);

        let server = server_builder.run();
        let server_handle = server.handle();

        let task = tokio::spawn(async move {
            if let Err(e) = server.await {
                tracing::error!(error = %e, "API server error");
            }
            tracing::info!("API server shut down");
        });

        tracing::info!(address = %local_addr, workers = config.workers, "API server started");

        Ok(ApiServerHandle {
            server: server_handle,
            task: Arc::new(Mutex::new(Some(task))),
            local_addr,
        })
    }
}
