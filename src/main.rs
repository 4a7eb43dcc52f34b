//! Port Manager service
//!
//! Serves the HTTP API until interrupted. The configuration path is taken
//! from the first argument, then `PORT_MANAGER_CONFIG`; without either the
//! defaults are used.

use anyhow::Context;
use port_manager::{Config, PortManager};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

const CONFIG_ENV: &str = "PORT_MANAGER_CONFIG";

fn load_config() -> anyhow::Result<Config> {
    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var(CONFIG_ENV).ok());

    match path {
        Some(path) => {
            info!(config_path = %path, "Loading configuration");
            Config::from_file(&path).with_context(|| format!("loading configuration from {}", path))
        }
        None => {
            info!("No configuration given, using defaults");
            Ok(Config::default())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();

    let mut config = load_config()?;
    if config.api.is_none() {
        warn!("Configuration has no api section, serving on the default address");
        config.api = Some(Default::default());
    }

    let mut manager = PortManager::new(config).context("creating port manager")?;
    let addr = manager
        .start_api_server()
        .await
        .context("starting API server")?;
    info!(address = %addr, data_dir = %manager.config().data_dir.display(), "Port manager ready");

    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl-C")?;
    info!("Interrupted, shutting down");

    // Dev servers are detached and keep running after the service exits.
    manager.shutdown(false).await?;
    Ok(())
}
