use port_manager::config::{Config, TimingConfig};
use port_manager::detect::inspect_command_file;
use port_manager::{Entry, PortManager, Result};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

const PORT: u16 = 8765;

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .init();

    info!("Starting lifecycle example");

    let workdir = std::env::temp_dir().join("port-manager-demo");
    std::fs::create_dir_all(&workdir)
        .map_err(|e| port_manager::Error::Other(format!("Failed to create {}: {}", workdir.display(), e)))?;

    // A tiny dev server: python's static file server on a fixed port.
    let script = workdir.join("demo.command");
    std::fs::write(
        &script,
        format!("#!/bin/bash\nexec python3 -m http.server {}  # localhost:{}\n", PORT, PORT),
    )
    .map_err(|e| port_manager::Error::Other(format!("Failed to write script: {}", e)))?;

    let config = Config {
        data_dir: workdir.join("data"),
        api: None,
        timing: TimingConfig::default(),
        ..Config::default()
    };
    let mut manager = PortManager::new(config)?;

    let detected = inspect_command_file(&script).await?;
    info!(port = ?detected.detected_port, project = ?detected.project_name, "Detected");

    let entry = Entry::new(
        detected.project_name.unwrap_or_else(|| "demo".to_string()),
        detected.detected_port.unwrap_or(PORT),
    )
    .with_command(&script);
    let id = entry.id.clone();
    manager.add_entry(entry).await?;

    let process = manager.start_entry(&id).await?;
    info!(pid = process.pid, "Started");

    tokio::time::sleep(std::time::Duration::from_secs(1)).await;
    info!(running = manager.check_status(PORT).await?, "Status after start");

    let process = manager.force_restart(&id, PORT, &script).await?;
    info!(pid = process.pid, "Force restarted");

    tokio::time::sleep(std::time::Duration::from_secs(1)).await;
    let report = manager.stop(&id, PORT).await?;
    info!(killed = ?report.killed, "Stopped");

    for event in manager.lifecycle().events().recent(Some(&id), None).iter().rev() {
        info!(event = %event.event, pid = ?event.pid, details = ?event.details, "History");
    }

    info!(log = %manager.log_path(&id).display(), "Server output was written here");
    manager.shutdown(true).await?;
    Ok(())
}
