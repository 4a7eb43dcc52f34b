//! Port detection for launch scripts.
//!
//! Dev server scripts usually mention their port either in a URL
//! (`open http://localhost:5173`) or in an assignment (`PORT=3000 npm run dev`).
//! URLs win over assignments when both appear.

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::path::Path;

static LOCALHOST_PORT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"localhost:(\d+)").expect("valid localhost regex"));

static PORT_ASSIGNMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:PORT|port)\s*=\s*(\d+)").expect("valid port assignment regex"));

/// What a command file says about the server it starts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedCommand {
    /// Port found in the script, if any
    pub detected_port: Option<u16>,
    /// Directory holding the script
    pub folder_path: Option<String>,
    /// Script file name without its `.command` or `.sh` suffix
    pub project_name: Option<String>,
    /// The script itself
    pub command_path: String,
}

fn first_port(pattern: &Regex, content: &str) -> Option<u16> {
    pattern
        .captures(content)
        .and_then(|caps| caps.get(1))
        .and_then(|port| port.as_str().parse().ok())
}

/// Find the port a script binds
pub fn detect_port(content: &str) -> Option<u16> {
    first_port(&LOCALHOST_PORT, content).or_else(|| first_port(&PORT_ASSIGNMENT, content))
}

/// Project name for a command file
pub fn project_name(path: &Path) -> Option<String> {
    let file_name = path.file_name()?.to_str()?;
    let name = file_name
        .strip_suffix(".command")
        .or_else(|| file_name.strip_suffix(".sh"))
        .unwrap_or(file_name);
    Some(name.to_string())
}

/// Read a command file and describe it.
///
/// # Errors
///
/// [`Error::EntryNotFound`] when the file does not exist.
#[tracing::instrument(skip(path), fields(path = %path.as_ref().display()))]
pub async fn inspect_command_file(path: impl AsRef<Path>) -> Result<DetectedCommand> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::EntryNotFound(format!("File not found: {}", path.display()))
        } else {
            Error::Persistence(format!("Failed to read {}: {}", path.display(), e))
        }
    })?;

    let detected = DetectedCommand {
        detected_port: detect_port(&content),
        folder_path: path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(|dir| dir.display().to_string()),
        project_name: project_name(path),
        command_path: path.display().to_string(),
    };
    tracing::info!(
        port = ?detected.detected_port,
        project = ?detected.project_name,
        "Inspected command file"
    );
    Ok(detected)
}
