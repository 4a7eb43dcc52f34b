// src/process/launcher.rs
use crate::config::LaunchConfig;
use crate::error::{Error, Result};
use crate::process::types::{EntryId, ExitNotice, ManagedProcess};
use async_process::{Command, Stdio};
use async_trait::async_trait;
use std::fs::OpenOptions;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

/// What to launch for an entry
#[derive(Debug, Clone)]
pub struct LaunchRequest {
    /// Entry the process belongs to
    pub entry_id: EntryId,
    /// Command file to run
    pub command_path: PathBuf,
}

impl LaunchRequest {
    /// Create a launch request
    pub fn new(entry_id: EntryId, command_path: impl Into<PathBuf>) -> Self {
        Self {
            entry_id,
            command_path: command_path.into(),
        }
    }
}

/// Capability to spawn detached children
///
/// Implementations report every child that exits on its own through an
/// [`ExitNotice`] channel rather than a callback tied to the spawn call.
#[async_trait]
pub trait Launcher: Send + Sync {
    /// Spawn the command and return its process record.
    ///
    /// Must not await once the child is spawned. The caller may be cancelled
    /// at any await, and a child spawned before such a point would run
    /// without ever being registered.
    async fn launch(&self, request: LaunchRequest) -> Result<ManagedProcess>;
}

/// Path of the log file receiving an entry's output
pub fn log_path(logs_dir: &Path, entry_id: &EntryId) -> PathBuf {
    logs_dir.join(format!("{}.log", entry_id))
}

/// [`Launcher`] that runs command files through a shell
///
/// Children are placed in their own process group so signals aimed at the
/// manager's terminal do not reach them. Standard output and error are
/// appended to the entry's log file, or discarded when output logging is
/// off; they are never captured in memory.
pub struct ShellLauncher {
    config: LaunchConfig,
    logs_dir: PathBuf,
    exits: mpsc::Sender<ExitNotice>,
}

impl ShellLauncher {
    /// Create a launcher that reports exits on `exits`
    pub fn new(config: LaunchConfig, logs_dir: impl Into<PathBuf>, exits: mpsc::Sender<ExitNotice>) -> Self {
        Self {
            config,
            logs_dir: logs_dir.into(),
            exits,
        }
    }

    fn search_path(&self) -> String {
        let existing = std::env::var("PATH").unwrap_or_default();
        let mut parts: Vec<&str> = self.config.extra_path.iter().map(String::as_str).collect();
        if !existing.is_empty() {
            parts.push(&existing);
        }
        parts.join(":")
    }

    fn output_streams(&self, entry_id: &EntryId) -> Result<(Stdio, Stdio)> {
        if !self.config.log_output {
            return Ok((Stdio::null(), Stdio::null()));
        }

        std::fs::create_dir_all(&self.logs_dir)
            .map_err(|e| Error::Launch(format!("Failed to create logs directory: {}", e)))?;

        let path = log_path(&self.logs_dir, entry_id);
        let out = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| Error::Launch(format!("Failed to open log file {}: {}", path.display(), e)))?;
        let err = out
            .try_clone()
            .map_err(|e| Error::Launch(format!("Failed to open log file {}: {}", path.display(), e)))?;

        tracing::debug!(log_file = %path.display(), "Appending process output to log file");
        Ok((Stdio::from(out), Stdio::from(err)))
    }
}

/// Add execute permission, warning instead of failing.
fn ensure_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    let result = std::fs::metadata(path).and_then(|metadata| {
        let mut permissions = metadata.permissions();
        let mode = permissions.mode();
        if mode & 0o111 == 0o111 {
            return Ok(());
        }
        permissions.set_mode(mode | 0o111);
        std::fs::set_permissions(path, permissions)
    });

    if let Err(e) = result {
        tracing::warn!(path = %path.display(), error = %e, "Could not set execute permission");
    }
}

#[async_trait]
impl Launcher for ShellLauncher {
    #[tracing::instrument(skip(self, request), fields(entry_id = %request.entry_id, command = %request.command_path.display()))]
    async fn launch(&self, request: LaunchRequest) -> Result<ManagedProcess> {
        let path = &request.command_path;
        if !path.is_file() {
            tracing::error!("Command file not found");
            return Err(Error::Launch(format!(
                "Command file not found: {}",
                path.display()
            )));
        }

        ensure_executable(path);
        let (stdout, stderr) = self.output_streams(&request.entry_id)?;

        let mut std_command = std::process::Command::new(&self.config.shell);
        std_command
            .arg(path)
            .env("PATH", self.search_path())
            .process_group(0);
        if let Some(home) = std::env::var_os("HOME") {
            std_command.env("HOME", home);
        }
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std_command.current_dir(dir);
        }

        let mut command = Command::from(std_command);
        command.stdin(Stdio::null()).stdout(stdout).stderr(stderr);

        let mut child = command.spawn().map_err(|e| {
            tracing::error!(error = %e, "Failed to spawn process");
            Error::Launch(format!(
                "Failed to spawn '{} {}': {}",
                self.config.shell,
                path.display(),
                e
            ))
        })?;

        let process = ManagedProcess::new(request.entry_id.clone(), child.id());
        tracing::info!(pid = process.pid, "Started process");

        let exits = self.exits.clone();
        let notice_template = (process.entry_id.clone(), process.launch_id, process.pid);
        tokio::spawn(async move {
            let (entry_id, launch_id, pid) = notice_template;
            let code = match child.status().await {
                Ok(status) => status.code(),
                Err(e) => {
                    tracing::warn!(pid, error = %e, "Failed to wait for child");
                    None
                }
            };
            tracing::debug!(entry_id = %entry_id, pid, ?code, "Child exited");
            let notice = ExitNotice {
                entry_id,
                launch_id,
                pid,
                code,
            };
            if exits.send(notice).await.is_err() {
                tracing::debug!(pid, "No exit subscriber, dropping notice");
            }
        });

        Ok(process)
    }
}
