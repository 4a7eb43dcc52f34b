use crate::error::{Error, Result};
use crate::process::types::ProcessId;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::process::Stdio;
use tokio::process::Command;

/// Finds the OS processes bound to a TCP port.
///
/// "Nothing bound" is a normal, empty result. An error means the state of the
/// port is unknown and must not be read as "not running".
#[async_trait]
pub trait PortProbe: Send + Sync {
    /// Return the set of process ids holding a socket on `port`.
    async fn find_owners(&self, port: u16) -> Result<BTreeSet<ProcessId>>;
}

/// [`PortProbe`] backed by `lsof -t -i :PORT`.
///
/// `-t` makes lsof print bare process ids, one per line, which covers both
/// listeners and established connections on the port.
#[derive(Debug, Clone)]
pub struct LsofProbe {
    program: String,
}

impl Default for LsofProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl LsofProbe {
    /// Probe using `lsof` from `PATH`
    pub fn new() -> Self {
        Self::with_program("lsof")
    }

    /// Probe using a specific lsof binary
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl PortProbe for LsofProbe {
    #[tracing::instrument(skip(self), fields(program = %self.program))]
    async fn find_owners(&self, port: u16) -> Result<BTreeSet<ProcessId>> {
        let output = Command::new(&self.program)
            .arg("-t")
            .arg("-i")
            .arg(format!(":{}", port))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to run socket owner lookup");
                Error::Probe(format!("Failed to run {}: {}", self.program, e))
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);

        if !output.status.success() {
            // lsof exits 1 when no socket matches; its stderr may still carry
            // unrelated warnings about unreadable mounts.
            if output.status.code() == Some(1) && stdout.trim().is_empty() {
                tracing::debug!(port, "No process bound to port");
                return Ok(BTreeSet::new());
            }
            if stdout.trim().is_empty() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                tracing::error!(status = ?output.status, stderr = %stderr.trim(), "Socket owner lookup failed");
                return Err(Error::Probe(format!(
                    "{} exited with {}: {}",
                    self.program,
                    output.status,
                    stderr.trim()
                )));
            }
        }

        let pids = parse_pid_list(&stdout)?;
        tracing::debug!(port, pids = ?pids, "Found processes bound to port");
        Ok(pids)
    }
}

/// Parse newline separated process ids.
///
/// Blank lines are skipped and duplicates collapse.
pub fn parse_pid_list(output: &str) -> Result<BTreeSet<ProcessId>> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            line.parse::<ProcessId>()
                .map_err(|e| Error::Probe(format!("Unexpected probe output '{}': {}", line, e)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pid_list() {
        let pids = parse_pid_list("123\n456\n\n123\n").unwrap();
        assert_eq!(pids.into_iter().collect::<Vec<_>>(), vec![123, 456]);
    }

    #[test]
    fn test_parse_empty_output() {
        assert!(parse_pid_list("").unwrap().is_empty());
        assert!(parse_pid_list("\n  \n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = parse_pid_list("123\nlsof: WARNING\n").unwrap_err();
        assert!(matches!(err, Error::Probe(_)));
    }

    #[tokio::test]
    async fn test_missing_tool_is_probe_error() {
        let probe = LsofProbe::with_program("/nonexistent/definitely-not-lsof");
        let err = probe.find_owners(4000).await.unwrap_err();
        assert!(matches!(err, Error::Probe(_)));
    }
}
