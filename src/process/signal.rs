//! Signal delivery and liveness checks.
//!
//! The lifecycle code never calls the OS directly; it goes through
//! [`ProcessSignaller`] so tests can substitute a scripted implementation.

use crate::error::{Error, Result};
use crate::process::types::ProcessId;
use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;

/// Termination signals the manager sends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermSignal {
    /// Ask the process to exit (SIGTERM)
    Terminate,
    /// Kill the process immediately (SIGKILL)
    Kill,
}

/// What happened when a signal was sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalOutcome {
    /// The signal was delivered
    Delivered,
    /// The process no longer exists
    NotFound,
}

/// Capability to signal OS processes and check whether they exist
#[cfg_attr(test, mockall::automock)]
pub trait ProcessSignaller: Send + Sync {
    /// Send `signal` to `pid`.
    fn send(&self, pid: ProcessId, signal: TermSignal) -> Result<SignalOutcome>;

    /// Whether `pid` still exists (signal 0 semantics).
    fn is_alive(&self, pid: ProcessId) -> bool;
}

/// [`ProcessSignaller`] using `kill(2)`
#[derive(Debug, Clone, Copy, Default)]
pub struct UnixSignaller;

impl UnixSignaller {
    fn target(pid: ProcessId) -> Result<Pid> {
        // 0 and negative values address process groups, never a single process.
        let raw = i32::try_from(pid)
            .ok()
            .filter(|raw| *raw > 0)
            .ok_or_else(|| Error::Signal(format!("Refusing to signal invalid PID {}", pid)))?;

        if pid == std::process::id() {
            return Err(Error::Signal(format!(
                "Refusing to signal the manager's own PID {}",
                pid
            )));
        }

        Ok(Pid::from_raw(raw))
    }
}

impl ProcessSignaller for UnixSignaller {
    fn send(&self, pid: ProcessId, signal: TermSignal) -> Result<SignalOutcome> {
        let target = Self::target(pid)?;
        let sig = match signal {
            TermSignal::Terminate => Signal::SIGTERM,
            TermSignal::Kill => Signal::SIGKILL,
        };

        match kill(target, sig) {
            Ok(()) => {
                tracing::debug!(pid, signal = %sig, "Signal delivered");
                Ok(SignalOutcome::Delivered)
            }
            Err(Errno::ESRCH) => {
                tracing::debug!(pid, signal = %sig, "Process already exited");
                Ok(SignalOutcome::NotFound)
            }
            Err(e) => {
                tracing::warn!(pid, signal = %sig, error = %e, "Failed to deliver signal");
                Err(Error::Signal(format!(
                    "Failed to send {} to PID {}: {}",
                    sig, pid, e
                )))
            }
        }
    }

    fn is_alive(&self, pid: ProcessId) -> bool {
        let Ok(target) = Self::target(pid) else {
            return false;
        };

        match kill(target, None) {
            Ok(()) => true,
            // Exists but owned by someone else.
            Err(Errno::EPERM) => true,
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refuses_pid_zero() {
        let err = UnixSignaller.send(0, TermSignal::Kill).unwrap_err();
        assert!(matches!(err, Error::Signal(_)));
        assert!(!UnixSignaller.is_alive(0));
    }

    #[test]
    fn test_refuses_own_pid() {
        let err = UnixSignaller
            .send(std::process::id(), TermSignal::Terminate)
            .unwrap_err();
        assert!(matches!(err, Error::Signal(_)));
    }

    #[test]
    fn test_out_of_range_pid_is_not_alive() {
        assert!(!UnixSignaller.is_alive(u32::MAX));
    }

    #[test]
    fn test_signal_and_reap_child() {
        let mut child = std::process::Command::new("sleep")
            .arg("30")
            .spawn()
            .unwrap();
        let pid = child.id();

        assert!(UnixSignaller.is_alive(pid));
        assert_eq!(
            UnixSignaller.send(pid, TermSignal::Kill).unwrap(),
            SignalOutcome::Delivered
        );
        child.wait().unwrap();
        assert!(!UnixSignaller.is_alive(pid));
        assert_eq!(
            UnixSignaller.send(pid, TermSignal::Terminate).unwrap(),
            SignalOutcome::NotFound
        );
    }
}
