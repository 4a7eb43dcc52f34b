use crate::config::TimingConfig;
use crate::error::{Error, Result};
use crate::process::signal::{ProcessSignaller, SignalOutcome, TermSignal};
use crate::process::types::ProcessId;
use futures::future::join_all;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

/// A process that could not be terminated
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TerminationFailure {
    /// Process id
    pub pid: ProcessId,
    /// Why the signal could not be delivered
    pub reason: String,
}

/// Outcome of a termination request
///
/// `killed` lists every pid believed gone, whichever stage ended it. A
/// non-empty `failed` list means the termination was only partial; that is
/// reported here rather than raised as an error because the other pids may
/// well have been terminated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TerminationReport {
    /// Pids believed terminated
    pub killed: Vec<ProcessId>,
    /// Pids whose signals could not be delivered
    pub failed: Vec<TerminationFailure>,
}

impl TerminationReport {
    /// True when every targeted pid was terminated
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Append another report, keeping `killed` free of duplicates
    pub fn merge(&mut self, other: TerminationReport) {
        for pid in other.killed {
            if !self.killed.contains(&pid) {
                self.killed.push(pid);
            }
        }
        self.failed.extend(other.failed);
    }

    fn record(&mut self, pid: ProcessId, result: Result<()>) {
        match result {
            Ok(()) => self.killed.push(pid),
            Err(e) => self.failed.push(TerminationFailure {
                pid,
                reason: e.to_string(),
            }),
        }
    }
}

/// Terminates sets of processes with bounded waits
///
/// Two strategies share one entry point, [`Terminator::terminate`]:
///
/// * graceful: SIGTERM, wait the grace window, and if the process is still
///   alive SIGKILL it and wait the settle window. Pids are handled
///   concurrently and independently.
/// * force: SIGKILL every pid at once, then wait the force-settle window once.
#[derive(Clone)]
pub struct Terminator {
    signaller: Arc<dyn ProcessSignaller>,
    grace: Duration,
    settle: Duration,
    force_settle: Duration,
}

impl Terminator {
    /// Create a terminator using the given signal capability and windows
    pub fn new(signaller: Arc<dyn ProcessSignaller>, timing: &TimingConfig) -> Self {
        Self {
            signaller,
            grace: timing.grace(),
            settle: timing.settle(),
            force_settle: timing.force_settle(),
        }
    }

    /// The signal capability this terminator uses
    pub fn signaller(&self) -> &Arc<dyn ProcessSignaller> {
        &self.signaller
    }

    /// Terminate every pid in `pids`.
    ///
    /// Failure on one pid never aborts the others.
    #[tracing::instrument(skip(self), fields(count = pids.len()))]
    pub async fn terminate(&self, pids: &BTreeSet<ProcessId>, graceful: bool) -> TerminationReport {
        let mut report = TerminationReport::default();
        if pids.is_empty() {
            return report;
        }

        if graceful {
            let attempts = pids.iter().map(|&pid| async move {
                let result = self.terminate_one_gracefully(pid).await;
                (pid, result)
            });
            for (pid, result) in join_all(attempts).await {
                report.record(pid, result);
            }
        } else {
            for &pid in pids {
                let result = self
                    .signaller
                    .send(pid, TermSignal::Kill)
                    .map(|outcome| tracing::debug!(pid, ?outcome, "Force kill sent"));
                report.record(pid, result);
            }
            tokio::time::sleep(self.force_settle).await;
        }

        if report.is_complete() {
            tracing::debug!(killed = ?report.killed, "Termination finished");
        } else {
            tracing::warn!(
                killed = ?report.killed,
                failed = ?report.failed,
                "Termination only partially succeeded"
            );
        }
        report
    }

    /// Graceful-then-forceful termination
    pub async fn terminate_graceful(&self, pids: &BTreeSet<ProcessId>) -> TerminationReport {
        self.terminate(pids, true).await
    }

    /// Immediate kill with a single settle wait
    pub async fn force_terminate(&self, pids: &BTreeSet<ProcessId>) -> TerminationReport {
        self.terminate(pids, false).await
    }

    async fn terminate_one_gracefully(&self, pid: ProcessId) -> Result<()> {
        match self.signaller.send(pid, TermSignal::Terminate) {
            Ok(SignalOutcome::NotFound) => return Ok(()),
            Ok(SignalOutcome::Delivered) => {
                tokio::time::sleep(self.grace).await;
                if !self.signaller.is_alive(pid) {
                    tracing::debug!(pid, "Process exited after SIGTERM");
                    return Ok(());
                }
                tracing::debug!(pid, "Process still alive after grace window, escalating");
            }
            Err(e) => {
                tracing::debug!(pid, error = %e, "SIGTERM failed, escalating to SIGKILL");
            }
        }

        match self.signaller.send(pid, TermSignal::Kill)? {
            SignalOutcome::Delivered => {
                tokio::time::sleep(self.settle).await;
                Ok(())
            }
            SignalOutcome::NotFound => Ok(()),
        }
    }
}

impl std::fmt::Debug for Terminator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Terminator")
            .field("grace", &self.grace)
            .field("settle", &self.settle)
            .field("force_settle", &self.force_settle)
            .finish()
    }
}

/// Shorthand for a one-element pid set
pub(crate) fn single(pid: ProcessId) -> BTreeSet<ProcessId> {
    BTreeSet::from([pid])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::signal::MockProcessSignaller;
    use mockall::predicate::*;
    use std::time::Instant;

    fn fast_timing() -> TimingConfig {
        TimingConfig {
            grace_ms: 20,
            settle_ms: 10,
            force_settle_ms: 50,
            operation_timeout_ms: 5_000,
        }
    }

    fn terminator(signaller: MockProcessSignaller) -> Terminator {
        Terminator::new(Arc::new(signaller), &fast_timing())
    }

    #[tokio::test]
    async fn test_graceful_exit_needs_no_kill() {
        let mut signaller = MockProcessSignaller::new();
        signaller
            .expect_send()
            .with(eq(10), eq(TermSignal::Terminate))
            .times(1)
            .returning(|_, _| Ok(SignalOutcome::Delivered));
        signaller.expect_is_alive().with(eq(10)).return_const(false);

        let report = terminator(signaller).terminate_graceful(&single(10)).await;

        assert_eq!(report.killed, vec![10]);
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn test_escalates_to_kill_when_still_alive() {
        let mut signaller = MockProcessSignaller::new();
        signaller
            .expect_send()
            .with(eq(11), eq(TermSignal::Terminate))
            .times(1)
            .returning(|_, _| Ok(SignalOutcome::Delivered));
        signaller.expect_is_alive().with(eq(11)).return_const(true);
        signaller
            .expect_send()
            .with(eq(11), eq(TermSignal::Kill))
            .times(1)
            .returning(|_, _| Ok(SignalOutcome::Delivered));

        let report = terminator(signaller).terminate_graceful(&single(11)).await;

        assert_eq!(report.killed, vec![11]);
    }

    #[tokio::test]
    async fn test_partial_failure_does_not_abort_others() {
        let mut signaller = MockProcessSignaller::new();
        signaller
            .expect_send()
            .with(eq(20), always())
            .returning(|_, _| Err(Error::Signal("EPERM".to_string())));
        signaller
            .expect_send()
            .with(eq(21), eq(TermSignal::Terminate))
            .returning(|_, _| Ok(SignalOutcome::NotFound));

        let pids = BTreeSet::from([20, 21]);
        let report = terminator(signaller).terminate_graceful(&pids).await;

        assert_eq!(report.killed, vec![21]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].pid, 20);
        assert!(!report.is_complete());
    }

    #[tokio::test]
    async fn test_force_kills_all_and_settles_once() {
        let mut signaller = MockProcessSignaller::new();
        signaller
            .expect_send()
            .with(always(), eq(TermSignal::Kill))
            .times(3)
            .returning(|_, _| Ok(SignalOutcome::Delivered));
        signaller.expect_is_alive().never();

        let pids = BTreeSet::from([1001, 1002, 1003]);
        let started = Instant::now();
        let report = terminator(signaller).force_terminate(&pids).await;
        let elapsed = started.elapsed();

        assert_eq!(report.killed, vec![1001, 1002, 1003]);
        assert!(elapsed >= Duration::from_millis(50));
        assert!(elapsed < Duration::from_millis(150));
    }

    #[tokio::test]
    async fn test_empty_set_returns_immediately() {
        let mut signaller = MockProcessSignaller::new();
        signaller.expect_send().never();

        let report = terminator(signaller).force_terminate(&BTreeSet::new()).await;

        assert!(report.killed.is_empty());
        assert!(report.is_complete());
    }

    #[test]
    fn test_merge_deduplicates() {
        let mut a = TerminationReport {
            killed: vec![1, 2],
            failed: vec![],
        };
        a.merge(TerminationReport {
            killed: vec![2, 3],
            failed: vec![TerminationFailure {
                pid: 4,
                reason: "denied".to_string(),
            }],
        });
        assert_eq!(a.killed, vec![1, 2, 3]);
        assert_eq!(a.failed.len(), 1);
    }
}
