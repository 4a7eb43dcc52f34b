use crate::config::{Config, TimingConfig};
use crate::error::{Error, Result};
use crate::process::events::{EventLog, LifecycleEvent};
use crate::process::launcher::{LaunchRequest, Launcher, ShellLauncher};
use crate::process::probe::{LsofProbe, PortProbe};
use crate::process::registry::{EntryGuard, ProcessRegistry};
use crate::process::signal::{ProcessSignaller, UnixSignaller};
use crate::process::terminator::{TerminationReport, Terminator, single};
use crate::process::types::{EntryId, EntryStatus, ExitNotice, ManagedProcess};
use futures::future::join_all;
use std::collections::BTreeSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Capacity of the exit notification channel
const EXIT_CHANNEL_CAPACITY: usize = 64;

/// OS capabilities a [`LifecycleManager`] is built from
pub struct Components {
    /// Socket owner lookup
    pub probe: Arc<dyn PortProbe>,
    /// Signal delivery and liveness checks
    pub signaller: Arc<dyn ProcessSignaller>,
    /// Child spawning
    pub launcher: Arc<dyn Launcher>,
    /// Exit notices produced by `launcher`, if it reports any
    pub exits: Option<mpsc::Receiver<ExitNotice>>,
}

impl Components {
    /// The real OS implementations: lsof, kill(2) and a shell launcher
    pub fn system(config: &Config) -> Self {
        let (tx, rx) = mpsc::channel(EXIT_CHANNEL_CAPACITY);
        Self {
            probe: Arc::new(LsofProbe::new()),
            signaller: Arc::new(UnixSignaller),
            launcher: Arc::new(ShellLauncher::new(config.launch.clone(), config.logs_dir(), tx)),
            exits: Some(rx),
        }
    }
}

/// Orchestrates start, stop, force restart and status queries
///
/// Every operation on an entry holds that entry's registry lock for its whole
/// duration, so operations on one entry are serialized while operations on
/// different entries run fully in parallel. Every operation also runs under
/// the configured deadline and fails with [`Error::Timeout`] when it is
/// exceeded.
///
/// Must be created inside a Tokio runtime: the exit notification subscriber
/// is spawned on construction.
pub struct LifecycleManager {
    registry: Arc<ProcessRegistry>,
    probe: Arc<dyn PortProbe>,
    terminator: Terminator,
    launcher: Arc<dyn Launcher>,
    events: Arc<EventLog>,
    deadline: Duration,
    exit_task: Option<JoinHandle<()>>,
}

impl LifecycleManager {
    /// Create a manager backed by the real OS
    pub fn new(config: &Config) -> Self {
        Self::with_components(Components::system(config), &config.timing)
    }

    /// Create a manager from explicit components
    pub fn with_components(components: Components, timing: &TimingConfig) -> Self {
        let registry = Arc::new(ProcessRegistry::new());
        let events = Arc::new(EventLog::default());

        let exit_task = components.exits.map(|exits| {
            let events = Arc::clone(&events);
            registry.subscribe(exits, move |notice, _process| {
                let details = notice.code.map(|code| format!("exit code {}", code));
                events.record(&notice.entry_id, LifecycleEvent::Exited, Some(notice.pid), details);
            })
        });

        Self {
            registry,
            probe: components.probe,
            terminator: Terminator::new(components.signaller, timing),
            launcher: components.launcher,
            events,
            deadline: timing.operation_timeout(),
            exit_task,
        }
    }

    /// The process registry
    pub fn registry(&self) -> &Arc<ProcessRegistry> {
        &self.registry
    }

    /// The lifecycle event log
    pub fn events(&self) -> &Arc<EventLog> {
        &self.events
    }

    fn signaller(&self) -> &dyn ProcessSignaller {
        self.terminator.signaller().as_ref()
    }

    async fn with_deadline<T>(&self, operation: &str, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.deadline, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(operation, deadline = ?self.deadline, "Operation timed out");
                Err(Error::Timeout(format!(
                    "{} did not finish within {:?}",
                    operation, self.deadline
                )))
            }
        }
    }

    /// Lock an entry after dropping stale records across the registry
    async fn acquire(&self, entry_id: &EntryId) -> EntryGuard {
        for process in self.registry.reap(self.signaller()).await {
            self.events.record(
                &process.entry_id,
                LifecycleEvent::Exited,
                Some(process.pid),
                Some("found exited".to_string()),
            );
        }

        let mut guard = self.registry.lock_entry(entry_id).await;
        if let Some(process) = guard.reap(self.signaller()) {
            self.events.record(
                entry_id,
                LifecycleEvent::Exited,
                Some(process.pid),
                Some("found exited".to_string()),
            );
        }
        guard
    }

    async fn launch_into(
        &self,
        guard: &mut EntryGuard,
        command_path: PathBuf,
        event: LifecycleEvent,
    ) -> Result<ManagedProcess> {
        let request = LaunchRequest::new(guard.entry_id().clone(), command_path);
        match self.launcher.launch(request).await {
            // No await between a successful launch and the install.
            Ok(process) => {
                guard.install(process.clone());
                self.events
                    .record(guard.entry_id(), event, Some(process.pid), None);
                Ok(process)
            }
            Err(e) => {
                self.events
                    .record(guard.entry_id(), LifecycleEvent::Failed, None, Some(e.to_string()));
                Err(e)
            }
        }
    }

    /// Launch `command_path` for `entry_id`.
    ///
    /// A live process previously launched for the entry is terminated
    /// (gracefully) before the new one is spawned, so the entry never has two
    /// registered processes.
    ///
    /// # Errors
    ///
    /// [`Error::Launch`] when spawning fails; it is not retried.
    #[tracing::instrument(skip(self, command_path), fields(entry_id = %entry_id, command = %command_path.as_ref().display()))]
    pub async fn start(&self, entry_id: &EntryId, command_path: impl AsRef<Path>) -> Result<ManagedProcess> {
        let command_path = command_path.as_ref().to_path_buf();
        self.with_deadline("start", async {
            let mut guard = self.acquire(entry_id).await;

            if let Some(previous) = guard.take() {
                tracing::info!(pid = previous.pid, "Terminating previous process before launch");
                let report = self.terminator.terminate_graceful(&single(previous.pid)).await;
                if !report.is_complete() {
                    tracing::warn!(pid = previous.pid, "Previous process may still be running");
                }
                self.events.record(
                    entry_id,
                    LifecycleEvent::Stopped,
                    Some(previous.pid),
                    Some("replaced by new launch".to_string()),
                );
            }

            self.launch_into(&mut guard, command_path, LifecycleEvent::Started)
                .await
        })
        .await
    }

    /// Stop `entry_id` and everything bound to `port`.
    ///
    /// The entry's own process is terminated first, then every process the
    /// probe finds on `port`, launched by this manager or not. Both use the
    /// graceful path. An entry with nothing running yields an empty report.
    ///
    /// # Errors
    ///
    /// [`Error::Probe`] when the port could not be probed and nothing else was
    /// stopped. When the entry's own process was stopped, a probe failure is
    /// logged and the partial report returned.
    #[tracing::instrument(skip(self, port), fields(entry_id = %entry_id))]
    pub async fn stop(&self, entry_id: &EntryId, port: impl Into<Option<u16>>) -> Result<TerminationReport> {
        let port = port.into();
        self.with_deadline("stop", async {
            let mut guard = self.acquire(entry_id).await;
            let mut report = TerminationReport::default();

            let tracked = guard.take();
            if let Some(process) = &tracked {
                tracing::info!(pid = process.pid, "Terminating tracked process");
                report.merge(self.terminator.terminate_graceful(&single(process.pid)).await);
            }

            if let Some(port) = port {
                match self.probe.find_owners(port).await {
                    Ok(owners) => {
                        let remaining: BTreeSet<_> = owners
                            .into_iter()
                            .filter(|pid| !report.killed.contains(pid))
                            .collect();
                        if !remaining.is_empty() {
                            tracing::warn!(port, pids = ?remaining, "Terminating untracked processes bound to port");
                            report.merge(self.terminator.terminate_graceful(&remaining).await);
                        }
                    }
                    Err(e) if tracked.is_some() => {
                        tracing::warn!(port, error = %e, "Port probe failed after stopping tracked process");
                    }
                    Err(e) => return Err(e),
                }
            }

            if report.killed.is_empty() {
                tracing::info!("Nothing running (already stopped)");
            } else {
                tracing::info!(killed = ?report.killed, "Stopped processes");
                self.events.record(
                    entry_id,
                    LifecycleEvent::Stopped,
                    tracked.as_ref().map(|p| p.pid),
                    Some(format!("killed {:?}", report.killed)),
                );
            }

            Ok(report)
        })
        .await
    }

    /// Kill everything on `port` immediately, then launch `command_path`.
    ///
    /// Used when graceful termination leaves the port bound, e.g. by a
    /// watcher that ignores SIGTERM. The port is probed before anything is
    /// touched; every owner plus the entry's own process is force killed and
    /// one settle window elapses before the launch.
    ///
    /// # Errors
    ///
    /// [`Error::Probe`] when the port cannot be probed (nothing is killed or
    /// launched then), [`Error::Launch`] when spawning fails.
    #[tracing::instrument(skip(self, command_path), fields(entry_id = %entry_id, command = %command_path.as_ref().display()))]
    pub async fn force_restart(
        &self,
        entry_id: &EntryId,
        port: u16,
        command_path: impl AsRef<Path>,
    ) -> Result<ManagedProcess> {
        let command_path = command_path.as_ref().to_path_buf();
        self.with_deadline("force restart", async {
            let mut guard = self.acquire(entry_id).await;

            let mut targets = self.probe.find_owners(port).await?;
            if let Some(process) = guard.take() {
                targets.insert(process.pid);
            }

            if !targets.is_empty() {
                tracing::info!(pids = ?targets, "Force killing processes before restart");
                let report = self.terminator.force_terminate(&targets).await;
                if !report.is_complete() {
                    tracing::warn!(failed = ?report.failed, "Some processes could not be killed, port may still be bound");
                }
                self.events.record(
                    entry_id,
                    LifecycleEvent::Stopped,
                    None,
                    Some(format!("force killed {:?}", report.killed)),
                );
            }

            self.launch_into(&mut guard, command_path, LifecycleEvent::Restarted)
                .await
        })
        .await
    }

    /// Whether anything is bound to `port`.
    ///
    /// Does not consult the registry: a port may be held by a process this
    /// manager never launched.
    ///
    /// # Errors
    ///
    /// [`Error::Probe`] when the state of the port is unknown.
    #[tracing::instrument(skip(self))]
    pub async fn check_status(&self, port: u16) -> Result<bool> {
        let running = self
            .with_deadline("status check", async {
                Ok(!self.probe.find_owners(port).await?.is_empty())
            })
            .await?;
        tracing::debug!(running, "Port status");
        Ok(running)
    }

    /// Durable status of `port`
    pub async fn status(&self, port: u16) -> Result<EntryStatus> {
        self.check_status(port).await.map(EntryStatus::from)
    }

    /// Prepare for the host service exiting.
    ///
    /// With `stop_processes` every registered process is terminated
    /// gracefully; ports are not probed. Otherwise children keep running
    /// detached and nothing is touched.
    #[tracing::instrument(skip(self))]
    pub async fn shutdown(&self, stop_processes: bool) -> TerminationReport {
        if !stop_processes {
            tracing::info!("Leaving tracked processes running");
            return TerminationReport::default();
        }

        let processes = self.registry.snapshot().await;
        let stops = processes.iter().map(|process| async move {
            let mut guard = self.registry.lock_entry(&process.entry_id).await;
            let mut report = TerminationReport::default();
            if let Some(process) = guard.take() {
                report = self.terminator.terminate_graceful(&single(process.pid)).await;
                self.events.record(
                    &process.entry_id,
                    LifecycleEvent::Stopped,
                    Some(process.pid),
                    Some("manager shutdown".to_string()),
                );
            }
            report
        });

        let mut report = TerminationReport::default();
        for part in join_all(stops).await {
            report.merge(part);
        }
        tracing::info!(killed = ?report.killed, "Stopped all tracked processes");
        report
    }
}

impl Drop for LifecycleManager {
    fn drop(&mut self) {
        if let Some(task) = self.exit_task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::signal::{SignalOutcome, TermSignal};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    /// Scripted OS: processes, port bindings and pids ignoring SIGTERM.
    #[derive(Default)]
    struct FakeOs {
        alive: Mutex<BTreeSet<u32>>,
        stubborn: Mutex<BTreeSet<u32>>,
        ports: Mutex<HashMap<u16, BTreeSet<u32>>>,
        next_pid: AtomicU32,
        probe_fails: Mutex<bool>,
        probe_delay: Mutex<Option<Duration>>,
    }

    impl FakeOs {
        fn new() -> Arc<Self> {
            let os = Self::default();
            os.next_pid.store(1000, Ordering::SeqCst);
            Arc::new(os)
        }

        fn spawn_foreign(&self, port: u16, stubborn: bool) -> u32 {
            let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);
            self.alive.lock().unwrap().insert(pid);
            self.ports.lock().unwrap().entry(port).or_default().insert(pid);
            if stubborn {
                self.stubborn.lock().unwrap().insert(pid);
            }
            pid
        }

        fn kill(&self, pid: u32) {
            self.alive.lock().unwrap().remove(&pid);
            for owners in self.ports.lock().unwrap().values_mut() {
                owners.remove(&pid);
            }
        }

        fn is_running(&self, pid: u32) -> bool {
            self.alive.lock().unwrap().contains(&pid)
        }
    }

    #[async_trait]
    impl PortProbe for FakeOs {
        async fn find_owners(&self, port: u16) -> Result<BTreeSet<u32>> {
            let delay = *self.probe_delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            if *self.probe_fails.lock().unwrap() {
                return Err(Error::Probe("lsof missing".to_string()));
            }
            Ok(self.ports.lock().unwrap().get(&port).cloned().unwrap_or_default())
        }
    }

    impl ProcessSignaller for FakeOs {
        fn send(&self, pid: u32, signal: TermSignal) -> Result<SignalOutcome> {
            if !self.is_running(pid) {
                return Ok(SignalOutcome::NotFound);
            }
            let ignores = self.stubborn.lock().unwrap().contains(&pid);
            if signal == TermSignal::Kill || !ignores {
                self.kill(pid);
            }
            Ok(SignalOutcome::Delivered)
        }

        fn is_alive(&self, pid: u32) -> bool {
            self.is_running(pid)
        }
    }

    /// Launches "serve-<port>" commands that bind that port.
    #[async_trait]
    impl Launcher for FakeOs {
        async fn launch(&self, request: LaunchRequest) -> Result<ManagedProcess> {
            let name = request.command_path.display().to_string();
            let port: u16 = name
                .strip_prefix("serve-")
                .and_then(|port| port.parse().ok())
                .ok_or_else(|| Error::Launch(format!("Command file not found: {}", name)))?;
            let pid = self.spawn_foreign(port, false);
            Ok(ManagedProcess::new(request.entry_id, pid))
        }
    }

    fn timing() -> TimingConfig {
        TimingConfig {
            grace_ms: 10,
            settle_ms: 5,
            force_settle_ms: 100,
            operation_timeout_ms: 2_000,
        }
    }

    fn manager(os: &Arc<FakeOs>, timing: TimingConfig) -> LifecycleManager {
        let components = Components {
            probe: os.clone(),
            signaller: os.clone(),
            launcher: os.clone(),
            exits: None,
        };
        LifecycleManager::with_components(components, &timing)
    }

    #[tokio::test]
    async fn test_start_registers_exactly_one_process() {
        let os = FakeOs::new();
        let manager = manager(&os, timing());
        let id = EntryId::from("1");

        let process = manager.start(&id, "serve-4000").await.unwrap();

        assert_eq!(manager.registry().get(&id).await, Some(process.clone()));
        assert_eq!(manager.registry().len().await, 1);
        assert!(os.is_running(process.pid));
        assert!(manager.check_status(4000).await.unwrap());
    }

    #[tokio::test]
    async fn test_second_start_replaces_first() {
        let os = FakeOs::new();
        let manager = manager(&os, timing());
        let id = EntryId::from("1");

        let first = manager.start(&id, "serve-4000").await.unwrap();
        let second = manager.start(&id, "serve-4000").await.unwrap();

        assert_ne!(first.pid, second.pid);
        assert!(!os.is_running(first.pid));
        assert!(os.is_running(second.pid));
        assert_eq!(manager.registry().get(&id).await.unwrap().pid, second.pid);
        assert_eq!(manager.registry().len().await, 1);
    }

    #[tokio::test]
    async fn test_stop_never_started_is_empty_success() {
        let os = FakeOs::new();
        let manager = manager(&os, timing());

        let report = manager.stop(&EntryId::from("nope"), 4100).await.unwrap();

        assert!(report.killed.is_empty());
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn test_stop_kills_tracked_and_foreign_owners() {
        let os = FakeOs::new();
        let manager = manager(&os, timing());
        let id = EntryId::from("1");

        let tracked = manager.start(&id, "serve-4200").await.unwrap();
        let foreign = os.spawn_foreign(4200, false);
        let stubborn = os.spawn_foreign(4200, true);

        let mut report = manager.stop(&id, 4200).await.unwrap();
        report.killed.sort_unstable();

        assert_eq!(report.killed, vec![tracked.pid, foreign, stubborn]);
        assert!(!manager.check_status(4200).await.unwrap());
        assert!(manager.registry().get(&id).await.is_none());
    }

    #[tokio::test]
    async fn test_stop_without_port_only_touches_tracked() {
        let os = FakeOs::new();
        let manager = manager(&os, timing());
        let id = EntryId::from("1");

        let tracked = manager.start(&id, "serve-4300").await.unwrap();
        let foreign = os.spawn_foreign(4300, false);

        let report = manager.stop(&id, None).await.unwrap();

        assert_eq!(report.killed, vec![tracked.pid]);
        assert!(os.is_running(foreign));
    }

    #[tokio::test]
    async fn test_force_restart_frees_port_before_launch() {
        let os = FakeOs::new();
        let manager = manager(&os, timing());
        let id = EntryId::from("1");

        let old = manager.start(&id, "serve-4400").await.unwrap();
        let watcher = os.spawn_foreign(4400, true);

        let new = manager.force_restart(&id, 4400, "serve-4400").await.unwrap();

        assert!(!os.is_running(old.pid));
        assert!(!os.is_running(watcher));
        assert!(os.is_running(new.pid));
        assert_eq!(
            os.find_owners(4400).await.unwrap(),
            BTreeSet::from([new.pid])
        );
        assert!(manager.check_status(4400).await.unwrap());
    }

    #[tokio::test]
    async fn test_operations_on_unknown_entries_leave_no_slots() {
        let os = FakeOs::new();
        let manager = manager(&os, timing());

        for n in 0..200 {
            let id = EntryId::from(format!("ghost-{}", n));
            let report = manager.stop(&id, None).await.unwrap();
            assert!(report.killed.is_empty());
        }
        assert_eq!(manager.registry().slot_count(), 0);

        let id = EntryId::from("real");
        manager.start(&id, "serve-4500").await.unwrap();
        manager.stop(&id, 4500).await.unwrap();
        assert_eq!(manager.registry().slot_count(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_force_restarts_do_not_serialize() {
        let os = FakeOs::new();
        let manager = manager(&os, timing());
        os.spawn_foreign(5000, true);
        os.spawn_foreign(5001, true);

        let (first, second) = (EntryId::from("a"), EntryId::from("b"));
        let started = Instant::now();
        let (a, b) = tokio::join!(
            manager.force_restart(&first, 5000, "serve-5000"),
            manager.force_restart(&second, 5001, "serve-5001"),
        );
        let elapsed = started.elapsed();

        assert!(a.is_ok() && b.is_ok());
        // One settle window each, overlapping.
        assert!(elapsed < Duration::from_millis(190), "took {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_probe_failure_is_not_coerced_to_stopped() {
        let os = FakeOs::new();
        let manager = manager(&os, timing());
        *os.probe_fails.lock().unwrap() = true;

        assert!(matches!(manager.check_status(4000).await, Err(Error::Probe(_))));
        assert!(matches!(
            manager.stop(&EntryId::from("1"), 4000).await,
            Err(Error::Probe(_))
        ));
        assert!(matches!(
            manager.force_restart(&EntryId::from("1"), 4000, "serve-4000").await,
            Err(Error::Probe(_))
        ));
        assert!(manager.registry().is_empty().await);
    }

    #[tokio::test]
    async fn test_probe_failure_after_tracked_stop_is_partial_success() {
        let os = FakeOs::new();
        let manager = manager(&os, timing());
        let id = EntryId::from("1");
        let tracked = manager.start(&id, "serve-4500").await.unwrap();
        *os.probe_fails.lock().unwrap() = true;

        let report = manager.stop(&id, 4500).await.unwrap();

        assert_eq!(report.killed, vec![tracked.pid]);
    }

    #[tokio::test]
    async fn test_hung_probe_times_out() {
        let os = FakeOs::new();
        let manager = manager(
            &os,
            TimingConfig {
                operation_timeout_ms: 50,
                ..timing()
            },
        );
        *os.probe_delay.lock().unwrap() = Some(Duration::from_secs(5));

        assert!(matches!(manager.check_status(4000).await, Err(Error::Timeout(_))));
    }

    #[tokio::test]
    async fn test_launch_failure_is_reported_and_recorded() {
        let os = FakeOs::new();
        let manager = manager(&os, timing());
        let id = EntryId::from("1");

        let err = manager.start(&id, "missing.command").await.unwrap_err();

        assert!(matches!(err, Error::Launch(_)));
        assert!(manager.registry().get(&id).await.is_none());
        let events = manager.events().recent(Some(&id), None);
        assert_eq!(events[0].event, LifecycleEvent::Failed);
    }

    #[tokio::test]
    async fn test_start_reaps_externally_exited_process() {
        let os = FakeOs::new();
        let manager = manager(&os, timing());
        let id = EntryId::from("1");

        let first = manager.start(&id, "serve-4600").await.unwrap();
        os.kill(first.pid);

        let second = manager.start(&id, "serve-4600").await.unwrap();

        assert_ne!(first.pid, second.pid);
        let events = manager.events().recent(Some(&id), None);
        assert!(events.iter().any(|e| e.event == LifecycleEvent::Exited && e.pid == Some(first.pid)));
        assert!(!events.iter().any(|e| e.event == LifecycleEvent::Stopped));
    }

    #[tokio::test]
    async fn test_exit_notice_removes_record() {
        let os = FakeOs::new();
        let (tx, rx) = mpsc::channel(4);
        let components = Components {
            probe: os.clone(),
            signaller: os.clone(),
            launcher: os.clone(),
            exits: Some(rx),
        };
        let manager = LifecycleManager::with_components(components, &timing());
        let id = EntryId::from("1");
        let process = manager.start(&id, "serve-4700").await.unwrap();

        let mut events = manager.events().subscribe();
        tx.send(ExitNotice {
            entry_id: id.clone(),
            launch_id: process.launch_id,
            pid: process.pid,
            code: Some(1),
        })
        .await
        .unwrap();

        let record = tokio::time::timeout(Duration::from_secs(1), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.event, LifecycleEvent::Exited);
        assert_eq!(record.details.as_deref(), Some("exit code 1"));
        assert!(manager.registry().get(&id).await.is_none());
    }

    #[tokio::test]
    async fn test_shutdown_terminates_every_tracked_process() {
        let os = FakeOs::new();
        let manager = manager(&os, timing());
        let a = manager.start(&EntryId::from("a"), "serve-6000").await.unwrap();
        let b = manager.start(&EntryId::from("b"), "serve-6001").await.unwrap();

        assert!(manager.shutdown(false).await.killed.is_empty());
        assert_eq!(manager.registry().len().await, 2);

        let mut report = manager.shutdown(true).await;
        report.killed.sort_unstable();

        assert_eq!(report.killed, vec![a.pid, b.pid]);
        assert!(manager.registry().is_empty().await);
    }
}
