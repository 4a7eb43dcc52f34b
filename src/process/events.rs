use crate::process::types::{EntryId, ProcessId};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::broadcast;

/// Maximum number of events kept in history
pub const EVENT_HISTORY_LIMIT: usize = 1000;

/// Lifecycle event types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LifecycleEvent {
    /// A process was launched
    Started,
    /// Processes were terminated on request
    Stopped,
    /// A force restart launched a new process
    Restarted,
    /// A launched process exited on its own
    Exited,
    /// A launch failed
    Failed,
}

impl LifecycleEvent {
    /// Name used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleEvent::Started => "started",
            LifecycleEvent::Stopped => "stopped",
            LifecycleEvent::Restarted => "restarted",
            LifecycleEvent::Exited => "exited",
            LifecycleEvent::Failed => "failed",
        }
    }
}

impl std::fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded lifecycle event
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleRecord {
    /// Entry the event concerns
    pub entry_id: EntryId,
    /// Event type
    pub event: LifecycleEvent,
    /// Process involved, if any
    pub pid: Option<ProcessId>,
    /// Milliseconds since the Unix epoch
    pub timestamp_ms: u64,
    /// Event details
    pub details: Option<String>,
}

/// Bounded event history plus a live broadcast of new events
pub struct EventLog {
    history: Mutex<VecDeque<LifecycleRecord>>,
    sender: broadcast::Sender<LifecycleRecord>,
}

impl EventLog {
    /// Create an event log whose broadcast buffers `capacity` events per subscriber
    ///
    /// A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            history: Mutex::new(VecDeque::new()),
            sender,
        }
    }

    /// Record an event and broadcast it to subscribers
    pub fn record(
        &self,
        entry_id: &EntryId,
        event: LifecycleEvent,
        pid: Option<ProcessId>,
        details: Option<String>,
    ) {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        let record = LifecycleRecord {
            entry_id: entry_id.clone(),
            event,
            pid,
            timestamp_ms,
            details,
        };

        match self.history.lock() {
            Ok(mut history) => {
                history.push_back(record.clone());
                while history.len() > EVENT_HISTORY_LIMIT {
                    history.pop_front();
                }
            }
            Err(_) => tracing::warn!("Failed to lock event history"),
        }

        // No subscribers is fine.
        let _ = self.sender.send(record);
    }

    /// Subscribe to events recorded from now on
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleRecord> {
        self.sender.subscribe()
    }

    /// Recent events, newest first, optionally filtered by entry
    pub fn recent(&self, entry_id: Option<&EntryId>, limit: Option<usize>) -> Vec<LifecycleRecord> {
        let Ok(history) = self.history.lock() else {
            tracing::warn!("Failed to lock event history");
            return Vec::new();
        };

        history
            .iter()
            .rev()
            .filter(|record| entry_id.is_none_or(|id| &record.entry_id == id))
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    /// Clear the history
    pub fn clear(&self) {
        if let Ok(mut history) = self.history.lock() {
            history.clear();
        }
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(100)
    }
}
