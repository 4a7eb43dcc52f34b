// src/process/types.rs
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;
use uuid::Uuid;

/// OS process identifier
pub type ProcessId = u32;

/// Identifier of a registered entry
///
/// Assigned once when the entry is created and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    /// Wrap an existing identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for EntryId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for EntryId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A live OS process this manager launched for an entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedProcess {
    /// Entry the process was launched for
    pub entry_id: EntryId,
    /// OS process id
    pub pid: ProcessId,
    /// Distinguishes successive launches for the same entry
    pub launch_id: Uuid,
    /// Wall-clock launch time
    pub started_at: SystemTime,
}

impl ManagedProcess {
    /// Record a freshly launched process
    pub fn new(entry_id: EntryId, pid: ProcessId) -> Self {
        Self {
            entry_id,
            pid,
            launch_id: Uuid::new_v4(),
            started_at: SystemTime::now(),
        }
    }
}

/// Durable status of an entry
///
/// Starting, stopping and restarting only exist for the duration of a single
/// operation and are never reported here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryStatus {
    /// Port is occupied
    Running,
    /// Port is free
    Stopped,
}

impl From<bool> for EntryStatus {
    fn from(running: bool) -> Self {
        if running {
            EntryStatus::Running
        } else {
            EntryStatus::Stopped
        }
    }
}

/// Notification that a launched child exited on its own
#[derive(Debug, Clone)]
pub struct ExitNotice {
    /// Entry the child belonged to
    pub entry_id: EntryId,
    /// Launch the child belonged to
    pub launch_id: Uuid,
    /// OS process id of the child
    pub pid: ProcessId,
    /// Exit code, `None` when killed by a signal or the wait failed
    pub code: Option<i32>,
}
