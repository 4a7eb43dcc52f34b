use crate::process::signal::ProcessSignaller;
use crate::process::types::{EntryId, ExitNotice, ManagedProcess};
use std::collections::HashMap;
use std::sync::{Arc, Mutex as MapLock, MutexGuard, PoisonError};
use tokio::sync::{Mutex, OwnedMutexGuard, mpsc};
use tokio::task::JoinHandle;
use uuid::Uuid;

type Slot = Arc<Mutex<Option<ManagedProcess>>>;
type SlotMap = Arc<MapLock<HashMap<EntryId, Slot>>>;

fn lock_map(slots: &SlotMap) -> MutexGuard<'_, HashMap<EntryId, Slot>> {
    // Every critical section leaves the map consistent.
    slots.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Exclusive access to one entry's process slot
///
/// Obtained from [`ProcessRegistry::lock_entry`]. While it is held no other
/// operation can read or replace the entry's [`ManagedProcess`], so a start
/// and a stop for the same entry can never interleave. Dropping the guard
/// releases the entry, and removes its slot from the registry when it is
/// empty and nobody else is waiting on it.
pub struct EntryGuard {
    entry_id: EntryId,
    slot: OwnedMutexGuard<Option<ManagedProcess>>,
    slots: SlotMap,
}

impl EntryGuard {
    /// The entry this guard locks
    pub fn entry_id(&self) -> &EntryId {
        &self.entry_id
    }

    /// The current record, if any
    pub fn current(&self) -> Option<&ManagedProcess> {
        self.slot.as_ref()
    }

    /// Replace the record, returning the previous one
    pub fn install(&mut self, process: ManagedProcess) -> Option<ManagedProcess> {
        debug_assert_eq!(process.entry_id, self.entry_id);
        self.slot.replace(process)
    }

    /// Remove and return the record
    pub fn take(&mut self) -> Option<ManagedProcess> {
        self.slot.take()
    }

    /// Drop the record if its process is gone, returning what was removed
    pub fn reap(&mut self, signaller: &dyn ProcessSignaller) -> Option<ManagedProcess> {
        match self.slot.as_ref() {
            Some(process) if !signaller.is_alive(process.pid) => {
                tracing::debug!(entry_id = %self.entry_id, pid = process.pid, "Reaped exited process");
                self.slot.take()
            }
            _ => None,
        }
    }
}

impl Drop for EntryGuard {
    fn drop(&mut self) {
        if self.slot.is_some() {
            return;
        }
        let ours = OwnedMutexGuard::mutex(&self.slot);
        let mut slots = lock_map(&self.slots);
        // The map and this guard are the only holders: no waiter, no sweep.
        let idle = slots
            .get(&self.entry_id)
            .is_some_and(|slot| Arc::ptr_eq(slot, ours) && Arc::strong_count(slot) == 2);
        if idle {
            slots.remove(&self.entry_id);
        }
    }
}

/// In-memory map from entry id to the process this manager launched for it
///
/// Each entry has its own async lock; operations on different entries never
/// wait on each other. The map-level lock is only held to find, create or
/// drop a slot, never across an await. Slots exist only for entries with a
/// record or an operation in flight.
#[derive(Default)]
pub struct ProcessRegistry {
    slots: SlotMap,
}

impl ProcessRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, entry_id: &EntryId) -> Slot {
        Arc::clone(lock_map(&self.slots).entry(entry_id.clone()).or_default())
    }

    fn existing_slot(&self, entry_id: &EntryId) -> Option<Slot> {
        lock_map(&self.slots).get(entry_id).cloned()
    }

    fn all_slots(&self) -> Vec<(EntryId, Slot)> {
        lock_map(&self.slots)
            .iter()
            .map(|(id, slot)| (id.clone(), Arc::clone(slot)))
            .collect()
    }

    fn guard(&self, entry_id: &EntryId, slot: OwnedMutexGuard<Option<ManagedProcess>>) -> EntryGuard {
        EntryGuard {
            entry_id: entry_id.clone(),
            slot,
            slots: Arc::clone(&self.slots),
        }
    }

    /// Drop every empty slot nobody holds
    fn prune(&self) {
        lock_map(&self.slots).retain(|_, slot| {
            Arc::strong_count(slot) > 1 || slot.try_lock().map_or(true, |slot| slot.is_some())
        });
    }

    /// Lock one entry for the duration of an operation
    pub async fn lock_entry(&self, entry_id: &EntryId) -> EntryGuard {
        let slot = self.slot(entry_id).lock_owned().await;
        self.guard(entry_id, slot)
    }

    /// Lock an entry only if it already has a slot
    async fn lock_existing(&self, entry_id: &EntryId) -> Option<EntryGuard> {
        let slot = self.existing_slot(entry_id)?.lock_owned().await;
        Some(self.guard(entry_id, slot))
    }

    /// Current record for `entry_id`
    pub async fn get(&self, entry_id: &EntryId) -> Option<ManagedProcess> {
        self.lock_existing(entry_id).await?.current().cloned()
    }

    /// Store `process`, overwriting any previous record for its entry.
    ///
    /// Nothing is terminated here; callers stop the previous process first.
    pub async fn set(&self, process: ManagedProcess) -> Option<ManagedProcess> {
        let entry_id = process.entry_id.clone();
        self.lock_entry(&entry_id).await.install(process)
    }

    /// Remove the record for `entry_id`
    pub async fn remove(&self, entry_id: &EntryId) -> Option<ManagedProcess> {
        self.lock_existing(entry_id).await?.take()
    }

    /// Remove the record for `entry_id` only if it belongs to `launch_id`.
    ///
    /// A late exit notice for an earlier launch must not drop the record of
    /// the process that replaced it.
    pub async fn remove_if_launch(&self, entry_id: &EntryId, launch_id: Uuid) -> Option<ManagedProcess> {
        let mut guard = self.lock_existing(entry_id).await?;
        match guard.current() {
            Some(process) if process.launch_id == launch_id => guard.take(),
            _ => None,
        }
    }

    /// Drop every record whose process has exited.
    ///
    /// Entries locked by an in-flight operation are skipped; that operation
    /// reaps its own slot.
    pub async fn reap(&self, signaller: &dyn ProcessSignaller) -> Vec<ManagedProcess> {
        let mut reaped = Vec::new();
        for (entry_id, slot) in self.all_slots() {
            let Ok(slot) = slot.try_lock_owned() else {
                tracing::trace!(entry_id = %entry_id, "Entry busy, skipping reap");
                continue;
            };
            let mut guard = self.guard(&entry_id, slot);
            if let Some(process) = guard.reap(signaller) {
                reaped.push(process);
            }
        }
        self.prune();
        reaped
    }

    /// Every current record
    pub async fn snapshot(&self) -> Vec<ManagedProcess> {
        let mut processes = Vec::new();
        for (_, slot) in self.all_slots() {
            if let Some(process) = slot.lock().await.as_ref() {
                processes.push(process.clone());
            }
        }
        processes
    }

    #[cfg(test)]
    pub(crate) fn slot_count(&self) -> usize {
        lock_map(&self.slots).len()
    }

    /// Number of entries with a live record
    pub async fn len(&self) -> usize {
        self.snapshot().await.len()
    }

    /// Whether no entry has a record
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Consume exit notices and drop the matching records.
    ///
    /// `on_removed` is called for every notice that actually removed a record.
    /// The task ends when every sender has been dropped.
    pub fn subscribe<F>(self: &Arc<Self>, mut exits: mpsc::Receiver<ExitNotice>, on_removed: F) -> JoinHandle<()>
    where
        F: Fn(&ExitNotice, ManagedProcess) + Send + 'static,
    {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(notice) = exits.recv().await {
                match registry.remove_if_launch(&notice.entry_id, notice.launch_id).await {
                    Some(process) => {
                        tracing::info!(
                            entry_id = %notice.entry_id,
                            pid = notice.pid,
                            code = ?notice.code,
                            "Process exited, removed from registry"
                        );
                        on_removed(&notice, process);
                    }
                    None => {
                        tracing::debug!(
                            entry_id = %notice.entry_id,
                            pid = notice.pid,
                            "Exit notice for a replaced or stopped process"
                        );
                    }
                }
            }
            tracing::debug!("Exit notification channel closed");
        })
    }
}
