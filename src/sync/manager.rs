use std::sync::Mutex;

use hashbrown::HashSet;
use tokio::sync::mpsc;

use super::{SyncError, SyncEvent, SyncRegistrar};

/// In-process background-sync host.
///
/// Repeated registrations of a tag that has not fired yet collapse into one
/// wake-up. The worker calls [`SyncManager::take_pending`] when it handles the
/// event, after which the tag can be registered again.
#[derive(Debug)]
pub struct SyncManager {
    pending: Mutex<HashSet<String>>,
    tx: mpsc::UnboundedSender<SyncEvent>,
}

impl SyncManager {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SyncEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let manager = Self {
            pending: Mutex::new(HashSet::new()),
            tx,
        };
        (manager, rx)
    }

    /// Tags registered but not yet handled.
    pub fn pending_tags(&self) -> Vec<String> {
        let pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        let mut tags: Vec<_> = pending.iter().cloned().collect();
        tags.sort();
        tags
    }

    /// Clears `tag`, returning whether it was pending.
    pub fn take_pending(&self, tag: &str) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(tag)
    }
}

impl SyncRegistrar for SyncManager {
    fn register(&self, tag: &str) -> Result<(), SyncError> {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if !pending.insert(tag.to_string()) {
            tracing::trace!(tag, "sync already registered");
            return Ok(());
        }

        if self
            .tx
            .send(SyncEvent {
                tag: tag.to_string(),
            })
            .is_err()
        {
            pending.remove(tag);
            return Err(SyncError::Closed);
        }
        tracing::debug!(tag, "sync registered");
        Ok(())
    }
}
