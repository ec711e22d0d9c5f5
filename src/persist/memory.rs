//! In-memory action store for tests and hosts without a disk.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use crate::{
    action::{ActionDraft, QueuedAction},
    types::{ActionId, ActionKind, TimestampMs},
};

use super::{ActionStore, PersistError, PersistResult};

/// Volatile [`ActionStore`] with the same ordering and id rules as SQLite.
#[derive(Debug)]
pub struct MemoryActionStore {
    rows: Vec<QueuedAction>,
    next_id: ActionId,
    available: Arc<AtomicBool>,
}

impl Default for MemoryActionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryActionStore {
    pub fn new() -> Self {
        Self {
            rows: Vec::new(),
            next_id: 1,
            available: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Switch that makes every operation fail with [`PersistError::Unavailable`]
    /// while set to `false`.
    pub fn availability(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.available)
    }

    fn check_available(&self) -> PersistResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(PersistError::Unavailable("memory store switched off".to_string()))
        }
    }

    fn push(&mut self, draft: &ActionDraft, enqueued_at: TimestampMs, attempts: u32) -> ActionId {
        let id = self.next_id;
        self.next_id += 1;
        self.rows.push(QueuedAction {
            id,
            kind: ActionKind::RemoteCall,
            method: draft.method,
            target: draft.target.clone(),
            body: draft.body.clone().filter(|_| draft.method.carries_body()),
            enqueued_at,
            attempts,
        });
        id
    }
}

/// Same bound as the SQLite `INTEGER` column.
fn check_timestamp(enqueued_at: TimestampMs) -> PersistResult<()> {
    if i64::try_from(enqueued_at).is_err() {
        return Err(PersistError::TimestampOutOfRange(enqueued_at));
    }
    Ok(())
}

impl ActionStore for MemoryActionStore {
    fn append(&mut self, draft: &ActionDraft, enqueued_at: TimestampMs) -> PersistResult<ActionId> {
        self.check_available()?;
        check_timestamp(enqueued_at)?;
        Ok(self.push(draft, enqueued_at, 0))
    }

    fn drain_all(&mut self) -> PersistResult<Vec<QueuedAction>> {
        self.check_available()?;
        let mut out = std::mem::take(&mut self.rows);
        out.sort_by_key(QueuedAction::order_key);
        Ok(out)
    }

    fn requeue(&mut self, action: &QueuedAction) -> PersistResult<ActionId> {
        self.check_available()?;
        Ok(self.push(&action.to_draft(), action.enqueued_at, action.attempts))
    }

    fn len(&self) -> PersistResult<usize> {
        self.check_available()?;
        Ok(self.rows.len())
    }
}
