pub mod memory;
pub mod sqlite;

use thiserror::Error;

use crate::{
    action::{ActionDraft, QueuedAction},
    types::{ActionId, TimestampMs},
};

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("json error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("timestamp {0} does not fit the store")]
    TimestampOutOfRange(TimestampMs),
    #[error("corrupted row {id}: {reason}")]
    Corrupted { id: ActionId, reason: String },
}

pub type PersistResult<T> = Result<T, PersistError>;

/// Storage engine behind the action queue.
///
/// `append` and `drain_all` must each be atomic: a drain either observes and
/// removes a row or leaves it for the next drain.
pub trait ActionStore: Send {
    fn append(&mut self, draft: &ActionDraft, enqueued_at: TimestampMs) -> PersistResult<ActionId>;

    /// Returns every row ordered by `(enqueued_at, id)` and empties the store.
    fn drain_all(&mut self) -> PersistResult<Vec<QueuedAction>>;

    /// Re-appends a failed action with its attempt counter and original timestamp.
    fn requeue(&mut self, action: &QueuedAction) -> PersistResult<ActionId>;

    fn len(&self) -> PersistResult<usize>;

    fn is_empty(&self) -> PersistResult<bool> {
        Ok(self.len()? == 0)
    }
}
