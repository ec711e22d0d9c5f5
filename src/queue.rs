//! Durable action queue shared by the application and the drainer.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tokio::sync::Mutex;

use crate::{
    action::{ActionBody, ActionDraft, QueuedAction},
    config::SyncConfig,
    persist::{ActionStore, PersistError},
    sync::{SyncError, SyncRegistrar},
    types::{ActionId, ActionMethod, SYNC_TAG, TimestampMs},
};

#[derive(Debug, Error)]
pub enum QueueError {
    /// The store could not be opened or written. Callers should tell the user
    /// that changes may be lost.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[from] PersistError),
    #[error("storage task failed: {0}")]
    Join(String),
}

/// Owned handle to the durable queue. Clones share the same store.
#[derive(Clone)]
pub struct ActionQueue {
    store: Arc<Mutex<Box<dyn ActionStore>>>,
    registrar: Arc<dyn SyncRegistrar>,
    tag: Arc<str>,
    last_ts: Arc<AtomicU64>,
}

impl std::fmt::Debug for ActionQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionQueue").field("tag", &self.tag).finish_non_exhaustive()
    }
}

impl ActionQueue {
    /// Wraps `store`, registering wake-ups under [`SYNC_TAG`].
    pub fn new(store: impl ActionStore + 'static, registrar: Arc<dyn SyncRegistrar>) -> Self {
        Self::with_tag(store, registrar, SYNC_TAG)
    }

    /// Wraps `store`, registering wake-ups under `config.tag`.
    pub fn from_config(
        store: impl ActionStore + 'static,
        registrar: Arc<dyn SyncRegistrar>,
        config: &SyncConfig,
    ) -> Self {
        Self::with_tag(store, registrar, &config.tag)
    }

    pub fn with_tag(
        store: impl ActionStore + 'static,
        registrar: Arc<dyn SyncRegistrar>,
        tag: &str,
    ) -> Self {
        Self {
            store: Arc::new(Mutex::new(Box::new(store))),
            registrar,
            tag: Arc::from(tag),
            last_ts: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Appends one action and asks the host for a background-sync wake-up.
    ///
    /// The wake-up is best-effort: an unsupported or closed host is logged and
    /// the enqueue still succeeds.
    pub async fn enqueue(
        &self,
        method: ActionMethod,
        target: impl Into<String>,
        body: Option<ActionBody>,
    ) -> Result<ActionId, QueueError> {
        self.enqueue_action(ActionDraft {
            method,
            target: target.into(),
            body,
        })
        .await
    }

    /// Caller-facing entry point taking a complete draft.
    pub async fn enqueue_action(&self, draft: ActionDraft) -> Result<ActionId, QueueError> {
        let draft = draft.normalized();
        let enqueued_at = self.next_timestamp();
        let target = draft.target.clone();

        let id = self
            .with_store(move |store| store.append(&draft, enqueued_at))
            .await?;
        tracing::debug!(action_id = id, %target, enqueued_at, "action enqueued");

        self.request_sync();
        Ok(id)
    }

    /// Destructive read: every queued action in replay order, leaving the
    /// store empty.
    pub async fn drain_all(&self) -> Result<Vec<QueuedAction>, QueueError> {
        self.with_store(|store| store.drain_all()).await
    }

    /// Number of actions waiting for replay.
    pub async fn pending(&self) -> Result<usize, QueueError> {
        self.with_store(|store| store.len()).await
    }

    pub(crate) async fn requeue(&self, action: QueuedAction) -> Result<ActionId, QueueError> {
        self.with_store(move |store| store.requeue(&action)).await
    }

    fn request_sync(&self) {
        match self.registrar.register(&self.tag) {
            Ok(()) => {}
            Err(SyncError::RegistrationUnsupported) => {
                tracing::warn!(tag = %self.tag, "background sync unsupported; queue drains on next flush");
            }
            Err(err) => {
                tracing::warn!(tag = %self.tag, error = %err, "background sync registration failed");
            }
        }
    }

    async fn with_store<T, F>(&self, f: F) -> Result<T, QueueError>
    where
        T: Send + 'static,
        F: FnOnce(&mut dyn ActionStore) -> Result<T, PersistError> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let out = tokio::task::spawn_blocking(move || {
            let mut store = store.blocking_lock();
            f(store.as_mut())
        })
        .await
        .map_err(|e| QueueError::Join(e.to_string()))??;
        Ok(out)
    }

    /// Wall-clock milliseconds, never lower than the previous call.
    fn next_timestamp(&self) -> TimestampMs {
        let now = now_ms();
        let prev = self.last_ts.fetch_max(now, Ordering::SeqCst);
        now.max(prev)
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
