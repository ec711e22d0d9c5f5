use reqwest::Url;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::{
    action::QueuedAction,
    config::{ConfigError, FailurePolicy, SyncConfig},
    queue::{ActionQueue, QueueError},
    runtime::events::SyncOutcome,
};

use super::{ReplayError, ReplayRequest, Transport};

/// Counts for one drain run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub attempted: usize,
    pub succeeded: usize,
    /// Non-2xx or transport failures.
    pub failed: usize,
    /// Actions that could not be turned into a request.
    pub corrupted: usize,
    /// Failed actions put back by [`FailurePolicy::Requeue`].
    pub requeued: usize,
}

/// Replays the queue when the host fires a matching sync event.
///
/// The queue is drained before any request is issued, so with
/// [`FailurePolicy::Discard`] an action that fails, or a run that is
/// interrupted, loses its remaining actions.
pub struct Drainer<T: Transport> {
    queue: ActionQueue,
    transport: T,
    base: Option<Url>,
    tag: String,
    policy: FailurePolicy,
    outcomes: broadcast::Sender<SyncOutcome>,
}

impl<T: Transport> Drainer<T> {
    /// Fails when `queue` registers a different tag than `config.tag`, since
    /// its wake-ups would never be answered.
    pub fn new(queue: ActionQueue, transport: T, config: &SyncConfig) -> Result<Self, ConfigError> {
        if queue.tag() != config.tag {
            return Err(ConfigError::TagMismatch {
                queue: queue.tag().to_string(),
                drainer: config.tag.clone(),
            });
        }
        let (outcomes, _) = broadcast::channel(config.event_capacity.max(1));
        Ok(Self {
            queue,
            transport,
            base: config.base_url()?,
            tag: config.tag.clone(),
            policy: config.failure_policy,
            outcomes,
        })
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncOutcome> {
        self.outcomes.subscribe()
    }

    pub(crate) fn outcomes(&self) -> broadcast::Sender<SyncOutcome> {
        self.outcomes.clone()
    }

    /// Sync-event entry point. Tags other than the configured one are ignored.
    pub async fn handle_sync(&self, tag: &str) -> Result<DrainReport, QueueError> {
        if tag != self.tag {
            debug!(tag, expected = %self.tag, "ignoring sync event");
            return Ok(DrainReport::default());
        }
        self.drain().await
    }

    /// Drains the queue and replays every action in order, one at a time.
    ///
    /// Per-action failures are logged and never stop the batch.
    pub async fn drain(&self) -> Result<DrainReport, QueueError> {
        let actions = self.queue.drain_all().await?;
        let mut report = DrainReport::default();
        if actions.is_empty() {
            debug!("sync: queue empty");
            return Ok(report);
        }

        info!(count = actions.len(), "sync: replaying queued actions");
        let _ = self.outcomes.send(SyncOutcome::DrainStarted {
            count: actions.len(),
        });

        for action in actions {
            report.attempted += 1;
            match self.replay_one(&action).await {
                Ok(status) => {
                    report.succeeded += 1;
                    debug!(
                        action_id = action.id,
                        method = action.method.http_verb(),
                        target = %action.target,
                        status,
                        "action replayed"
                    );
                    let _ = self.outcomes.send(SyncOutcome::Replayed {
                        id: action.id,
                        status,
                    });
                }
                Err(err) => {
                    warn!(
                        action_id = action.id,
                        method = action.method.http_verb(),
                        target = %action.target,
                        error = %err,
                        "action replay failed"
                    );
                    let _ = self.outcomes.send(SyncOutcome::ReplayFailed {
                        id: action.id,
                        error: err.clone(),
                    });
                    if err.is_corrupted() {
                        report.corrupted += 1;
                    } else {
                        report.failed += 1;
                        if self.retry(action).await {
                            report.requeued += 1;
                        }
                    }
                }
            }
        }

        info!(
            attempted = report.attempted,
            succeeded = report.succeeded,
            failed = report.failed,
            corrupted = report.corrupted,
            requeued = report.requeued,
            "sync: drain finished"
        );
        let _ = self.outcomes.send(SyncOutcome::DrainFinished { report });
        Ok(report)
    }

    async fn replay_one(&self, action: &QueuedAction) -> Result<u16, ReplayError> {
        let request = ReplayRequest::from_action(action, self.base.as_ref())?;
        let status = self.transport.send(request).await?;
        if (200..300).contains(&status) {
            Ok(status)
        } else {
            Err(ReplayError::Status(status))
        }
    }

    async fn retry(&self, mut action: QueuedAction) -> bool {
        let FailurePolicy::Requeue { max_attempts } = self.policy else {
            return false;
        };
        action.attempts = action.attempts.saturating_add(1);
        if action.attempts >= max_attempts {
            warn!(action_id = action.id, attempts = action.attempts, "giving up on action");
            return false;
        }

        let old_id = action.id;
        match self.queue.requeue(action).await {
            Ok(new_id) => {
                debug!(action_id = old_id, new_id, "action requeued");
                true
            }
            Err(err) => {
                warn!(action_id = old_id, error = %err, "requeue failed; action lost");
                false
            }
        }
    }
}
