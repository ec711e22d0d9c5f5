use std::{sync::Arc, time::Duration};

use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::{
    config::SyncConfig,
    queue::QueueError,
    replay::{Transport, drainer::{DrainReport, Drainer}},
    sync::{SyncEvent, SyncRegistrar, manager::SyncManager},
};

use super::events::SyncOutcome;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error("sync worker channel closed")]
    ChannelClosed,
}

/// Wake-ups from the host background-sync facility.
pub struct WakeSource {
    pub manager: Arc<SyncManager>,
    pub events: mpsc::UnboundedReceiver<SyncEvent>,
}

impl WakeSource {
    pub fn new(manager: Arc<SyncManager>, events: mpsc::UnboundedReceiver<SyncEvent>) -> Self {
        Self { manager, events }
    }
}

/// Handle to the detached sync worker.
#[derive(Clone)]
pub struct SyncWorkerHandle {
    cmd_tx: mpsc::Sender<Command>,
    outcomes_tx: broadcast::Sender<SyncOutcome>,
}

enum Command {
    Flush {
        resp: oneshot::Sender<Result<DrainReport, QueueError>>,
    },
    Shutdown {
        resp: oneshot::Sender<()>,
    },
}

/// Moves `drainer` onto its own task.
///
/// The worker handles one sync event or flush at a time. A sync event whose
/// drain errors is registered again after `config.retry_delay_ms`. Without a
/// wake source the queue only drains on [`SyncWorkerHandle::flush`].
pub fn spawn_sync_worker<T>(
    drainer: Drainer<T>,
    wake: Option<WakeSource>,
    config: &SyncConfig,
) -> SyncWorkerHandle
where
    T: Transport + 'static,
{
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command>(config.command_capacity.max(1));
    let outcomes_tx = drainer.outcomes();
    let retry_delay = Duration::from_millis(config.retry_delay_ms);

    tokio::spawn(async move {
        let (manager, mut wake_rx) = match wake {
            Some(WakeSource { manager, events }) => (Some(manager), Some(events)),
            None => (None, None),
        };
        info!(tag = drainer.tag(), background = wake_rx.is_some(), "sync worker started");

        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => {
                    let Some(cmd) = cmd else { break; };
                    match cmd {
                        Command::Flush { resp } => {
                            let _ = resp.send(drainer.drain().await);
                        }
                        Command::Shutdown { resp } => {
                            let _ = resp.send(());
                            break;
                        }
                    }
                }
                event = recv_wake(&mut wake_rx), if wake_rx.is_some() => {
                    let Some(event) = event else {
                        debug!("wake source closed");
                        wake_rx = None;
                        continue;
                    };
                    if let Some(manager) = &manager {
                        manager.take_pending(&event.tag);
                    }
                    if let Err(err) = drainer.handle_sync(&event.tag).await {
                        warn!(tag = %event.tag, error = %err, "sync drain failed");
                        if let Some(manager) = &manager {
                            schedule_retry(Arc::clone(manager), event.tag, retry_delay);
                        }
                    }
                }
            }
        }

        info!("sync worker stopped");
    });

    SyncWorkerHandle {
        cmd_tx,
        outcomes_tx,
    }
}

fn schedule_retry(manager: Arc<SyncManager>, tag: String, delay: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        if let Err(err) = manager.register(&tag) {
            debug!(%tag, error = %err, "sync retry not registered");
        }
    });
}

async fn recv_wake(rx: &mut Option<mpsc::UnboundedReceiver<SyncEvent>>) -> Option<SyncEvent> {
    match rx {
        Some(rx) => rx.recv().await,
        None => None,
    }
}

impl SyncWorkerHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<SyncOutcome> {
        self.outcomes_tx.subscribe()
    }

    /// Foreground flush: drains and replays now, regardless of sync tags.
    pub async fn flush(&self) -> Result<DrainReport, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Flush { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        Ok(rx.await.map_err(|_| RuntimeError::ChannelClosed)??)
    }

    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Shutdown { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }
}
