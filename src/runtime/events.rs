//! Outcome stream published by the drainer.

use crate::{replay::{ReplayError, drainer::DrainReport}, types::ActionId};

/// Events emitted while draining, so the application can surface failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// A non-empty drain began.
    DrainStarted {
        /// Actions taken from the queue.
        count: usize,
    },
    /// An action was replayed with a 2xx status.
    Replayed {
        /// Replayed action id.
        id: ActionId,
        /// HTTP status returned.
        status: u16,
    },
    /// An action's replay failed.
    ReplayFailed {
        /// Failed action id.
        id: ActionId,
        /// Failure cause.
        error: ReplayError,
    },
    /// The drain run is over.
    DrainFinished {
        /// Final counts.
        report: DrainReport,
    },
}
