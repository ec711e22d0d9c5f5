//! Host background-sync facility.
//!
//! The queue asks the host to wake the drainer under a tag; the host decides
//! when. [`manager::SyncManager`] is the in-process host, [`Unsupported`]
//! stands in for a host without the capability.

/// Tag registry that wakes the detached worker.
pub mod manager;

use thiserror::Error;

/// Failure to register a background-sync wake-up.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// The host cannot schedule background sync.
    #[error("background sync is not supported by this host")]
    RegistrationUnsupported,
    /// The worker receiving wake-ups is gone.
    #[error("background sync channel closed")]
    Closed,
}

/// Wake-up delivered to the detached worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncEvent {
    /// Registration tag the event was fired for.
    pub tag: String,
}

/// Registration side of the host background-sync facility.
pub trait SyncRegistrar: Send + Sync {
    /// Requests a future wake-up under `tag`. Best-effort.
    fn register(&self, tag: &str) -> Result<(), SyncError>;
}

/// Host without background sync.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unsupported;

impl SyncRegistrar for Unsupported {
    fn register(&self, _tag: &str) -> Result<(), SyncError> {
        Err(SyncError::RegistrationUnsupported)
    }
}
