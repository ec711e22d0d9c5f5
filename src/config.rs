//! Drainer and worker configuration.

use thiserror::Error;

use crate::types::SYNC_TAG;

/// What happens to an action whose replay failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// The action is gone once drained, whatever the replay outcome.
    #[default]
    Discard,
    /// Failed actions go back to the queue until they have been tried
    /// `max_attempts` times. Corrupted actions are still discarded.
    Requeue {
        /// Total replay attempts allowed per action.
        max_attempts: u32,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid api base url {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("queue registers tag {queue:?} but drainer listens for {drainer:?}")]
    TagMismatch { queue: String, drainer: String },
    #[error("http client: {0}")]
    Client(String),
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Background-sync tag the drainer answers to.
    pub tag: String,
    /// Base URL relative targets are resolved against.
    pub api_base: Option<String>,
    /// Per-request timeout. `None` leaves it to the transport.
    pub request_timeout_ms: Option<u64>,
    pub failure_policy: FailurePolicy,
    /// Delay before a sync event whose drain errored is registered again.
    pub retry_delay_ms: u64,
    pub event_capacity: usize,
    pub command_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            tag: SYNC_TAG.to_string(),
            api_base: None,
            request_timeout_ms: None,
            failure_policy: FailurePolicy::Discard,
            retry_delay_ms: 30_000,
            event_capacity: 256,
            command_capacity: 32,
        }
    }
}

impl SyncConfig {
    /// Parses [`SyncConfig::api_base`].
    pub fn base_url(&self) -> Result<Option<reqwest::Url>, ConfigError> {
        let Some(raw) = self.api_base.as_deref() else {
            return Ok(None);
        };
        let url = reqwest::Url::parse(raw).map_err(|e| ConfigError::InvalidBaseUrl {
            url: raw.to_string(),
            reason: e.to_string(),
        })?;
        if url.cannot_be_a_base() {
            return Err(ConfigError::InvalidBaseUrl {
                url: raw.to_string(),
                reason: "cannot be a base".to_string(),
            });
        }
        Ok(Some(url))
    }
}
