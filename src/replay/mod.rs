//! Replaying queued actions against the remote API.

/// Sequential drain loop and its report.
pub mod drainer;
/// `reqwest`-backed transport.
pub mod http;

use std::future::Future;

use reqwest::Url;
use thiserror::Error;

use crate::{
    action::QueuedAction,
    types::{ActionId, ActionMethod},
};

/// Content type of every replayed request.
pub const CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("timeout")]
    Timeout,
    #[error("network error: {0}")]
    Network(String),
}

/// Why one action's replay did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplayError {
    #[error("http {0}")]
    Status(u16),
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The stored action cannot be turned into a request.
    #[error("corrupted action: {0}")]
    Corrupted(String),
}

impl ReplayError {
    pub fn is_corrupted(&self) -> bool {
        matches!(self, Self::Corrupted(_))
    }
}

/// One HTTP request reproducing a queued action. No auth header is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayRequest {
    pub action_id: ActionId,
    pub method: ActionMethod,
    pub url: Url,
    /// JSON-encoded body, present only when the action has one.
    pub body: Option<Vec<u8>>,
}

impl ReplayRequest {
    /// Builds the request for `action`, resolving relative targets against `base`.
    pub fn from_action(action: &QueuedAction, base: Option<&Url>) -> Result<Self, ReplayError> {
        let target = action.target.trim();
        if target.is_empty() {
            return Err(ReplayError::Corrupted(format!(
                "action {} has no target",
                action.id
            )));
        }

        let url = match Url::parse(target) {
            Ok(url) => url,
            Err(_) => match base {
                Some(base) => base.join(target).map_err(|e| {
                    ReplayError::Corrupted(format!("target {target:?} does not resolve: {e}"))
                })?,
                None => {
                    return Err(ReplayError::Corrupted(format!(
                        "relative target {target:?} without api base"
                    )));
                }
            },
        };
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ReplayError::Corrupted(format!(
                "unsupported scheme in {url}"
            )));
        }

        let body = match &action.body {
            Some(body) if action.method.carries_body() => Some(
                serde_json::to_vec(body)
                    .map_err(|e| ReplayError::Corrupted(format!("body encode failed: {e}")))?,
            ),
            _ => None,
        };

        Ok(Self {
            action_id: action.id,
            method: action.method,
            url,
            body,
        })
    }
}

/// Network boundary used by the drainer.
pub trait Transport: Send + Sync {
    /// Issues `request` and returns the HTTP status code.
    fn send(
        &self,
        request: ReplayRequest,
    ) -> impl Future<Output = Result<u16, TransportError>> + Send;
}
