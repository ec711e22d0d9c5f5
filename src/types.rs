//! Shared primitive IDs and the queued-action enums.

use serde::{Deserialize, Serialize};

/// Store-assigned action identifier. Never reused.
pub type ActionId = u64;
/// Milliseconds since the Unix epoch.
pub type TimestampMs = u64;

/// Background-sync tag the queue registers and the drainer listens for.
pub const SYNC_TAG: &str = "sync-actions";

/// What a queued action does when replayed.
///
/// Only remote calls exist today; the tag is persisted so other kinds can be
/// added without a schema change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// A mutating HTTP call against the remote API.
    #[default]
    RemoteCall,
}

impl ActionKind {
    /// Text stored in the `kind` column.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RemoteCall => "remote_call",
        }
    }

    /// Parses the `kind` column.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "remote_call" => Some(Self::RemoteCall),
            _ => None,
        }
    }
}

/// Mutation verb of a queued action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionMethod {
    /// Creates a resource (`POST`).
    Create,
    /// Partially updates a resource (`PATCH`).
    Update,
    /// Deletes a resource (`DELETE`).
    Delete,
}

impl ActionMethod {
    /// Text stored in the `method` column.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }

    /// Parses the `method` column.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "CREATE" => Some(Self::Create),
            "UPDATE" => Some(Self::Update),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }

    /// HTTP verb used on replay.
    pub fn http_verb(self) -> &'static str {
        match self {
            Self::Create => "POST",
            Self::Update => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// True when the verb carries a request body.
    pub fn carries_body(self) -> bool {
        !matches!(self, Self::Delete)
    }
}
