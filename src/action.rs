//! Queued action model and the caller-facing draft.

use serde::{Deserialize, Serialize};

use crate::types::{ActionId, ActionKind, ActionMethod, TimestampMs};

/// Structured JSON payload of a CREATE or UPDATE.
pub type ActionBody = serde_json::Map<String, serde_json::Value>;

/// Mutation the application wants replayed later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDraft {
    /// Mutation verb.
    pub method: ActionMethod,
    /// Absolute URL or path relative to the API base.
    pub target: String,
    /// Payload, ignored for DELETE.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<ActionBody>,
}

impl ActionDraft {
    /// Builds a CREATE draft.
    pub fn create(target: impl Into<String>, body: ActionBody) -> Self {
        Self {
            method: ActionMethod::Create,
            target: target.into(),
            body: Some(body),
        }
    }

    /// Builds an UPDATE draft.
    pub fn update(target: impl Into<String>, body: ActionBody) -> Self {
        Self {
            method: ActionMethod::Update,
            target: target.into(),
            body: Some(body),
        }
    }

    /// Builds a DELETE draft.
    pub fn delete(target: impl Into<String>) -> Self {
        Self {
            method: ActionMethod::Delete,
            target: target.into(),
            body: None,
        }
    }

    /// Drops a body that the verb cannot carry.
    pub(crate) fn normalized(mut self) -> Self {
        if !self.method.carries_body() && self.body.take().is_some() {
            tracing::debug!(target = %self.target, "dropping body from DELETE action");
        }
        self
    }
}

/// Immutable row of the durable queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedAction {
    /// Store-assigned id.
    pub id: ActionId,
    /// Action kind tag.
    pub kind: ActionKind,
    /// Mutation verb.
    pub method: ActionMethod,
    /// Resource the mutation applies to.
    pub target: String,
    /// Payload, absent for DELETE.
    pub body: Option<ActionBody>,
    /// Insertion timestamp; defines replay order.
    pub enqueued_at: TimestampMs,
    /// Replay attempts already made.
    pub attempts: u32,
}

impl QueuedAction {
    /// Replay order key: `enqueued_at`, ties broken by `id`.
    pub fn order_key(&self) -> (TimestampMs, ActionId) {
        (self.enqueued_at, self.id)
    }

    /// Draft that reproduces this action.
    pub fn to_draft(&self) -> ActionDraft {
        ActionDraft {
            method: self.method,
            target: self.target.clone(),
            body: self.body.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn delete_drafts_lose_their_body() {
        let mut draft = ActionDraft::delete("/tasks/9");
        draft.body = json!({"x": 1}).as_object().cloned();
        assert!(draft.normalized().body.is_none());

        let body = json!({"status": "en progreso"}).as_object().cloned().unwrap();
        let update = ActionDraft::update("/tasks/9", body.clone()).normalized();
        assert_eq!(update.body, Some(body));
    }

    #[test]
    fn draft_deserializes_caller_json() {
        let draft: ActionDraft = serde_json::from_value(json!({
            "method": "CREATE",
            "target": "/tasks/123/comments",
            "body": {"text": "hello"}
        }))
        .unwrap();
        assert_eq!(draft.method, ActionMethod::Create);
        assert_eq!(draft.body.unwrap()["text"], "hello");
    }
}
