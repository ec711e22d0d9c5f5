//! SQLite-backed durable action queue.

use std::path::Path;
use std::time::Duration;

use rusqlite::{Connection, Row, TransactionBehavior, params, types::Value};

use crate::{
    action::{ActionBody, ActionDraft, QueuedAction},
    types::{ActionId, ActionKind, ActionMethod, TimestampMs},
};

use super::{ActionStore, PersistError, PersistResult};

/// SQLite implementation of [`crate::persist::ActionStore`].
///
/// Several instances may open the same file; the enqueue side and the
/// background drainer coordinate only through it.
pub struct SqliteActionStore {
    conn: Connection,
}

/// Column values exactly as stored, before validation.
///
/// Column affinity does not stop a row from holding any storage class, so
/// every column except the rowid is read untyped and checked in `decode`.
struct RawRow {
    id: i64,
    kind: Value,
    method: Value,
    target: Value,
    body: Value,
    enqueued_at: Value,
    attempts: Value,
}

impl RawRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            kind: row.get(1)?,
            method: row.get(2)?,
            target: row.get(3)?,
            body: row.get(4)?,
            enqueued_at: row.get(5)?,
            attempts: row.get(6)?,
        })
    }

    fn decode(self) -> PersistResult<QueuedAction> {
        let id = self.id as ActionId;
        let corrupted = |reason: String| PersistError::Corrupted { id, reason };

        let kind = match self.kind {
            Value::Text(raw) => ActionKind::parse(&raw)
                .ok_or_else(|| corrupted(format!("unknown kind {raw:?}")))?,
            other => return Err(corrupted(format!("kind is {}", other.data_type()))),
        };
        let method = match self.method {
            Value::Text(raw) => ActionMethod::parse(&raw)
                .ok_or_else(|| corrupted(format!("unknown method {raw:?}")))?,
            other => return Err(corrupted(format!("method is {}", other.data_type()))),
        };
        let target = match self.target {
            Value::Text(raw) => raw,
            other => return Err(corrupted(format!("target is {}", other.data_type()))),
        };
        let body = match self.body {
            Value::Null => None,
            Value::Text(raw) => Some(
                serde_json::from_str::<ActionBody>(&raw)
                    .map_err(|e| corrupted(format!("body decode failed: {e}")))?,
            ),
            other => return Err(corrupted(format!("body is {}", other.data_type()))),
        };
        let enqueued_at = match self.enqueued_at {
            Value::Integer(ts) => TimestampMs::try_from(ts)
                .map_err(|_| corrupted(format!("negative enqueued_at {ts}")))?,
            other => return Err(corrupted(format!("enqueued_at is {}", other.data_type()))),
        };
        let attempts = match self.attempts {
            Value::Integer(n) => u32::try_from(n)
                .map_err(|_| corrupted(format!("attempts out of range: {n}")))?,
            other => return Err(corrupted(format!("attempts is {}", other.data_type()))),
        };

        Ok(QueuedAction {
            id,
            kind,
            method,
            target,
            body,
            enqueued_at,
            attempts,
        })
    }
}

impl SqliteActionStore {
    /// Opens or creates the queue database at `path`.
    ///
    /// Enables WAL mode, sets `synchronous=NORMAL` and a 5s busy timeout.
    pub fn open(path: impl AsRef<Path>) -> PersistResult<Self> {
        let conn = Connection::open(path)?;
        Self::init_connection(conn)
    }

    /// Opens an in-memory SQLite queue.
    pub fn open_in_memory() -> PersistResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_connection(conn)
    }

    fn init_connection(conn: Connection) -> PersistResult<Self> {
        // Other connections (page side, drainer) may hold the write lock.
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(include_str!("schema.sql"))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Ok(Self { conn })
    }

    /// Returns pending actions in replay order without removing them.
    pub fn peek_all(&self) -> PersistResult<Vec<QueuedAction>> {
        let mut stmt = self.conn.prepare(SELECT_ORDERED)?;
        let rows = stmt.query_map([], RawRow::from_row)?;

        let mut out = Vec::new();
        for row in rows {
            match row?.decode() {
                Ok(action) => out.push(action),
                Err(err) => tracing::warn!(error = %err, "skipping corrupted queued action"),
            }
        }
        Ok(out)
    }

    fn insert(
        &mut self,
        draft: &ActionDraft,
        enqueued_at: TimestampMs,
        attempts: u32,
    ) -> PersistResult<ActionId> {
        let enqueued_at = i64::try_from(enqueued_at)
            .map_err(|_| PersistError::TimestampOutOfRange(enqueued_at))?;
        let body = match &draft.body {
            Some(body) if draft.method.carries_body() => Some(serde_json::to_string(body)?),
            _ => None,
        };

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO actions(kind, method, target, body, enqueued_at, attempts)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                ActionKind::RemoteCall.as_str(),
                draft.method.as_str(),
                draft.target,
                body,
                enqueued_at,
                attempts,
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(id as ActionId)
    }
}

const SELECT_ORDERED: &str = "SELECT id, kind, method, target, body, enqueued_at, attempts
     FROM actions ORDER BY enqueued_at ASC, id ASC";

impl ActionStore for SqliteActionStore {
    fn append(&mut self, draft: &ActionDraft, enqueued_at: TimestampMs) -> PersistResult<ActionId> {
        self.insert(draft, enqueued_at, 0)
    }

    fn drain_all(&mut self) -> PersistResult<Vec<QueuedAction>> {
        // IMMEDIATE takes the write lock up front so a concurrent drainer on
        // the same file waits and then sees an empty table.
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let raw = {
            let mut stmt = tx.prepare(SELECT_ORDERED)?;
            let rows = stmt.query_map([], RawRow::from_row)?;
            let mut raw = Vec::new();
            for row in rows {
                raw.push(row?);
            }
            raw
        };
        tx.execute("DELETE FROM actions", [])?;
        tx.commit()?;

        let mut out = Vec::with_capacity(raw.len());
        for row in raw {
            match row.decode() {
                Ok(action) => out.push(action),
                Err(err) => tracing::warn!(error = %err, "dropping corrupted queued action"),
            }
        }
        Ok(out)
    }

    fn requeue(&mut self, action: &QueuedAction) -> PersistResult<ActionId> {
        self.insert(&action.to_draft(), action.enqueued_at, action.attempts)
    }

    fn len(&self) -> PersistResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM actions", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
