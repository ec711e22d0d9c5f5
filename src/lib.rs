//! Durable offline action queue with background-sync replay.
//!
//! Mutations the application cannot send right away are appended to a local
//! SQLite queue. The host's background-sync facility later wakes a detached
//! worker that drains the queue and replays each action over HTTP, in
//! enqueue order.
//!
//! # Examples
//!
//! Queue-only usage with the in-memory store:
//! ```
//! use std::sync::Arc;
//!
//! use girasol_sync::{
//!     action::ActionDraft,
//!     persist::memory::MemoryActionStore,
//!     queue::ActionQueue,
//!     sync::Unsupported,
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let queue = ActionQueue::new(MemoryActionStore::new(), Arc::new(Unsupported));
//! let id = queue
//!     .enqueue_action(ActionDraft::delete("/tasks/123"))
//!     .await
//!     .expect("enqueue");
//! assert_eq!(id, 1);
//! let drained = queue.drain_all().await.expect("drain");
//! assert_eq!(drained.len(), 1);
//! # }
//! ```
//!
//! Full wiring with SQLite, background sync and HTTP replay:
//! ```no_run
//! use std::sync::Arc;
//!
//! use girasol_sync::{
//!     config::SyncConfig,
//!     persist::sqlite::SqliteActionStore,
//!     queue::ActionQueue,
//!     replay::{drainer::Drainer, http::HttpTransport},
//!     runtime::handle::{WakeSource, spawn_sync_worker},
//!     sync::manager::SyncManager,
//!     types::ActionMethod,
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let config = SyncConfig {
//!     api_base: Some("https://girasol.example/api/".to_string()),
//!     ..SyncConfig::default()
//! };
//! let (manager, wake_rx) = SyncManager::new();
//! let manager = Arc::new(manager);
//! let store = SqliteActionStore::open("actions.db").expect("open sqlite");
//! let queue = ActionQueue::from_config(store, manager.clone(), &config);
//!
//! let transport = HttpTransport::new(&config).expect("client");
//! let drainer = Drainer::new(queue.clone(), transport, &config).expect("drainer");
//! let worker = spawn_sync_worker(drainer, Some(WakeSource::new(manager, wake_rx)), &config);
//!
//! queue.enqueue(ActionMethod::Delete, "tasks/123", None).await.expect("enqueue");
//! worker.shutdown().await.expect("shutdown");
//! # }
//! ```

/// Queued action model and caller drafts.
pub mod action;
/// Drainer and worker configuration.
pub mod config;
/// Storage trait with SQLite and in-memory implementations.
pub mod persist;
/// Durable queue handle used by the application and the drainer.
pub mod queue;
/// Replay requests, transports and the drainer.
pub mod replay;
/// Detached worker and outcome events.
pub mod runtime;
/// Host background-sync registration.
pub mod sync;
/// Shared primitive types and enums.
pub mod types;
