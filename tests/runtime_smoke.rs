use std::{
    sync::{
        Arc, Mutex,
        atomic::Ordering,
    },
    time::Duration,
};

use girasol_sync::{
    config::SyncConfig,
    persist::{memory::MemoryActionStore, sqlite::SqliteActionStore},
    queue::ActionQueue,
    replay::{ReplayRequest, Transport, TransportError, drainer::Drainer},
    runtime::{
        events::SyncOutcome,
        handle::{RuntimeError, WakeSource, spawn_sync_worker},
    },
    sync::{Unsupported, manager::SyncManager},
    types::ActionMethod,
};

#[derive(Clone, Default)]
struct Recorder {
    urls: Arc<Mutex<Vec<String>>>,
}

impl Transport for Recorder {
    async fn send(&self, request: ReplayRequest) -> Result<u16, TransportError> {
        self.urls.lock().expect("lock").push(request.url.to_string());
        Ok(204)
    }
}

fn config() -> SyncConfig {
    SyncConfig {
        api_base: Some("http://girasol.local/".to_string()),
        ..SyncConfig::default()
    }
}

async fn wait_for_finish(
    sub: &mut tokio::sync::broadcast::Receiver<SyncOutcome>,
) -> Vec<SyncOutcome> {
    let mut seen = Vec::new();
    loop {
        let evt = tokio::time::timeout(Duration::from_secs(2), sub.recv())
            .await
            .expect("outcome timeout")
            .expect("recv");
        let done = matches!(evt, SyncOutcome::DrainFinished { .. });
        seen.push(evt);
        if done {
            return seen;
        }
    }
}

#[tokio::test]
async fn enqueue_wakes_the_worker_through_background_sync() {
    let cfg = config();
    let (manager, wake_rx) = SyncManager::new();
    let manager = Arc::new(manager);
    let queue = ActionQueue::new(MemoryActionStore::new(), manager.clone());

    let recorder = Recorder::default();
    let drainer = Drainer::new(queue.clone(), recorder.clone(), &cfg).expect("drainer");
    let handle = spawn_sync_worker(
        drainer,
        Some(WakeSource::new(manager.clone(), wake_rx)),
        &cfg,
    );
    let mut sub = handle.subscribe();

    let id = queue
        .enqueue(ActionMethod::Delete, "tasks/77", None)
        .await
        .expect("enqueue");

    let seen = wait_for_finish(&mut sub).await;
    assert!(seen.contains(&SyncOutcome::Replayed { id, status: 204 }));
    assert_eq!(
        *recorder.urls.lock().expect("lock"),
        vec!["http://girasol.local/tasks/77".to_string()]
    );
    assert!(manager.pending_tags().is_empty());
    assert_eq!(queue.pending().await.expect("pending"), 0);

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn unsupported_host_enqueues_and_drains_on_flush() {
    let cfg = config();
    let store = SqliteActionStore::open_in_memory().expect("open");
    let queue = ActionQueue::new(store, Arc::new(Unsupported));

    let recorder = Recorder::default();
    let drainer = Drainer::new(queue.clone(), recorder.clone(), &cfg).expect("drainer");
    let handle = spawn_sync_worker(drainer, None, &cfg);

    queue
        .enqueue(ActionMethod::Delete, "tasks/1", None)
        .await
        .expect("enqueue despite missing background sync");
    queue
        .enqueue(ActionMethod::Delete, "tasks/2", None)
        .await
        .expect("enqueue");

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(recorder.urls.lock().expect("lock").is_empty());
    assert_eq!(queue.pending().await.expect("pending"), 2);

    let report = handle.flush().await.expect("flush");
    assert_eq!(report.succeeded, 2);
    assert_eq!(recorder.urls.lock().expect("lock").len(), 2);

    let again = handle.flush().await.expect("flush");
    assert_eq!(again.attempted, 0);

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn handle_reports_closed_after_shutdown() {
    let cfg = config();
    let queue = ActionQueue::new(MemoryActionStore::new(), Arc::new(Unsupported));
    let drainer = Drainer::new(queue, Recorder::default(), &cfg).expect("drainer");
    let handle = spawn_sync_worker(drainer, None, &cfg);

    handle.shutdown().await.expect("shutdown");
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(matches!(handle.flush().await, Err(RuntimeError::ChannelClosed)));
}

#[tokio::test]
async fn failed_wake_up_is_registered_again_after_the_delay() {
    let cfg = SyncConfig {
        retry_delay_ms: 20,
        ..config()
    };
    let (manager, wake_rx) = SyncManager::new();
    let manager = Arc::new(manager);
    let store = MemoryActionStore::new();
    let online = store.availability();
    let queue = ActionQueue::from_config(store, manager.clone(), &cfg);

    let id = queue
        .enqueue(ActionMethod::Delete, "tasks/5", None)
        .await
        .expect("enqueue");
    online.store(false, Ordering::SeqCst);

    let recorder = Recorder::default();
    let drainer = Drainer::new(queue.clone(), recorder.clone(), &cfg).expect("drainer");
    let mut sub = drainer.subscribe();
    let handle = spawn_sync_worker(
        drainer,
        Some(WakeSource::new(manager.clone(), wake_rx)),
        &cfg,
    );

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(recorder.urls.lock().expect("lock").is_empty());

    online.store(true, Ordering::SeqCst);
    let seen = wait_for_finish(&mut sub).await;
    assert!(seen.contains(&SyncOutcome::Replayed { id, status: 204 }));
    assert_eq!(
        *recorder.urls.lock().expect("lock"),
        vec!["http://girasol.local/tasks/5".to_string()]
    );

    handle.shutdown().await.expect("shutdown");
}
