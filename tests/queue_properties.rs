use std::sync::{Arc, atomic::Ordering};

use proptest::prelude::*;

use girasol_sync::{
    action::ActionDraft,
    persist::{ActionStore, memory::MemoryActionStore, sqlite::SqliteActionStore},
    queue::{ActionQueue, QueueError},
    sync::Unsupported,
    types::{ActionId, ActionMethod, TimestampMs},
};

fn draft_for(n: usize) -> ActionDraft {
    match n % 3 {
        0 => ActionDraft::delete(format!("/tasks/{n}")),
        1 => ActionDraft::update(
            format!("/tasks/{n}"),
            serde_json::json!({"n": n}).as_object().cloned().expect("object"),
        ),
        _ => ActionDraft::create(
            format!("/tasks/{n}/comments"),
            serde_json::json!({"text": format!("c{n}")}).as_object().cloned().expect("object"),
        ),
    }
}

fn check_drain_order(store: &mut dyn ActionStore, stamps: &[u16]) -> Result<(), TestCaseError> {
    let mut expected: Vec<(TimestampMs, ActionId)> = Vec::new();
    for (n, ts) in stamps.iter().enumerate() {
        let id = store
            .append(&draft_for(n), TimestampMs::from(*ts))
            .expect("append");
        expected.push((TimestampMs::from(*ts), id));
    }
    expected.sort();

    let drained = store.drain_all().expect("drain");
    let got: Vec<_> = drained.iter().map(|a| a.order_key()).collect();
    prop_assert_eq!(got, expected);
    prop_assert!(store.drain_all().expect("drain again").is_empty());
    prop_assert_eq!(store.len().expect("len"), 0);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn memory_drain_is_ordered_by_timestamp_then_id(stamps in prop::collection::vec(0u16..50, 0..40)) {
        let mut store = MemoryActionStore::new();
        check_drain_order(&mut store, &stamps)?;
    }

    #[test]
    fn sqlite_drain_is_ordered_by_timestamp_then_id(stamps in prop::collection::vec(0u16..50, 0..40)) {
        let mut store = SqliteActionStore::open_in_memory().expect("open");
        check_drain_order(&mut store, &stamps)?;
    }
}

#[tokio::test]
async fn n_enqueues_drain_in_enqueue_order() {
    let queue = ActionQueue::new(MemoryActionStore::new(), Arc::new(Unsupported));
    let mut ids = Vec::new();
    for n in 0..50 {
        ids.push(queue.enqueue_action(draft_for(n)).await.expect("enqueue"));
    }

    let drained = queue.drain_all().await.expect("drain");
    assert_eq!(drained.iter().map(|a| a.id).collect::<Vec<_>>(), ids);
    assert!(drained.windows(2).all(|w| w[0].enqueued_at <= w[1].enqueued_at));
    assert!(queue.drain_all().await.expect("drain again").is_empty());
}

#[tokio::test]
async fn enqueue_on_unavailable_store_fails_and_keeps_existing_actions() {
    let store = MemoryActionStore::new();
    let switch = store.availability();
    let queue = ActionQueue::new(store, Arc::new(Unsupported));

    queue
        .enqueue(ActionMethod::Delete, "/tasks/1", None)
        .await
        .expect("enqueue");

    switch.store(false, Ordering::SeqCst);
    let err = queue
        .enqueue(ActionMethod::Delete, "/tasks/2", None)
        .await
        .expect_err("store is off");
    assert!(matches!(err, QueueError::StorageUnavailable(_)));

    switch.store(true, Ordering::SeqCst);
    let drained = queue.drain_all().await.expect("drain");
    assert_eq!(drained.len(), 1);
    assert_eq!(drained[0].target, "/tasks/1");
}

#[tokio::test]
async fn delete_actions_never_store_a_body() {
    let queue = ActionQueue::new(MemoryActionStore::new(), Arc::new(Unsupported));
    queue
        .enqueue(
            ActionMethod::Delete,
            "/tasks/4",
            serde_json::json!({"reason": "dup"}).as_object().cloned(),
        )
        .await
        .expect("enqueue");

    let drained = queue.drain_all().await.expect("drain");
    assert!(drained[0].body.is_none());
}
