//! Concurrency tests for the single-flight mutation guard
//!
//! These verify that two overlapping operations on the same entity
//! instance cannot both reach the payment gateway: the second call is
//! rejected with a busy error while the first is still in flight, and the
//! guard is free again once the first settles.

use std::sync::Arc;

use serde_json::json;

use studiopass_core::adapters::gateway_mock::ScriptedGateway;
use studiopass_core::adapters::memory::{
    InMemoryAuthProvider, InMemoryCatalog, InMemoryObjectStorage, InMemoryRecordStore,
    ScriptedImagePicker,
};
use studiopass_core::cache::KeyValueCache;
use studiopass_core::domain::AccountKind;
use studiopass_core::ports::{calls, RecordKey};
use studiopass_core::services::{AccountDeps, AccountEntity, OperationLimits};
use studiopass_core::{LivestreamKey, ScheduleClassDetails};

fn deps_with(
    store: Arc<InMemoryRecordStore>,
    gateway: Arc<ScriptedGateway>,
) -> AccountDeps {
    let catalog = Arc::new(InMemoryCatalog::new());
    AccountDeps {
        store,
        cache: Arc::new(KeyValueCache::new()),
        gateway,
        auth: Arc::new(InMemoryAuthProvider::new()),
        storage: Arc::new(InMemoryObjectStorage::new()),
        classes: catalog.clone(),
        gyms: catalog,
        picker: Arc::new(ScriptedImagePicker::cancelled()),
        limits: OperationLimits {
            poll_attempts: 3,
            poll_delay: std::time::Duration::from_millis(1),
            ..OperationLimits::default()
        },
        logger: None,
    }
}

fn seeded_member(store: &InMemoryRecordStore) {
    store.insert(
        RecordKey::new("users", "u1"),
        json!({ "first": "A", "last": "B", "scheduled_classes": [] })
            .as_object()
            .cloned()
            .unwrap(),
    );
}

async fn wait_for_call(gateway: &ScriptedGateway, name: &str) {
    for _ in 0..1000 {
        if gateway.call_count(name) > 0 {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("gateway call '{}' never happened", name);
}

#[tokio::test]
async fn test_second_call_fails_busy_while_first_in_flight() {
    let store = Arc::new(InMemoryRecordStore::new());
    let gateway = Arc::new(ScriptedGateway::new());
    seeded_member(&store);

    // Hold the first operation open inside its gateway call
    let gate = gateway.gate(calls::DOCUMENT_SCHEDULED_CLASS);

    let entity = Arc::new(AccountEntity::new(
        AccountKind::Member,
        "u1",
        deps_with(store, gateway.clone()),
    ));

    let first = {
        let entity = entity.clone();
        tokio::spawn(async move {
            entity
                .schedule_class(&ScheduleClassDetails {
                    class_id: "c1".to_string(),
                    time_id: "t1".to_string(),
                })
                .await
        })
    };
    wait_for_call(&gateway, calls::DOCUMENT_SCHEDULED_CLASS).await;

    // The first operation is parked inside the gateway; a second call on
    // the same instance must fail immediately, naming the in-flight op
    let err = entity
        .schedule_class(&ScheduleClassDetails {
            class_id: "c2".to_string(),
            time_id: "t2".to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.code(), "busy");
    assert!(err.to_string().contains("schedule_class"));

    // Release the gate; the first call completes normally
    gate.notify_one();
    first.await.unwrap().unwrap();

    // Only the first operation's gateway call ever happened
    assert_eq!(gateway.call_count(calls::DOCUMENT_SCHEDULED_CLASS), 1);

    // And the guard is free again afterwards (pre-store a permit so the
    // still-registered gate lets the call straight through)
    gate.notify_one();
    entity
        .schedule_class(&ScheduleClassDetails {
            class_id: "c2".to_string(),
            time_id: "t2".to_string(),
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_guard_released_after_failed_operation() {
    let store = Arc::new(InMemoryRecordStore::new());
    let gateway = Arc::new(ScriptedGateway::new());
    seeded_member(&store);
    gateway.fail_with(calls::DOCUMENT_SCHEDULED_CLASS, "backend down");

    let entity = AccountEntity::new(AccountKind::Member, "u1", deps_with(store, gateway.clone()));

    let details = ScheduleClassDetails {
        class_id: "c1".to_string(),
        time_id: "t1".to_string(),
    };
    let err = entity.schedule_class(&details).await.unwrap_err();
    assert_eq!(err.code(), "service_call");

    // The failure must not leave the entity locked: the retry gets through
    // to the gateway again (and fails the same way, not with Busy)
    let err = entity.schedule_class(&details).await.unwrap_err();
    assert_eq!(err.code(), "service_call");
    assert_eq!(gateway.call_count(calls::DOCUMENT_SCHEDULED_CLASS), 2);
}

#[tokio::test]
async fn test_livestream_ready_when_key_appears_during_polling() {
    let store = Arc::new(InMemoryRecordStore::new());
    let gateway = Arc::new(ScriptedGateway::new());
    store.insert(
        RecordKey::new("partners", "p1"),
        json!({ "first": "A", "last": "B" }).as_object().cloned().unwrap(),
    );

    let gate = gateway.gate(calls::CREATE_LIVESTREAM);
    let entity = Arc::new(AccountEntity::new(
        AccountKind::Partner,
        "p1",
        deps_with(store.clone(), gateway.clone()),
    ));

    let task = {
        let entity = entity.clone();
        tokio::spawn(async move { entity.create_livestream().await })
    };
    wait_for_call(&gateway, calls::CREATE_LIVESTREAM).await;

    // The backend assigns the key while the creation call is in flight
    store.insert(
        RecordKey::new("partners", "p1"),
        json!({ "first": "A", "last": "B", "stream_key": "sk_123" })
            .as_object()
            .cloned()
            .unwrap(),
    );
    gate.notify_one();

    let result = task.await.unwrap().unwrap();
    assert_eq!(result, LivestreamKey::Ready("sk_123".to_string()));
}

#[tokio::test]
async fn test_livestream_pending_when_key_never_appears() {
    let store = Arc::new(InMemoryRecordStore::new());
    let gateway = Arc::new(ScriptedGateway::new());
    store.insert(
        RecordKey::new("partners", "p1"),
        json!({}).as_object().cloned().unwrap(),
    );

    let entity = AccountEntity::new(
        AccountKind::Partner,
        "p1",
        deps_with(store, gateway.clone()),
    );

    // Exhausting the polling bound yields Pending, not an error
    let result = entity.create_livestream().await.unwrap();
    assert_eq!(result, LivestreamKey::Pending);
    assert_eq!(gateway.call_count(calls::CREATE_LIVESTREAM), 1);
}

#[tokio::test]
async fn test_existing_stream_key_returns_without_creation_call() {
    let store = Arc::new(InMemoryRecordStore::new());
    let gateway = Arc::new(ScriptedGateway::new());
    store.insert(
        RecordKey::new("partners", "p1"),
        json!({ "stream_key": "sk_old" }).as_object().cloned().unwrap(),
    );

    let entity = AccountEntity::new(
        AccountKind::Partner,
        "p1",
        deps_with(store, gateway.clone()),
    );

    let result = entity.create_livestream().await.unwrap();
    assert_eq!(result, LivestreamKey::Ready("sk_old".to_string()));
    assert_eq!(gateway.total_calls(), 0);
}
