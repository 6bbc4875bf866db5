// Deferred re-lock behavior

use crate::common::*;
use cabinet_access::core::models::{ActionKind, ItemStatus};
use cabinet_access::orchestrator::BatchAccessOrchestrator;
use cabinet_access::store::MemoryStore;
use mockito::{Matcher, Server};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[tokio::test]
async fn test_each_success_gets_one_auto_lock_record() {
    let store = Arc::new(MemoryStore::new());
    store.add_item(item("f1", "EMP001", ItemStatus::Available, 1, 1)).await;
    store.add_item(item("f2", "EMP001", ItemStatus::Retrieved, 2, 3)).await;
    let orchestrator = orchestrator(disconnected_link().await, store.clone());

    let report = orchestrator.process_scan("EMP001").await.unwrap();
    wait_for_relocks().await;

    let relocks = auto_lock_records(&store).await;
    assert_eq!(relocks.len(), report.successes.len());
    assert!(relocks.iter().all(|r| r.success && r.identity == "EMP001"));

    let mut relocked: Vec<_> = relocks.iter().map(|r| r.item_id.clone().unwrap()).collect();
    relocked.sort();
    assert_eq!(relocked, vec!["f1", "f2"]);
    let f2 = relocks.iter().find(|r| r.item_id.as_deref() == Some("f2")).unwrap();
    assert_eq!((f2.compartment.row, f2.compartment.column), (2, 3));
}

#[tokio::test]
async fn test_failed_unlock_schedules_no_relock() {
    let mut server = Server::new_async().await;
    let (link, _health) = connected_link(&mut server).await;
    let _ok = server
        .mock("POST", "/unlock")
        .match_body(Matcher::PartialJson(json!({ "row": 1 })))
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;
    let _jammed = server
        .mock("POST", "/unlock")
        .match_body(Matcher::PartialJson(json!({ "row": 2 })))
        .with_status(500)
        .with_body(json!({ "message": "Door jammed" }).to_string())
        .create_async()
        .await;
    let lock = server
        .mock("POST", "/lock")
        .match_body(Matcher::PartialJson(json!({ "command": "lock", "row": 1 })))
        .with_status(200)
        .with_body("{}")
        .expect(1)
        .create_async()
        .await;

    let store = Arc::new(MemoryStore::new());
    store.add_item(item("f1", "EMP002", ItemStatus::Available, 1, 1)).await;
    store.add_item(item("f2", "EMP002", ItemStatus::Retrieved, 2, 2)).await;
    let orchestrator = orchestrator(link, store.clone());

    orchestrator.process_scan("EMP002").await.unwrap();
    wait_for_relocks().await;

    lock.assert_async().await;
    let relocks = auto_lock_records(&store).await;
    assert_eq!(relocks.len(), 1);
    assert_eq!(relocks[0].item_id.as_deref(), Some("f1"));
}

#[tokio::test]
async fn test_failed_relock_is_recorded_not_retried() {
    let mut server = Server::new_async().await;
    let (link, _health) = connected_link(&mut server).await;
    let _unlock = server
        .mock("POST", "/unlock")
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;
    let lock = server
        .mock("POST", "/lock")
        .with_status(500)
        .with_body(json!({ "message": "Solenoid fault" }).to_string())
        .expect(1)
        .create_async()
        .await;

    let store = Arc::new(MemoryStore::new());
    store.add_item(item("f1", "EMP003", ItemStatus::Available, 1, 1)).await;
    let orchestrator = orchestrator(link, store.clone());

    let report = orchestrator.process_scan("EMP003").await.unwrap();
    wait_for_relocks().await;

    assert!(report.success);
    lock.assert_async().await;
    let relocks = auto_lock_records(&store).await;
    assert_eq!(relocks.len(), 1);
    assert!(!relocks[0].success);
    assert!(relocks[0].note.contains("Solenoid fault"));
    // The item keeps its new status
    assert_eq!(store.item("f1").await.unwrap().status, ItemStatus::Retrieved);
}

#[tokio::test]
async fn test_relock_does_not_delay_the_report() {
    let store = Arc::new(MemoryStore::new());
    store.add_item(item("f1", "EMP004", ItemStatus::Available, 1, 1)).await;
    let orchestrator = BatchAccessOrchestrator::new(
        disconnected_link().await,
        store.clone(),
        store.clone(),
        store.clone(),
    )
    .with_relock_delay(Duration::from_secs(2));

    let start = Instant::now();
    let report = orchestrator.process_scan("EMP004").await.unwrap();

    assert!(start.elapsed() < Duration::from_secs(1));
    assert!(report.success);
    assert!(auto_lock_records(&store).await.is_empty());
}

#[tokio::test]
async fn test_relock_fires_even_after_status_changed_again() {
    let store = Arc::new(MemoryStore::new());
    store.add_item(item("f1", "EMP005", ItemStatus::Available, 1, 1)).await;
    let orchestrator = BatchAccessOrchestrator::new(
        disconnected_link().await,
        store.clone(),
        store.clone(),
        store.clone(),
    )
    .with_relock_delay(Duration::from_millis(200));

    orchestrator.process_scan("EMP005").await.unwrap();
    // Returned before the first re-lock fires
    orchestrator.process_scan("EMP005").await.unwrap();
    assert_eq!(store.item("f1").await.unwrap().status, ItemStatus::Available);

    tokio::time::sleep(Duration::from_millis(600)).await;

    let relocks = auto_lock_records(&store).await;
    assert_eq!(relocks.len(), 2);
    let scan_actions: Vec<_> = scan_records(&store).await.into_iter().map(|r| r.action).collect();
    assert_eq!(scan_actions, vec![ActionKind::Pickup, ActionKind::Return]);
}
