// Manual actuation, link management and audit listing

use crate::common::*;
use cabinet_access::core::errors::AccessError;
use cabinet_access::core::models::{ActionKind, ActuationStatus, Compartment, ItemStatus, LinkDetail};
use cabinet_access::hardware::LinkAddress;
use cabinet_access::orchestrator::BatchAccessOrchestrator;
use cabinet_access::store::MemoryStore;
use mockito::Server;
use serde_json::json;
use std::sync::Arc;

fn compartment() -> Compartment {
    Compartment { row: 4, column: 2, shelf: None }
}

#[tokio::test]
async fn test_manual_unlock_with_identity_is_audited() {
    let store = Arc::new(MemoryStore::new());
    let orchestrator = orchestrator(disconnected_link().await, store.clone());

    let result = orchestrator.manual_unlock(compartment(), Some("ADMIN01")).await.unwrap();

    assert_eq!(result.status, ActuationStatus::Simulated);
    let records = store.records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].action, ActionKind::ManualUnlock);
    assert_eq!(records[0].identity, "ADMIN01");
    assert!(records[0].item_id.is_none());
    assert!(records[0].success);
}

#[tokio::test]
async fn test_manual_actuation_without_identity_is_not_audited() {
    let store = Arc::new(MemoryStore::new());
    let orchestrator = orchestrator(disconnected_link().await, store.clone());

    orchestrator.manual_unlock(compartment(), None).await.unwrap();
    orchestrator.manual_lock(compartment(), Some("  ")).await.unwrap();

    assert!(store.records().await.is_empty());
}

#[tokio::test]
async fn test_manual_unlock_failure_is_audited_and_returned() {
    let mut server = Server::new_async().await;
    let (link, _health) = connected_link(&mut server).await;
    let _unlock = server
        .mock("POST", "/unlock")
        .with_status(500)
        .with_body(json!({ "message": "Door jammed" }).to_string())
        .create_async()
        .await;
    let store = Arc::new(MemoryStore::new());
    let orchestrator = orchestrator(link, store.clone());

    let result = orchestrator.manual_unlock(compartment(), Some("ADMIN01")).await;

    assert_eq!(result, Err(AccessError::HardwareRejected("Door jammed".to_string())));
    let records = store.records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].action, ActionKind::ManualUnlockFailed);
    assert!(!records[0].success);
}

#[tokio::test]
async fn test_manual_lock_is_audited() {
    let mut server = Server::new_async().await;
    let (link, _health) = connected_link(&mut server).await;
    let lock = server
        .mock("POST", "/lock")
        .with_status(200)
        .with_body(json!({ "message": "Locked" }).to_string())
        .create_async()
        .await;
    let store = Arc::new(MemoryStore::new());
    let orchestrator = orchestrator(link, store.clone());

    let result = orchestrator.manual_lock(compartment(), Some("ADMIN01")).await.unwrap();

    lock.assert_async().await;
    assert_eq!(result.status, ActuationStatus::Success);
    assert_eq!(result.message, "Locked");
    assert_eq!(store.records().await[0].action, ActionKind::ManualLock);
}

#[tokio::test]
async fn test_reconfigure_link_to_unreachable_host() {
    let mut server = Server::new_async().await;
    let (link, _health) = connected_link(&mut server).await;
    let orchestrator = orchestrator(link, Arc::new(MemoryStore::new()));

    let connected = orchestrator
        .reconfigure_link(LinkAddress::new("127.0.0.1", 1))
        .await;
    let status = orchestrator.link_status().await;

    assert!(!connected);
    assert!(!status.connected);
    assert_eq!(status.detail, LinkDetail::Disconnected { simulation: true });
}

#[tokio::test]
async fn test_audit_log_filters_and_limits() {
    let store = Arc::new(MemoryStore::new());
    store.add_item(item("f1", "EMP001", ItemStatus::Available, 1, 1)).await;
    store.add_item(item("f2", "EMP002", ItemStatus::Available, 1, 2)).await;
    let orchestrator = BatchAccessOrchestrator::new(
        disconnected_link().await,
        store.clone(),
        store.clone(),
        store.clone(),
    )
    .with_relock_delay(std::time::Duration::from_secs(30));

    orchestrator.process_scan("EMP001").await.unwrap();
    orchestrator.process_scan("EMP002").await.unwrap();
    orchestrator.manual_lock(compartment(), Some("EMP001")).await.unwrap();

    let mine = orchestrator.audit_log(None, Some("EMP001")).await.unwrap();
    assert_eq!(mine.len(), 2);
    assert_eq!(mine[0].action, ActionKind::ManualLock);
    assert_eq!(mine[1].action, ActionKind::Pickup);

    let latest = orchestrator.audit_log(Some(1), None).await.unwrap();
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0].action, ActionKind::ManualLock);
}

#[tokio::test]
async fn test_broken_ledger_fails_items_but_not_the_scan() {
    let store = Arc::new(MemoryStore::new());
    store.add_item(item("f1", "EMP006", ItemStatus::Available, 1, 1)).await;
    let orchestrator = BatchAccessOrchestrator::new(
        disconnected_link().await,
        store.clone(),
        store.clone(),
        Arc::new(BrokenLedger),
    )
    .with_relock_delay(RELOCK_DELAY);

    let report = orchestrator.process_scan("EMP006").await.unwrap();
    wait_for_relocks().await;

    assert_eq!(report.failures.len(), 1);
    let error = report.failures[0].error.as_deref().unwrap();
    assert!(error.contains("status updated to RETRIEVED"));
    assert!(error.contains("audit write failed"));
    // The transition is kept
    assert_eq!(store.item("f1").await.unwrap().status, ItemStatus::Retrieved);
    assert!(orchestrator.audit_log(None, None).await.is_err());
    assert!(orchestrator.ledger_ping().await.is_err());
}
