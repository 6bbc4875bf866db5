// Unit tests for the lock controller link

use crate::common::*;
use cabinet_access::core::errors::AccessError;
use cabinet_access::core::models::{ActuationStatus, Compartment, LinkDetail};
use cabinet_access::hardware::{HardwareLinkController, LinkAddress};
use mockito::{Matcher, Server};
use serde_json::json;
use std::io::Write;
use std::time::Duration;

fn compartment(row: u32, column: u32) -> Compartment {
    Compartment { row, column, shelf: None }
}

#[tokio::test]
async fn test_probe_success_marks_connected() {
    let mut server = Server::new_async().await;
    let (link, health) = connected_link(&mut server).await;

    assert!(link.is_connected().await);
    health.assert_async().await;
}

#[tokio::test]
async fn test_unhealthy_controller_is_simulated_without_network() {
    let mut server = Server::new_async().await;
    let _health = server
        .mock("GET", "/health")
        .with_status(503)
        .create_async()
        .await;
    let unlock = server
        .mock("POST", "/unlock")
        .expect(0)
        .create_async()
        .await;
    let lock = server.mock("POST", "/lock").expect(0).create_async().await;

    let link = HardwareLinkController::connect(address_of(&server), test_settings())
        .await
        .unwrap();
    assert!(!link.is_connected().await);

    let unlocked = link.unlock(compartment(1, 4)).await.unwrap();
    let locked = link.lock(compartment(1, 4)).await.unwrap();

    assert_eq!(unlocked.status, ActuationStatus::Simulated);
    assert_eq!(locked.status, ActuationStatus::Simulated);
    assert_eq!(locked.message, "Simulated lock for Row 1, Column 4");
    unlock.assert_async().await;
    lock.assert_async().await;
}

#[tokio::test]
async fn test_connected_unlock_sends_command() {
    let mut server = Server::new_async().await;
    let (link, _health) = connected_link(&mut server).await;
    let unlock = server
        .mock("POST", "/unlock")
        .match_body(Matcher::PartialJson(json!({
            "command": "unlock",
            "row": 2,
            "column": 3
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "message": "Door 2-3 open", "relay": 7 }).to_string())
        .create_async()
        .await;

    let result = link.unlock(compartment(2, 3)).await.unwrap();

    unlock.assert_async().await;
    assert_eq!(result.status, ActuationStatus::Success);
    assert_eq!(result.message, "Door 2-3 open");
    assert_eq!(result.compartment, compartment(2, 3));
    let raw = result.controller_response.unwrap();
    assert_eq!(raw["relay"], 7);
}

#[tokio::test]
async fn test_connected_lock_uses_default_message() {
    let mut server = Server::new_async().await;
    let (link, _health) = connected_link(&mut server).await;
    let _lock = server
        .mock("POST", "/lock")
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let result = link.lock(compartment(1, 1)).await.unwrap();
    assert_eq!(result.status, ActuationStatus::Success);
    assert_eq!(result.message, "Door locked successfully");
}

#[tokio::test]
async fn test_rejected_command_keeps_connectivity() {
    let mut server = Server::new_async().await;
    let (link, _health) = connected_link(&mut server).await;
    let _unlock = server
        .mock("POST", "/unlock")
        .with_status(500)
        .with_body(json!({ "message": "Door jammed" }).to_string())
        .create_async()
        .await;

    let result = link.unlock(compartment(1, 1)).await;

    assert_eq!(result, Err(AccessError::HardwareRejected("Door jammed".to_string())));
    assert!(link.is_connected().await);
}

#[tokio::test]
async fn test_rejection_without_message_reports_status() {
    let mut server = Server::new_async().await;
    let (link, _health) = connected_link(&mut server).await;
    let _unlock = server
        .mock("POST", "/unlock")
        .with_status(409)
        .with_body("busy")
        .create_async()
        .await;

    match link.unlock(compartment(1, 1)).await {
        Err(AccessError::HardwareRejected(reason)) => assert!(reason.contains("409")),
        other => panic!("Expected HardwareRejected, got {:?}", other),
    }
}

#[tokio::test]
async fn test_timeout_downgrades_to_simulation() {
    let mut server = Server::new_async().await;
    let (link, _health) = connected_link(&mut server).await;
    let _unlock = server
        .mock("POST", "/unlock")
        .with_status(200)
        .with_chunked_body(|w| {
            std::thread::sleep(Duration::from_millis(1200));
            w.write_all(b"{}")
        })
        .create_async()
        .await;

    let result = link.unlock(compartment(3, 3)).await;

    assert!(matches!(result, Err(AccessError::HardwareUnreachable(_))));
    assert!(!link.is_connected().await);

    // Next call is answered locally
    let next = link.unlock(compartment(3, 3)).await.unwrap();
    assert_eq!(next.status, ActuationStatus::Simulated);
}

#[tokio::test]
async fn test_status_connected_returns_controller_payload() {
    let mut server = Server::new_async().await;
    let (link, _health) = connected_link(&mut server).await;
    let _status = server
        .mock("GET", "/status")
        .with_status(200)
        .with_body(json!({ "uptime": 120, "doors": 24 }).to_string())
        .create_async()
        .await;

    let status = link.status().await;

    assert!(status.connected);
    match status.detail {
        LinkDetail::Connected { controller_status } => assert_eq!(controller_status["doors"], 24),
        other => panic!("Expected Connected, got {:?}", other),
    }
}

#[tokio::test]
async fn test_failed_status_check_disconnects() {
    let mut server = Server::new_async().await;
    let (link, _health) = connected_link(&mut server).await;
    let _status = server
        .mock("GET", "/status")
        .with_status(500)
        .create_async()
        .await;

    let status = link.status().await;

    assert!(!status.connected);
    assert!(matches!(status.detail, LinkDetail::Error { .. }));
    assert!(!link.is_connected().await);
}

#[tokio::test]
async fn test_reconfigure_to_unreachable_host_reports_disconnected() {
    let mut server = Server::new_async().await;
    let (link, _health) = connected_link(&mut server).await;

    let connected = link.reconfigure(LinkAddress::new("127.0.0.1", 1)).await;
    let status = link.status().await;

    assert!(!connected);
    assert!(!status.connected);
    assert_eq!(status.address, "http://127.0.0.1:1");
    assert_eq!(status.detail, LinkDetail::Disconnected { simulation: true });
}

#[tokio::test]
async fn test_reconfigure_to_reachable_host_reconnects() {
    let mut server = Server::new_async().await;
    let _health = mock_health(&mut server).await;
    let link = disconnected_link().await;
    assert!(!link.is_connected().await);

    let connected = link.reconfigure(address_of(&server)).await;

    assert!(connected);
    assert_eq!(link.address().await, address_of(&server));
}
