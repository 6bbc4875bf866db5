//! Domain models for the cabinet access service.
//!
//! Items, compartments, audit records and the result types handed back to
//! callers. Pure data; no I/O.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::core::errors::AccessError;

/// Lifecycle status of an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    /// In its compartment, eligible for pickup by its owner
    Available,
    /// Picked up, eligible for return by its owner
    Retrieved,
    /// Assigned out through the approval workflow
    CheckedOut,
    Maintenance,
    Missing,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Available => "AVAILABLE",
            ItemStatus::Retrieved => "RETRIEVED",
            ItemStatus::CheckedOut => "CHECKED_OUT",
            ItemStatus::Maintenance => "MAINTENANCE",
            ItemStatus::Missing => "MISSING",
        }
    }

    /// Action a scan performs on an item in this status, if any
    pub fn scan_action(&self) -> Option<ActionKind> {
        match self {
            ItemStatus::Available => Some(ActionKind::Pickup),
            ItemStatus::Retrieved => Some(ActionKind::Return),
            _ => None,
        }
    }
}

impl FromStr for ItemStatus {
    type Err = AccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AVAILABLE" => Ok(ItemStatus::Available),
            "RETRIEVED" => Ok(ItemStatus::Retrieved),
            "CHECKED_OUT" => Ok(ItemStatus::CheckedOut),
            "MAINTENANCE" => Ok(ItemStatus::Maintenance),
            "MISSING" => Ok(ItemStatus::Missing),
            other => Err(AccessError::PersistenceError(format!(
                "Unknown item status '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of actuation recorded in the audit trail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Pickup,
    Return,
    AutoLock,
    ManualUnlock,
    ManualUnlockFailed,
    ManualLock,
    ManualLockFailed,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Pickup => "pickup",
            ActionKind::Return => "return",
            ActionKind::AutoLock => "auto_lock",
            ActionKind::ManualUnlock => "manual_unlock",
            ActionKind::ManualUnlockFailed => "manual_unlock_failed",
            ActionKind::ManualLock => "manual_lock",
            ActionKind::ManualLockFailed => "manual_lock_failed",
        }
    }

    /// Status an item moves to once this action's unlock succeeded
    pub fn target_status(&self) -> Option<ItemStatus> {
        match self {
            ActionKind::Pickup => Some(ItemStatus::Retrieved),
            ActionKind::Return => Some(ItemStatus::Available),
            _ => None,
        }
    }
}

impl FromStr for ActionKind {
    type Err = AccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pickup" => Ok(ActionKind::Pickup),
            "return" => Ok(ActionKind::Return),
            "auto_lock" => Ok(ActionKind::AutoLock),
            "manual_unlock" => Ok(ActionKind::ManualUnlock),
            "manual_unlock_failed" => Ok(ActionKind::ManualUnlockFailed),
            "manual_lock" => Ok(ActionKind::ManualLock),
            "manual_lock_failed" => Ok(ActionKind::ManualLockFailed),
            other => Err(AccessError::PersistenceError(format!(
                "Unknown action kind '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Physical slot address. Rows and columns are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Compartment {
    pub row: u32,
    pub column: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shelf: Option<u32>,
}

impl Compartment {
    pub fn new(row: u32, column: u32, shelf: Option<u32>) -> Result<Self, AccessError> {
        if row == 0 || column == 0 {
            return Err(AccessError::InvalidInput(
                "row and column are required and must be at least 1".to_string(),
            ));
        }
        Ok(Self { row, column, shelf })
    }
}

impl std::fmt::Display for Compartment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Row {}, Column {}", self.row, self.column)
    }
}

/// A physical object assigned to exactly one identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub owner: String,
    pub name: String,
    pub compartment: Compartment,
    pub status: ItemStatus,
    pub last_actuated_at: Option<DateTime<Utc>>,
}

/// Registered identity with its display details
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
}

impl UserProfile {
    /// Profile carrying only the identity, named after it
    pub fn bare(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            department: None,
        }
    }
}

/// Audit record identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Audit record as submitted to the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAuditRecord {
    pub identity: String,
    pub item_id: Option<String>,
    pub action: ActionKind,
    pub compartment: Compartment,
    pub success: bool,
    pub note: String,
}

/// Append-only log entry for one actuation attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: RecordId,
    pub identity: String,
    pub item_id: Option<String>,
    pub action: ActionKind,
    pub compartment: Compartment,
    pub success: bool,
    pub note: String,
    pub recorded_at: DateTime<Utc>,
    /// Joined in by ledger listings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_name: Option<String>,
}

impl AuditRecord {
    pub fn from_new(id: RecordId, record: NewAuditRecord, recorded_at: DateTime<Utc>) -> Self {
        Self {
            id,
            identity: record.identity,
            item_id: record.item_id,
            action: record.action,
            compartment: record.compartment,
            success: record.success,
            note: record.note,
            recorded_at,
            user: None,
            item_name: None,
        }
    }
}

/// How an actuation was answered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActuationStatus {
    /// The lock controller confirmed the command
    Success,
    /// Answered locally because the controller is disconnected
    Simulated,
}

/// Outcome of a single lock or unlock call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActuationResult {
    pub status: ActuationStatus,
    pub message: String,
    pub compartment: Compartment,
    pub timestamp: DateTime<Utc>,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller_response: Option<serde_json::Value>,
}

/// Connectivity descriptor for the lock controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LinkDetail {
    Disconnected { simulation: bool },
    Connected { controller_status: serde_json::Value },
    Error { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkStatus {
    pub connected: bool,
    pub address: String,
    pub detail: LinkDetail,
    pub checked_at: DateTime<Utc>,
}

/// One attempted item in a scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemOutcome {
    pub item_id: String,
    pub name: String,
    pub action: ActionKind,
    pub compartment: Compartment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller_response: Option<ActuationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub pickups: usize,
    pub returns: usize,
    pub failed: usize,
}

/// Aggregate result of processing one scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub identity: String,
    pub user: UserProfile,
    /// True only when every attempted item succeeded
    pub success: bool,
    pub total_processed: usize,
    pub successes: Vec<ItemOutcome>,
    pub failures: Vec<ItemOutcome>,
    pub summary: ScanSummary,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ScanReport {
    pub fn from_outcomes(user: UserProfile, outcomes: Vec<Result<ItemOutcome, ItemOutcome>>) -> Self {
        let total_processed = outcomes.len();
        let mut successes = Vec::new();
        let mut failures = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(done) => successes.push(done),
                Err(failed) => failures.push(failed),
            }
        }

        let summary = ScanSummary {
            pickups: successes.iter().filter(|o| o.action == ActionKind::Pickup).count(),
            returns: successes.iter().filter(|o| o.action == ActionKind::Return).count(),
            failed: failures.len(),
        };

        let message = format!(
            "Processed {} items. {} succeeded ({} pickups, {} returns), {} failed.",
            total_processed,
            successes.len(),
            summary.pickups,
            summary.returns,
            summary.failed
        );

        Self {
            identity: user.id.clone(),
            user,
            success: failures.is_empty(),
            total_processed,
            successes,
            failures,
            summary,
            message,
            timestamp: Utc::now(),
        }
    }
}
