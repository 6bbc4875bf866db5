// Persistence collaborators: identities, items and the audit ledger

use crate::core::errors::AccessError;
use crate::core::models::{AuditRecord, Item, ItemStatus, NewAuditRecord, RecordId, UserProfile};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Default number of audit records returned by a listing
pub const DEFAULT_LOG_LIMIT: usize = 50;
/// Upper bound on a single audit listing
pub const MAX_LOG_LIMIT: usize = 500;

/// Trait for identity lookups
#[async_trait::async_trait]
pub trait IdentityStore: Send + Sync {
    /// Profile of a registered identity, `None` if unknown
    async fn find(&self, identity: &str) -> Result<Option<UserProfile>, AccessError>;

    async fn exists(&self, identity: &str) -> Result<bool, AccessError> {
        Ok(self.find(identity).await?.is_some())
    }
}

/// Trait for item lookups and status transitions
#[async_trait::async_trait]
pub trait ItemStore: Send + Sync {
    /// Items owned by `identity` that are eligible for pickup or return
    async fn find_eligible(&self, identity: &str) -> Result<Vec<Item>, AccessError>;

    /// Move an item to `status` and stamp its last actuation time
    async fn transition(&self, item_id: &str, status: ItemStatus) -> Result<Item, AccessError>;
}

/// Trait for the append-only audit ledger
#[async_trait::async_trait]
pub trait Ledger: Send + Sync {
    async fn append(&self, record: NewAuditRecord) -> Result<RecordId, AccessError>;

    /// Newest records first, optionally for a single identity.
    /// Records carry the user's profile and the item name where known.
    async fn recent(&self, limit: usize, identity: Option<&str>) -> Result<Vec<AuditRecord>, AccessError>;

    async fn ping(&self) -> Result<(), AccessError>;
}

/// Clamp a requested listing size to `1..=MAX_LOG_LIMIT`
pub fn clamp_log_limit(limit: Option<usize>) -> usize {
    limit.unwrap_or(DEFAULT_LOG_LIMIT).clamp(1, MAX_LOG_LIMIT)
}
