// In-process store used when no database is configured

use crate::core::errors::AccessError;
use crate::core::models::{AuditRecord, Item, ItemStatus, NewAuditRecord, RecordId, UserProfile};
use crate::store::{IdentityStore, ItemStore, Ledger};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct MemoryState {
    identities: HashMap<String, UserProfile>,
    items: BTreeMap<String, Item>,
    records: Vec<AuditRecord>,
}

/// Identity, item and ledger store held in memory.
///
/// Records are kept in append order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_identity(&self, identity: &str) {
        self.add_user(UserProfile::bare(identity)).await;
    }

    pub async fn add_user(&self, user: UserProfile) {
        self.state.write().await.identities.insert(user.id.clone(), user);
    }

    /// Insert or replace an item. An unknown owner is registered as a bare identity.
    pub async fn add_item(&self, item: Item) {
        let mut state = self.state.write().await;
        state
            .identities
            .entry(item.owner.clone())
            .or_insert_with(|| UserProfile::bare(&item.owner));
        state.items.insert(item.id.clone(), item);
    }

    pub async fn item(&self, item_id: &str) -> Option<Item> {
        self.state.read().await.items.get(item_id).cloned()
    }

    /// All audit records in append order
    pub async fn records(&self) -> Vec<AuditRecord> {
        self.state.read().await.records.clone()
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn find(&self, identity: &str) -> Result<Option<UserProfile>, AccessError> {
        Ok(self.state.read().await.identities.get(identity).cloned())
    }
}

#[async_trait]
impl ItemStore for MemoryStore {
    async fn find_eligible(&self, identity: &str) -> Result<Vec<Item>, AccessError> {
        let state = self.state.read().await;
        Ok(state
            .items
            .values()
            .filter(|item| item.owner == identity && item.status.scan_action().is_some())
            .cloned()
            .collect())
    }

    async fn transition(&self, item_id: &str, status: ItemStatus) -> Result<Item, AccessError> {
        let mut state = self.state.write().await;
        let item = state
            .items
            .get_mut(item_id)
            .ok_or_else(|| AccessError::NotFound(format!("item {}", item_id)))?;
        item.status = status;
        item.last_actuated_at = Some(Utc::now());
        Ok(item.clone())
    }
}

#[async_trait]
impl Ledger for MemoryStore {
    async fn append(&self, record: NewAuditRecord) -> Result<RecordId, AccessError> {
        let id = RecordId::generate();
        self.state
            .write()
            .await
            .records
            .push(AuditRecord::from_new(id, record, Utc::now()));
        Ok(id)
    }

    async fn recent(&self, limit: usize, identity: Option<&str>) -> Result<Vec<AuditRecord>, AccessError> {
        let state = self.state.read().await;
        Ok(state
            .records
            .iter()
            .rev()
            .filter(|r| identity.map_or(true, |id| r.identity == id))
            .take(limit)
            .map(|r| {
                let mut record = r.clone();
                record.user = state.identities.get(&r.identity).cloned();
                record.item_name = r
                    .item_id
                    .as_ref()
                    .and_then(|id| state.items.get(id))
                    .map(|item| item.name.clone());
                record
            })
            .collect())
    }

    async fn ping(&self) -> Result<(), AccessError> {
        Ok(())
    }
}
