// Scan processing: eligibility, per-item actuation, deferred re-lock

use crate::core::errors::AccessError;
use crate::core::models::{
    ActionKind, ActuationResult, AuditRecord, Compartment, Item, ItemOutcome, LinkStatus,
    NewAuditRecord, ScanReport,
};
use crate::hardware::{HardwareLinkController, LinkAddress};
use crate::store::{clamp_log_limit, IdentityStore, ItemStore, Ledger};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Default wait between a successful unlock and its automatic re-lock
pub const DEFAULT_RELOCK_DELAY: Duration = Duration::from_millis(3000);

const NOTE_GRANTED: &str = "Access granted";

/// Drives every eligible item of one identity through the lock controller.
///
/// Items are actuated one at a time. A failing item is recorded and the
/// batch moves on; only validation and eligibility failures end a scan.
pub struct BatchAccessOrchestrator {
    link: Arc<HardwareLinkController>,
    identities: Arc<dyn IdentityStore>,
    items: Arc<dyn ItemStore>,
    ledger: Arc<dyn Ledger>,
    relock_delay: Duration,
}

impl BatchAccessOrchestrator {
    pub fn new(
        link: Arc<HardwareLinkController>,
        identities: Arc<dyn IdentityStore>,
        items: Arc<dyn ItemStore>,
        ledger: Arc<dyn Ledger>,
    ) -> Self {
        Self {
            link,
            identities,
            items,
            ledger,
            relock_delay: DEFAULT_RELOCK_DELAY,
        }
    }

    pub fn with_relock_delay(mut self, relock_delay: Duration) -> Self {
        self.relock_delay = relock_delay;
        self
    }

    pub fn link(&self) -> &Arc<HardwareLinkController> {
        &self.link
    }

    /// Process a scanned identity.
    ///
    /// Fails only with `InvalidInput` or `AccessDenied`, before any item or
    /// audit record is touched. Past that point the report lists every
    /// attempted item as a success or a failure.
    pub async fn process_scan(&self, identity: &str) -> Result<ScanReport, AccessError> {
        let identity = identity.trim();
        if identity.is_empty() {
            return Err(AccessError::InvalidInput("User ID is required".to_string()));
        }

        info!(identity = %identity, "Scan received");

        let Some(user) = self.identities.find(identity).await? else {
            warn!(identity = %identity, "Access denied: not registered");
            return Err(AccessError::AccessDenied(
                "User is not registered in the system".to_string(),
            ));
        };

        let eligible = self.eligible_items(identity).await?;
        if eligible.is_empty() {
            warn!(identity = %identity, "Access denied: nothing to pick up or return");
            return Err(AccessError::AccessDenied(
                "No items available for pickup or return".to_string(),
            ));
        }

        info!(
            identity = %identity,
            pickups = eligible.iter().filter(|(a, _)| *a == ActionKind::Pickup).count(),
            returns = eligible.iter().filter(|(a, _)| *a == ActionKind::Return).count(),
            "Eligible items resolved"
        );

        let mut outcomes = Vec::with_capacity(eligible.len());
        for (action, item) in eligible {
            outcomes.push(self.process_item(identity, action, item).await);
        }

        let report = ScanReport::from_outcomes(user, outcomes);
        info!(
            identity = %identity,
            total = report.total_processed,
            failed = report.summary.failed,
            "Scan processed"
        );
        Ok(report)
    }

    /// Pickups first, then returns, each group in item id order
    async fn eligible_items(&self, identity: &str) -> Result<Vec<(ActionKind, Item)>, AccessError> {
        let mut eligible: Vec<(ActionKind, Item)> = self
            .items
            .find_eligible(identity)
            .await?
            .into_iter()
            .filter(|item| item.owner == identity)
            .filter_map(|item| item.status.scan_action().map(|action| (action, item)))
            .collect();

        eligible.sort_by(|(a, x), (b, y)| {
            let rank = |k: &ActionKind| if *k == ActionKind::Pickup { 0 } else { 1 };
            rank(a).cmp(&rank(b)).then_with(|| x.id.cmp(&y.id))
        });
        Ok(eligible)
    }

    async fn process_item(
        &self,
        identity: &str,
        action: ActionKind,
        item: Item,
    ) -> Result<ItemOutcome, ItemOutcome> {
        let mut outcome = ItemOutcome {
            item_id: item.id.clone(),
            name: item.name.clone(),
            action,
            compartment: item.compartment,
            controller_response: None,
            error: None,
        };

        let unlocked = match self.link.unlock(item.compartment).await {
            Ok(result) => result,
            Err(e) => return Err(self.record_failure(identity, &item, action, outcome, e).await),
        };

        // The compartment is open from here on, whatever the bookkeeping does
        self.schedule_relock(identity, Some(item.id.clone()), item.compartment);

        if let Err(e) = self.commit_success(identity, &item, action).await {
            return Err(self.record_failure(identity, &item, action, outcome, e).await);
        }

        info!(
            item_id = %item.id,
            action = %action,
            compartment = %item.compartment,
            "Item processed"
        );
        outcome.controller_response = Some(unlocked);
        Ok(outcome)
    }

    /// Transition the item, then record the success.
    ///
    /// A failed audit write after a completed transition says so in the error;
    /// the new status is kept.
    async fn commit_success(&self, identity: &str, item: &Item, action: ActionKind) -> Result<(), AccessError> {
        let transitioned = match action.target_status() {
            Some(status) => {
                self.items.transition(&item.id, status).await?;
                Some(status)
            }
            None => None,
        };

        let appended = self
            .ledger
            .append(NewAuditRecord {
                identity: identity.to_string(),
                item_id: Some(item.id.clone()),
                action,
                compartment: item.compartment,
                success: true,
                note: NOTE_GRANTED.to_string(),
            })
            .await;

        match (appended, transitioned) {
            (Ok(_), _) => Ok(()),
            (Err(e), Some(status)) => Err(AccessError::PersistenceError(format!(
                "status updated to {}, audit write failed: {}",
                status, e
            ))),
            (Err(e), None) => Err(e),
        }
    }

    async fn record_failure(
        &self,
        identity: &str,
        item: &Item,
        action: ActionKind,
        mut outcome: ItemOutcome,
        cause: AccessError,
    ) -> ItemOutcome {
        error!(
            item_id = %item.id,
            action = %action,
            compartment = %item.compartment,
            error = %cause,
            "Item actuation failed"
        );

        let record = NewAuditRecord {
            identity: identity.to_string(),
            item_id: Some(item.id.clone()),
            action,
            compartment: item.compartment,
            success: false,
            note: cause.to_string(),
        };
        if let Err(e) = self.ledger.append(record).await {
            error!(item_id = %item.id, error = %e, "Failed to record failed actuation");
        }

        outcome.error = Some(cause.to_string());
        outcome
    }

    /// Fire-and-forget re-lock after `relock_delay`.
    ///
    /// Always writes exactly one `auto_lock` record. Never retried, never
    /// cancelled, and not checked against the item's later status.
    fn schedule_relock(&self, identity: &str, item_id: Option<String>, compartment: Compartment) {
        let link = self.link.clone();
        let ledger = self.ledger.clone();
        let identity = identity.to_string();
        let delay = self.relock_delay;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let (success, note) = match link.lock(compartment).await {
                Ok(result) => {
                    info!(compartment = %compartment, status = ?result.status, "Auto-lock completed");
                    (true, "Auto-lock completed".to_string())
                }
                Err(e) => {
                    error!(compartment = %compartment, error = %e, "Auto-lock failed");
                    (false, e.to_string())
                }
            };

            let record = NewAuditRecord {
                identity,
                item_id,
                action: ActionKind::AutoLock,
                compartment,
                success,
                note,
            };
            if let Err(e) = ledger.append(record).await {
                warn!(compartment = %compartment, error = %e, "Failed to record auto-lock");
            }
        });
    }

    /// Unlock a compartment directly, outside of any scan
    pub async fn manual_unlock(
        &self,
        compartment: Compartment,
        identity: Option<&str>,
    ) -> Result<ActuationResult, AccessError> {
        info!(compartment = %compartment, "Manual unlock requested");
        let result = self.link.unlock(compartment).await;
        self.record_manual(
            identity,
            compartment,
            &result,
            ActionKind::ManualUnlock,
            ActionKind::ManualUnlockFailed,
        )
        .await;
        result
    }

    /// Lock a compartment directly, outside of any scan
    pub async fn manual_lock(
        &self,
        compartment: Compartment,
        identity: Option<&str>,
    ) -> Result<ActuationResult, AccessError> {
        info!(compartment = %compartment, "Manual lock requested");
        let result = self.link.lock(compartment).await;
        self.record_manual(
            identity,
            compartment,
            &result,
            ActionKind::ManualLock,
            ActionKind::ManualLockFailed,
        )
        .await;
        result
    }

    /// Manual actuations are only recorded when an identity was supplied
    async fn record_manual(
        &self,
        identity: Option<&str>,
        compartment: Compartment,
        result: &Result<ActuationResult, AccessError>,
        on_success: ActionKind,
        on_failure: ActionKind,
    ) {
        let Some(identity) = identity.map(str::trim).filter(|id| !id.is_empty()) else {
            return;
        };

        let (action, success, note) = match result {
            Ok(_) => (on_success, true, NOTE_GRANTED.to_string()),
            Err(e) => (on_failure, false, e.to_string()),
        };

        let record = NewAuditRecord {
            identity: identity.to_string(),
            item_id: None,
            action,
            compartment,
            success,
            note,
        };
        if let Err(e) = self.ledger.append(record).await {
            error!(action = %action, error = %e, "Failed to record manual actuation");
        }
    }

    pub async fn link_status(&self) -> LinkStatus {
        self.link.status().await
    }

    /// Returns the connectivity observed by the post-reconfigure probe
    pub async fn reconfigure_link(&self, address: LinkAddress) -> bool {
        self.link.reconfigure(address).await
    }

    pub async fn audit_log(
        &self,
        limit: Option<usize>,
        identity: Option<&str>,
    ) -> Result<Vec<AuditRecord>, AccessError> {
        self.ledger.recent(clamp_log_limit(limit), identity).await
    }

    pub async fn ledger_ping(&self) -> Result<(), AccessError> {
        self.ledger.ping().await
    }
}
