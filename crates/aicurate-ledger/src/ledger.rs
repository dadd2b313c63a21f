use crate::error::{LedgerError, Result};
use crate::storage::{
    ActivityRecord, BadgeMintRecord, BadgeMintStatus, CreditOutcome, LedgerStorage,
    MintAttemptRecord, UserRecord,
};
use crate::types::{ActivityKind, BadgeType, ProofPoints, UserId, WalletAddress};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

/// Result of crediting proof points, with derived level transition.
#[derive(Debug, Clone)]
pub struct CreditResult {
    pub points_before: ProofPoints,
    pub points_after: ProofPoints,
    pub level_before: u32,
    pub level_after: u32,
    pub already_applied: bool,
}

impl CreditResult {
    pub fn level_up(&self) -> bool {
        self.level_after > self.level_before
    }

    fn from_outcome(outcome: CreditOutcome) -> Self {
        Self {
            level_before: outcome.points_before.level(),
            level_after: outcome.points_after.level(),
            points_before: outcome.points_before,
            points_after: outcome.points_after,
            already_applied: outcome.already_applied,
        }
    }
}

/// Sole owner of User and Activity Record persistence. Per-user credit
/// serialization and credit/activity atomicity are the storage backend's
/// contract; this layer adds level derivation and reconciliation.
pub struct LedgerManager {
    storage: Arc<dyn LedgerStorage>,
}

impl LedgerManager {
    pub fn new(storage: Arc<dyn LedgerStorage>) -> Self {
        Self { storage }
    }

    pub async fn get_user(&self, id: &UserId) -> Result<UserRecord> {
        self.storage
            .get_user(id)
            .await?
            .ok_or_else(|| LedgerError::UserNotFound(id.clone()))
    }

    pub async fn upsert_user(
        &self,
        id: &UserId,
        wallet: Option<WalletAddress>,
    ) -> Result<UserRecord> {
        self.storage.upsert_user(id, wallet).await
    }

    /// Credit points and append the earn activity as one idempotent step.
    pub async fn credit_proof_points(
        &self,
        user: &UserId,
        delta: ProofPoints,
        activity: ActivityRecord,
    ) -> Result<CreditResult> {
        let outcome = self
            .storage
            .credit_with_activity(user, delta, activity)
            .await?;
        let result = CreditResult::from_outcome(outcome);

        if result.level_up() && !result.already_applied {
            info!(
                user = %user,
                level_before = result.level_before,
                level_after = result.level_after,
                "🎉 Level up"
            );
        }

        Ok(result)
    }

    pub async fn append_activity(&self, record: ActivityRecord) -> Result<()> {
        self.storage.append_activity(record).await
    }

    pub async fn activity_for_user(
        &self,
        user: &UserId,
        kind: Option<ActivityKind>,
    ) -> Result<Vec<ActivityRecord>> {
        self.storage.activity_for_user(user, kind).await
    }

    /// Mint-event view of the activity log (token transactions screen).
    pub async fn token_mint_history(&self, user: &UserId) -> Result<Vec<ActivityRecord>> {
        self.storage
            .activity_for_user(user, Some(ActivityKind::TokenMint))
            .await
    }

    pub async fn badges_for_user(&self, user: &UserId) -> Result<Vec<BadgeMintRecord>> {
        let mut badges = Vec::new();
        for badge in [
            BadgeType::Pioneer,
            BadgeType::Curator,
            BadgeType::TopReviewer,
            BadgeType::LaunchCampaign,
        ] {
            if let Some(record) = self.storage.get_badge_mint(user, badge).await? {
                badges.push(record);
            }
        }
        Ok(badges)
    }

    /// Register a one-time badge claim. A second claim for the same
    /// (user, badge) pair fails with `AlreadyMinted` before any write.
    pub async fn claim_badge(
        &self,
        user: &UserId,
        badge: BadgeType,
        wallet: WalletAddress,
        transaction_id: Option<String>,
    ) -> Result<BadgeMintRecord> {
        let record = BadgeMintRecord {
            user: user.clone(),
            badge,
            wallet,
            transaction_id,
            status: BadgeMintStatus::Pending,
            created_at: Utc::now(),
        };
        self.storage.insert_badge_mint(record.clone()).await?;
        Ok(record)
    }

    pub async fn get_badge_mint(
        &self,
        user: &UserId,
        badge: BadgeType,
    ) -> Result<Option<BadgeMintRecord>> {
        self.storage.get_badge_mint(user, badge).await
    }

    pub async fn confirm_badge_mint(
        &self,
        user: &UserId,
        badge: BadgeType,
        transaction_id: Option<String>,
    ) -> Result<()> {
        self.storage
            .update_badge_mint_status(user, badge, BadgeMintStatus::Confirmed, transaction_id)
            .await
    }

    pub async fn record_mint_attempt(&self, attempt: MintAttemptRecord) -> Result<()> {
        self.storage.record_mint_attempt(attempt).await
    }

    pub async fn mint_attempts_for_user(&self, user: &UserId) -> Result<Vec<MintAttemptRecord>> {
        self.storage.mint_attempts_for_user(user).await
    }

    pub async fn pending_mint_attempts(&self) -> Result<Vec<MintAttemptRecord>> {
        self.storage.pending_mint_attempts().await
    }

    /// Reconciliation invariant: the sum of all earn deltas must equal the
    /// user's stored total. A mismatch is a ledger bug, not a user error.
    pub async fn reconcile(&self, user: &UserId) -> Result<()> {
        let record = self.get_user(user).await?;
        let activities = self.storage.activity_for_user(user, None).await?;

        let activity_total: u64 = activities
            .iter()
            .filter(|a| a.kind != ActivityKind::TokenMint)
            .map(|a| a.points_delta)
            .sum();

        let ledger_total = record.proof_points.value();
        if activity_total != ledger_total {
            return Err(LedgerError::ReconciliationMismatch {
                user: user.clone(),
                ledger_total,
                activity_total,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryLedger;
    use crate::types::EventKey;

    fn earn(user: &UserId, delta: u64, source: &str) -> ActivityRecord {
        ActivityRecord {
            user: user.clone(),
            kind: ActivityKind::ChallengeComplete,
            description: format!("Completed {}", source),
            points_delta: delta,
            metadata: serde_json::json!({ "challenge_id": source }),
            event_key: EventKey::derive(user, ActivityKind::ChallengeComplete, source),
            created_at: Utc::now(),
        }
    }

    fn manager() -> LedgerManager {
        LedgerManager::new(Arc::new(MemoryLedger::new()))
    }

    #[tokio::test]
    async fn test_credit_reports_level_transition() {
        let ledger = manager();
        let id = UserId::new("user-1").unwrap();
        ledger.upsert_user(&id, None).await.unwrap();

        let first = ledger
            .credit_proof_points(&id, ProofPoints::new(95), earn(&id, 95, "c1"))
            .await
            .unwrap();
        assert_eq!(first.level_before, 1);
        assert_eq!(first.level_after, 1);
        assert!(!first.level_up());

        let second = ledger
            .credit_proof_points(&id, ProofPoints::new(10), earn(&id, 10, "c2"))
            .await
            .unwrap();
        assert_eq!(second.points_after.value(), 105);
        assert_eq!(second.level_after, 2);
        assert!(second.level_up());
    }

    #[tokio::test]
    async fn test_reconcile_detects_foreign_writes() {
        let ledger = manager();
        let id = UserId::new("user-2").unwrap();
        ledger.upsert_user(&id, None).await.unwrap();

        ledger
            .credit_proof_points(&id, ProofPoints::new(30), earn(&id, 30, "c1"))
            .await
            .unwrap();
        ledger
            .credit_proof_points(&id, ProofPoints::new(20), earn(&id, 20, "c2"))
            .await
            .unwrap();
        ledger.reconcile(&id).await.unwrap();

        // Token-mint outcome records carry no earn delta and must not
        // disturb reconciliation.
        ledger
            .append_activity(ActivityRecord {
                user: id.clone(),
                kind: ActivityKind::TokenMint,
                description: "Minted 1 CUR8".to_string(),
                points_delta: 0,
                metadata: serde_json::json!({ "tx_hash": "0xdead" }),
                event_key: EventKey::derive(&id, ActivityKind::TokenMint, "m1"),
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        ledger.reconcile(&id).await.unwrap();
    }

    #[tokio::test]
    async fn test_badge_claim_then_confirm() {
        let ledger = manager();
        let id = UserId::new("user-3").unwrap();
        let wallet = WalletAddress::from_bytes([4; 20]);
        ledger.upsert_user(&id, Some(wallet)).await.unwrap();

        let record = ledger
            .claim_badge(&id, BadgeType::Pioneer, wallet, None)
            .await
            .unwrap();
        assert_eq!(record.status, BadgeMintStatus::Pending);

        ledger
            .confirm_badge_mint(&id, BadgeType::Pioneer, Some("0xfeed".to_string()))
            .await
            .unwrap();

        let badges = ledger.badges_for_user(&id).await.unwrap();
        assert_eq!(badges.len(), 1);
        assert_eq!(badges[0].status, BadgeMintStatus::Confirmed);
        assert_eq!(badges[0].transaction_id.as_deref(), Some("0xfeed"));
    }
}
