use crate::error::{LedgerError, Result};
use crate::types::{ActivityKind, BadgeType, EventKey, ProofPoints, UserId, WalletAddress};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// A user's reward state as held by the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub wallet: Option<WalletAddress>,
    pub proof_points: ProofPoints,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

impl UserRecord {
    /// Level is derived, never stored.
    pub fn level(&self) -> u32 {
        self.proof_points.level()
    }
}

/// One append-only entry per point-earning or reward-issuance event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub user: UserId,
    pub kind: ActivityKind,
    pub description: String,
    pub points_delta: u64,
    pub metadata: serde_json::Value,
    pub event_key: EventKey,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeMintStatus {
    Pending,
    Confirmed,
    Failed,
}

/// One-time badge claim, unique per (user, badge type).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BadgeMintRecord {
    pub user: UserId,
    pub badge: BadgeType,
    pub wallet: WalletAddress,
    pub transaction_id: Option<String>,
    pub status: BadgeMintStatus,
    pub created_at: DateTime<Utc>,
}

/// Result of one Mint Gateway invocation, written by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MintAttemptRecord {
    pub event_key: EventKey,
    pub user: UserId,
    pub wallet: WalletAddress,
    pub proof_points: u64,
    pub tokens: u64,
    pub success: bool,
    pub tx_hash: Option<String>,
    pub error: Option<String>,
    /// Transient failures are eligible for an out-of-band retry.
    pub retryable: bool,
    pub created_at: DateTime<Utc>,
}

/// Outcome of an idempotent credit. On replay the original before/after
/// snapshot is returned and no state changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditOutcome {
    pub points_before: ProofPoints,
    pub points_after: ProofPoints,
    pub already_applied: bool,
}

#[async_trait]
pub trait LedgerStorage: Send + Sync {
    async fn get_user(&self, id: &UserId) -> Result<Option<UserRecord>>;

    /// Create-or-fetch keyed by external identity. A provided wallet address
    /// is attached to an existing record that has none.
    async fn upsert_user(&self, id: &UserId, wallet: Option<WalletAddress>) -> Result<UserRecord>;

    /// Atomically credit proof points and append the earn-activity record.
    /// Idempotent per event key: a replayed key performs no writes and
    /// returns the outcome of the original application.
    async fn credit_with_activity(
        &self,
        user: &UserId,
        delta: ProofPoints,
        activity: ActivityRecord,
    ) -> Result<CreditOutcome>;

    /// Append a non-crediting activity record (e.g. a mint outcome).
    async fn append_activity(&self, record: ActivityRecord) -> Result<()>;

    async fn activity_for_user(
        &self,
        user: &UserId,
        kind: Option<ActivityKind>,
    ) -> Result<Vec<ActivityRecord>>;

    async fn get_badge_mint(
        &self,
        user: &UserId,
        badge: BadgeType,
    ) -> Result<Option<BadgeMintRecord>>;

    /// Rejects with `AlreadyMinted` when a record for (user, badge) exists.
    async fn insert_badge_mint(&self, record: BadgeMintRecord) -> Result<()>;

    async fn update_badge_mint_status(
        &self,
        user: &UserId,
        badge: BadgeType,
        status: BadgeMintStatus,
        transaction_id: Option<String>,
    ) -> Result<()>;

    async fn record_mint_attempt(&self, attempt: MintAttemptRecord) -> Result<()>;

    async fn mint_attempts_for_user(&self, user: &UserId) -> Result<Vec<MintAttemptRecord>>;

    /// Failed-but-retryable attempts, for an external retry job.
    async fn pending_mint_attempts(&self) -> Result<Vec<MintAttemptRecord>>;
}

#[derive(Default)]
struct MemoryState {
    users: HashMap<UserId, UserRecord>,
    activities: Vec<ActivityRecord>,
    applied_credits: HashMap<EventKey, CreditOutcome>,
    badge_mints: HashMap<(UserId, BadgeType), BadgeMintRecord>,
    mint_attempts: Vec<MintAttemptRecord>,
}

/// In-memory reference backend. A single write lock over the whole state
/// serializes credits per user and makes credit+append one atomic step.
pub struct MemoryLedger {
    state: Arc<RwLock<MemoryState>>,
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(MemoryState::default())),
        }
    }
}

#[async_trait]
impl LedgerStorage for MemoryLedger {
    async fn get_user(&self, id: &UserId) -> Result<Option<UserRecord>> {
        let state = self.state.read().await;
        Ok(state.users.get(id).cloned())
    }

    async fn upsert_user(&self, id: &UserId, wallet: Option<WalletAddress>) -> Result<UserRecord> {
        let mut state = self.state.write().await;
        let now = Utc::now();

        let record = state.users.entry(id.clone()).or_insert_with(|| {
            info!(user = %id, storage_type = "memory", "👤 User created");
            UserRecord {
                id: id.clone(),
                wallet: None,
                proof_points: ProofPoints::ZERO,
                created_at: now,
                last_active: now,
            }
        });

        if record.wallet.is_none() {
            if let Some(addr) = wallet {
                debug!(user = %id, wallet = %addr, "Wallet attached to user");
                record.wallet = Some(addr);
            }
        }
        record.last_active = now;

        Ok(record.clone())
    }

    async fn credit_with_activity(
        &self,
        user: &UserId,
        delta: ProofPoints,
        activity: ActivityRecord,
    ) -> Result<CreditOutcome> {
        let mut state = self.state.write().await;

        // Replay detection happens under the same lock as the write, so a
        // concurrent duplicate cannot slip past the check.
        if let Some(existing) = state.applied_credits.get(&activity.event_key) {
            info!(
                user = %user,
                event_key = %activity.event_key,
                "🔁 Credit replayed, returning original outcome"
            );
            return Ok(CreditOutcome {
                already_applied: true,
                ..existing.clone()
            });
        }

        let record = state
            .users
            .get_mut(user)
            .ok_or_else(|| LedgerError::UserNotFound(user.clone()))?;

        let before = record.proof_points;
        let after = before
            .checked_add(delta)
            .ok_or_else(|| LedgerError::PointOverflow(user.clone()))?;

        record.proof_points = after;
        record.last_active = Utc::now();

        let outcome = CreditOutcome {
            points_before: before,
            points_after: after,
            already_applied: false,
        };

        state
            .applied_credits
            .insert(activity.event_key, outcome.clone());
        state.activities.push(activity);

        info!(
            user = %user,
            delta = delta.value(),
            points_before = before.value(),
            points_after = after.value(),
            level = after.level(),
            storage_type = "memory",
            "💰 Proof points credited"
        );

        Ok(outcome)
    }

    async fn append_activity(&self, record: ActivityRecord) -> Result<()> {
        let mut state = self.state.write().await;
        debug!(
            user = %record.user,
            kind = %record.kind,
            event_key = %record.event_key,
            "📦 Activity appended"
        );
        state.activities.push(record);
        Ok(())
    }

    async fn activity_for_user(
        &self,
        user: &UserId,
        kind: Option<ActivityKind>,
    ) -> Result<Vec<ActivityRecord>> {
        let state = self.state.read().await;
        Ok(state
            .activities
            .iter()
            .filter(|a| &a.user == user && kind.map_or(true, |k| a.kind == k))
            .cloned()
            .collect())
    }

    async fn get_badge_mint(
        &self,
        user: &UserId,
        badge: BadgeType,
    ) -> Result<Option<BadgeMintRecord>> {
        let state = self.state.read().await;
        Ok(state.badge_mints.get(&(user.clone(), badge)).cloned())
    }

    async fn insert_badge_mint(&self, record: BadgeMintRecord) -> Result<()> {
        let mut state = self.state.write().await;
        let key = (record.user.clone(), record.badge);
        if state.badge_mints.contains_key(&key) {
            return Err(LedgerError::AlreadyMinted {
                user: record.user,
                badge: record.badge,
            });
        }
        info!(
            user = %record.user,
            badge = %record.badge,
            wallet = %record.wallet,
            "🏅 Badge mint recorded"
        );
        state.badge_mints.insert(key, record);
        Ok(())
    }

    async fn update_badge_mint_status(
        &self,
        user: &UserId,
        badge: BadgeType,
        status: BadgeMintStatus,
        transaction_id: Option<String>,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let record = state
            .badge_mints
            .get_mut(&(user.clone(), badge))
            .ok_or_else(|| LedgerError::UserNotFound(user.clone()))?;
        record.status = status;
        if transaction_id.is_some() {
            record.transaction_id = transaction_id;
        }
        Ok(())
    }

    async fn record_mint_attempt(&self, attempt: MintAttemptRecord) -> Result<()> {
        let mut state = self.state.write().await;
        info!(
            user = %attempt.user,
            wallet = %attempt.wallet,
            tokens = attempt.tokens,
            success = attempt.success,
            retryable = attempt.retryable,
            "📝 Mint attempt recorded"
        );
        state.mint_attempts.push(attempt);
        Ok(())
    }

    async fn mint_attempts_for_user(&self, user: &UserId) -> Result<Vec<MintAttemptRecord>> {
        let state = self.state.read().await;
        Ok(state
            .mint_attempts
            .iter()
            .filter(|a| &a.user == user)
            .cloned()
            .collect())
    }

    async fn pending_mint_attempts(&self) -> Result<Vec<MintAttemptRecord>> {
        let state = self.state.read().await;
        Ok(state
            .mint_attempts
            .iter()
            .filter(|a| !a.success && a.retryable)
            .cloned()
            .collect())
    }
}
