use crate::error::{Result, RewardError};
use crate::notify::LevelUpNotifier;
use crate::policy::{RewardDecision, RewardEvent, RewardPolicy};
use aicurate_ledger::{
    ActivityKind, ActivityRecord, EventKey, LedgerManager, MintAttemptRecord, UserId,
    WalletAddress,
};
use aicurate_mint::{MintError, MintGateway};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Stages of one reward event. The ledger step is fatal on failure; the
/// mint step never is, because points are already durably credited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RewardStage {
    Received,
    LedgerUpdated,
    MintAttempted,
    Recorded,
    Done,
}

impl fmt::Display for RewardStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Received => "received",
            Self::LedgerUpdated => "ledger_updated",
            Self::MintAttempted => "mint_attempted",
            Self::Recorded => "recorded",
            Self::Done => "done",
        };
        write!(f, "{}", s)
    }
}

/// Mint leg of the response: success, skipped, or annotated failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MintOutcome {
    pub minted: bool,
    pub tokens: Option<u64>,
    pub tx_hash: Option<String>,
    pub error: Option<String>,
    pub retryable: bool,
}

impl MintOutcome {
    fn skipped() -> Self {
        Self {
            minted: false,
            tokens: None,
            tx_hash: None,
            error: None,
            retryable: false,
        }
    }

    fn from_attempt(attempt: &MintAttemptRecord) -> Self {
        Self {
            minted: attempt.success,
            tokens: Some(attempt.tokens),
            tx_hash: attempt.tx_hash.clone(),
            error: attempt.error.clone(),
            retryable: attempt.retryable,
        }
    }
}

/// Composed response for one processed event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardOutcome {
    pub user: UserId,
    pub proof_points: u64,
    pub level: u32,
    pub level_up: bool,
    pub already_applied: bool,
    pub mint: MintOutcome,
}

/// Coordinates Ledger Store, Reward Policy and Mint Gateway into one unit
/// of work per triggering event. The ledger is authoritative; minting is
/// best-effort and retryable out-of-band.
pub struct RewardOrchestrator {
    ledger: Arc<LedgerManager>,
    gateway: Arc<MintGateway>,
    policy: RewardPolicy,
    notifier: Arc<dyn LevelUpNotifier>,
}

impl RewardOrchestrator {
    pub fn new(
        ledger: Arc<LedgerManager>,
        gateway: Arc<MintGateway>,
        policy: RewardPolicy,
        notifier: Arc<dyn LevelUpNotifier>,
    ) -> Self {
        Self {
            ledger,
            gateway,
            policy,
            notifier,
        }
    }

    pub fn ledger(&self) -> &Arc<LedgerManager> {
        &self.ledger
    }

    /// Process one triggering event. Idempotent per event key: a retried
    /// request re-enters at whichever step is incomplete instead of
    /// re-crediting.
    pub async fn process(
        &self,
        user: &UserId,
        wallet: Option<WalletAddress>,
        event: RewardEvent,
        explicit_key: Option<EventKey>,
    ) -> Result<RewardOutcome> {
        let decision = self.policy.evaluate(&event)?;
        let key =
            explicit_key.unwrap_or_else(|| EventKey::derive(user, event.kind(), &event.source_id()));

        debug!(
            user = %user,
            event_key = %key,
            kind = %event.kind(),
            delta = decision.points_delta.value(),
            stage = %RewardStage::Received,
            "Reward event accepted"
        );

        self.ledger.upsert_user(user, wallet).await?;

        // Badge claims are one-shot per (user, badge); a duplicate fails
        // here before any credit is written.
        if let RewardEvent::BadgeMinted {
            badge,
            transaction_id,
        } = &event
        {
            let badge_wallet = wallet.ok_or_else(|| {
                RewardError::InvalidRewardAmount(
                    "Badge mint requires a wallet address".to_string(),
                )
            })?;
            self.ledger
                .claim_badge(user, *badge, badge_wallet, transaction_id.clone())
                .await?;
        }

        let activity = ActivityRecord {
            user: user.clone(),
            kind: event.kind(),
            description: event.description(),
            points_delta: decision.points_delta.value(),
            metadata: event.metadata(),
            event_key: key,
            created_at: Utc::now(),
        };

        let credit = self
            .ledger
            .credit_proof_points(user, decision.points_delta, activity)
            .await?;

        debug!(
            user = %user,
            event_key = %key,
            points_after = credit.points_after.value(),
            already_applied = credit.already_applied,
            stage = %RewardStage::LedgerUpdated,
            "Ledger credit durable"
        );

        // A replayed event whose mint leg already completed (success or
        // recorded failure) returns the recorded outcome without touching
        // the chain again. A replay with no recorded attempt re-enters
        // the mint step: that is the crash-between-steps case.
        if credit.already_applied {
            if let Some(attempt) = self.recorded_attempt(user, key).await? {
                return Ok(self.compose(user, &credit, MintOutcome::from_attempt(&attempt)));
            }
        }

        let mint = match (wallet, decision.token_eligible) {
            (Some(wallet), true) => {
                self.attempt_mint(user, wallet, key, &event, &decision).await?
            }
            _ => {
                debug!(user = %user, event_key = %key, "Mint skipped: no wallet on event");
                MintOutcome::skipped()
            }
        };

        if credit.level_up() && !credit.already_applied {
            self.notifier.level_up(user, credit.level_after).await;
        }

        debug!(user = %user, event_key = %key, stage = %RewardStage::Done, "Reward event complete");
        Ok(self.compose(user, &credit, mint))
    }

    /// Mint leg: one gateway call, outcome recorded either way. Failure of
    /// the gateway or the chain never fails the event.
    async fn attempt_mint(
        &self,
        user: &UserId,
        wallet: WalletAddress,
        key: EventKey,
        event: &RewardEvent,
        decision: &RewardDecision,
    ) -> Result<MintOutcome> {
        let proof_points = decision.points_delta.value();
        let reward_type = event.kind().to_string();

        debug!(
            user = %user,
            event_key = %key,
            wallet = %wallet,
            stage = %RewardStage::MintAttempted,
            "Invoking mint gateway"
        );

        let (outcome, attempt) = match self
            .gateway
            .mint_reward_for_proof_points(wallet, proof_points, &reward_type)
            .await
        {
            Ok(receipt) => {
                let outcome = MintOutcome {
                    minted: true,
                    tokens: Some(receipt.tokens.value()),
                    tx_hash: Some(receipt.tx_hash.clone()),
                    error: None,
                    retryable: false,
                };
                let attempt = MintAttemptRecord {
                    event_key: key,
                    user: user.clone(),
                    wallet,
                    proof_points,
                    tokens: receipt.tokens.value(),
                    success: true,
                    tx_hash: Some(receipt.tx_hash),
                    error: None,
                    retryable: false,
                    created_at: Utc::now(),
                };
                (outcome, attempt)
            }
            Err(e) => {
                let retryable = e.is_transient();
                warn!(
                    user = %user,
                    event_key = %key,
                    wallet = %wallet,
                    error = %e,
                    retryable,
                    "Mint failed, proof points remain credited"
                );
                let outcome = MintOutcome {
                    minted: false,
                    tokens: None,
                    tx_hash: None,
                    error: Some(e.to_string()),
                    retryable,
                };
                let attempt = MintAttemptRecord {
                    event_key: key,
                    user: user.clone(),
                    wallet,
                    proof_points,
                    tokens: token_amount_for(&e, proof_points, self.gateway.config().conversion_rate),
                    success: false,
                    tx_hash: None,
                    error: Some(e.to_string()),
                    retryable,
                    created_at: Utc::now(),
                };
                (outcome, attempt)
            }
        };

        // RECORDED: the mint outcome is part of the audit trail whether or
        // not the chain call succeeded.
        let mint_activity = ActivityRecord {
            user: user.clone(),
            kind: ActivityKind::TokenMint,
            description: if outcome.minted {
                format!("Minted {} CUR8 for {}", attempt.tokens, reward_type)
            } else {
                format!("CUR8 mint failed for {}", reward_type)
            },
            points_delta: 0,
            metadata: serde_json::json!({
                "event_key": key.to_string(),
                "tx_hash": outcome.tx_hash,
                "error": outcome.error,
                "reward_type": reward_type,
            }),
            event_key: EventKey::derive(user, ActivityKind::TokenMint, &key.to_string()),
            created_at: Utc::now(),
        };
        self.ledger.append_activity(mint_activity).await?;
        self.ledger.record_mint_attempt(attempt).await?;

        if outcome.minted {
            if let RewardEvent::BadgeMinted { badge, .. } = event {
                self.ledger
                    .confirm_badge_mint(user, *badge, outcome.tx_hash.clone())
                    .await?;
            }
        }

        debug!(user = %user, event_key = %key, stage = %RewardStage::Recorded, "Mint outcome recorded");
        Ok(outcome)
    }

    async fn recorded_attempt(
        &self,
        user: &UserId,
        key: EventKey,
    ) -> Result<Option<MintAttemptRecord>> {
        let attempts = self.ledger.mint_attempts_for_user(user).await?;
        Ok(attempts.into_iter().find(|a| a.event_key == key))
    }

    fn compose(
        &self,
        user: &UserId,
        credit: &aicurate_ledger::CreditResult,
        mint: MintOutcome,
    ) -> RewardOutcome {
        info!(
            user = %user,
            proof_points = credit.points_after.value(),
            level = credit.level_after,
            level_up = credit.level_up() && !credit.already_applied,
            minted = mint.minted,
            "🏁 Reward event processed"
        );
        RewardOutcome {
            user: user.clone(),
            proof_points: credit.points_after.value(),
            level: credit.level_after,
            level_up: credit.level_up() && !credit.already_applied,
            already_applied: credit.already_applied,
            mint,
        }
    }
}

fn token_amount_for(error: &MintError, proof_points: u64, conversion_rate: u64) -> u64 {
    // Policy rejections happen before conversion applies on-chain; record
    // the would-be amount so the retry job knows the size of the claim.
    match error {
        MintError::BelowMinimum { .. } => 0,
        _ => proof_points / conversion_rate,
    }
}
