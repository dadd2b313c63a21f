use crate::chain::TokenContract;
use crate::error::{MintError, Result};
use crate::limiter::RateLimiter;
use crate::types::{Cur8Amount, MintConfig};
use aicurate_ledger::WalletAddress;
use std::sync::Arc;
use tracing::{info, warn};

/// Successful mint outcome: exactly one on-chain transaction happened.
#[derive(Debug, Clone)]
pub struct MintReceipt {
    pub wallet: WalletAddress,
    pub proof_points: u64,
    pub tokens: Cur8Amount,
    pub tx_hash: String,
    pub reward_type: String,
}

/// Bridges proof-point events to on-chain CUR8 issuance. Never retries
/// internally; retry policy belongs to the caller.
pub struct MintGateway {
    contract: Arc<dyn TokenContract>,
    limiter: RateLimiter,
    config: MintConfig,
    /// Checked once at construction and cached. When false every mint call
    /// fails fast instead of attempting and failing per-request.
    authorized: bool,
}

impl MintGateway {
    pub async fn new(contract: Arc<dyn TokenContract>, config: MintConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let authorized = contract.is_authorized_minter(&config.signer).await?;
        if authorized {
            info!(
                signer = %config.signer,
                contract = %config.contract_address,
                conversion_rate = config.conversion_rate,
                daily_claim_limit = config.daily_claim_limit,
                "🔑 Mint gateway authorized"
            );
        } else {
            warn!(
                signer = %config.signer,
                contract = %config.contract_address,
                "⚠️ Signer not authorized on token contract, all mints will be rejected"
            );
        }

        let limiter = RateLimiter::new(config.daily_claim_limit, config.claim_cooldown_secs);
        Ok(Self {
            contract,
            limiter,
            config,
            authorized,
        })
    }

    pub fn is_authorized_minter(&self) -> bool {
        self.authorized
    }

    pub fn config(&self) -> &MintConfig {
        &self.config
    }

    /// Convert proof points to tokens at the configured rate and issue one
    /// mint transaction. Policy rejections and transient chain failures are
    /// distinct error classes; see `MintError::is_transient`.
    pub async fn mint_reward_for_proof_points(
        &self,
        wallet: WalletAddress,
        proof_points: u64,
        reward_type: &str,
    ) -> Result<MintReceipt> {
        if !self.authorized {
            return Err(MintError::MinterNotAuthorized);
        }

        if proof_points < self.config.min_proof_points {
            return Err(MintError::BelowMinimum {
                points: proof_points,
                min: self.config.min_proof_points,
            });
        }

        let tokens = Cur8Amount::from_proof_points(proof_points, self.config.conversion_rate);
        if tokens == Cur8Amount::ZERO {
            return Err(MintError::BelowMinimum {
                points: proof_points,
                min: self.config.conversion_rate,
            });
        }

        if tokens.value() > self.config.max_reward_per_tx {
            // Rejected, not clamped.
            return Err(MintError::RewardTooLarge {
                tokens: tokens.value(),
                max: self.config.max_reward_per_tx,
            });
        }

        self.limiter.reserve(wallet, tokens).await?;

        match self.contract.mint(wallet, tokens).await {
            Ok(tx_hash) => {
                self.limiter.commit(wallet, tokens).await;
                info!(
                    wallet = %wallet,
                    proof_points,
                    tokens = %tokens,
                    reward_type,
                    tx_hash = %tx_hash,
                    "✅ Reward minted"
                );
                Ok(MintReceipt {
                    wallet,
                    proof_points,
                    tokens,
                    tx_hash,
                    reward_type: reward_type.to_string(),
                })
            }
            Err(e) => {
                self.limiter.release(wallet, tokens).await;
                warn!(
                    wallet = %wallet,
                    proof_points,
                    tokens = %tokens,
                    error = %e,
                    "❌ Chain mint failed"
                );
                Err(MintError::ChainCallFailed(e.to_string()))
            }
        }
    }
}
