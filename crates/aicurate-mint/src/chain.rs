use crate::types::Cur8Amount;
use aicurate_ledger::WalletAddress;
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Opaque minting capability of the external CUR8 contract. The contract
/// implementation lives on-chain; this seam only issues mints and answers
/// authorization queries.
#[async_trait]
pub trait TokenContract: Send + Sync {
    async fn is_authorized_minter(&self, signer: &str) -> Result<bool>;

    /// Issue exactly one mint transaction. Returns the transaction hash on
    /// success; any failure (network, revert, gas) surfaces as an error.
    async fn mint(&self, wallet: WalletAddress, amount: Cur8Amount) -> Result<String>;
}

struct SimulatedState {
    minted: HashMap<WalletAddress, Cur8Amount>,
    nonce: u64,
    fail_next: Option<String>,
}

/// In-process stand-in for the on-chain contract, used in development and
/// tests. Tracks per-wallet totals and can be told to fail the next mint.
pub struct SimulatedContract {
    authorized: HashSet<String>,
    state: Arc<RwLock<SimulatedState>>,
}

impl SimulatedContract {
    pub fn new(authorized_signers: impl IntoIterator<Item = String>) -> Self {
        Self {
            authorized: authorized_signers.into_iter().collect(),
            state: Arc::new(RwLock::new(SimulatedState {
                minted: HashMap::new(),
                nonce: 0,
                fail_next: None,
            })),
        }
    }

    /// Make the next mint fail with the given reason (transient-class).
    pub async fn fail_next_mint(&self, reason: impl Into<String>) {
        let mut state = self.state.write().await;
        state.fail_next = Some(reason.into());
    }

    pub async fn minted_total(&self, wallet: WalletAddress) -> Cur8Amount {
        let state = self.state.read().await;
        state.minted.get(&wallet).copied().unwrap_or(Cur8Amount::ZERO)
    }
}

#[async_trait]
impl TokenContract for SimulatedContract {
    async fn is_authorized_minter(&self, signer: &str) -> Result<bool> {
        Ok(self.authorized.contains(signer))
    }

    async fn mint(&self, wallet: WalletAddress, amount: Cur8Amount) -> Result<String> {
        let mut state = self.state.write().await;

        if let Some(reason) = state.fail_next.take() {
            warn!(wallet = %wallet, amount = %amount, reason = %reason, "❌ Simulated mint failure");
            bail!("{}", reason);
        }

        state.nonce += 1;
        let nonce = state.nonce;

        let mut hasher = blake3::Hasher::new();
        hasher.update(wallet.as_bytes());
        hasher.update(&amount.value().to_le_bytes());
        hasher.update(&nonce.to_le_bytes());
        let tx_hash = format!("0x{}", hex::encode(hasher.finalize().as_bytes()));

        let total = state
            .minted
            .entry(wallet)
            .or_insert(Cur8Amount::ZERO)
            .saturating_add(amount);
        state.minted.insert(wallet, total);

        info!(
            wallet = %wallet,
            amount = %amount,
            total_minted = %total,
            tx_hash = %tx_hash,
            "⛓️ Simulated mint confirmed"
        );

        Ok(tx_hash)
    }
}
