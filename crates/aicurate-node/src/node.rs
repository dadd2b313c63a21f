use crate::config::NodeConfig;
use aicurate_ledger::{LedgerManager, MemoryLedger};
use aicurate_mint::{MintGateway, SimulatedContract, TokenContract};
use aicurate_rewards::{LogNotifier, RewardOrchestrator, RewardPolicy};
use anyhow::Result;
use std::sync::Arc;
use tracing::info;

/// Process-level wiring: every collaborator is constructed once and passed
/// explicitly; nothing reaches for ambient singletons.
#[derive(Clone)]
pub struct AicurateNode {
    pub ledger: Arc<LedgerManager>,
    pub orchestrator: Arc<RewardOrchestrator>,
}

impl AicurateNode {
    pub async fn new(config: &NodeConfig) -> Result<Self> {
        let contract: Arc<dyn TokenContract> = Arc::new(SimulatedContract::new([config
            .mint
            .signer
            .clone()]));
        Self::with_contract(config, contract).await
    }

    /// Construct against an explicit contract backend. The production
    /// backend is whatever implements `TokenContract` for the deployed
    /// CUR8 contract; tests inject the simulated one directly.
    pub async fn with_contract(
        config: &NodeConfig,
        contract: Arc<dyn TokenContract>,
    ) -> Result<Self> {
        let storage = Arc::new(MemoryLedger::new());
        let ledger = Arc::new(LedgerManager::new(storage));

        let gateway = Arc::new(MintGateway::new(contract, config.mint.clone()).await?);
        let policy = RewardPolicy::new(config.policy.clone());

        let orchestrator = Arc::new(RewardOrchestrator::new(
            ledger.clone(),
            gateway,
            policy,
            Arc::new(LogNotifier),
        ));

        info!(
            node = %config.node.name,
            conversion_rate = config.mint.conversion_rate,
            points_per_level = aicurate_ledger::POINTS_PER_LEVEL,
            "🚀 AICurate node wired"
        );

        Ok(Self {
            ledger,
            orchestrator,
        })
    }
}
