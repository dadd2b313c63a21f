use anyhow::bail;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whole CUR8 token units. The contract being external, fractional units
/// never cross this boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cur8Amount(u64);

impl Cur8Amount {
    pub const ZERO: Self = Self(0);

    pub fn new(tokens: u64) -> Self {
        Self(tokens)
    }

    /// Fixed-rate floor conversion: `tokens = proof_points / rate`.
    pub fn from_proof_points(proof_points: u64, conversion_rate: u64) -> Self {
        Self(proof_points / conversion_rate)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn saturating_add(&self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl fmt::Display for Cur8Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} CUR8", self.0)
    }
}

/// Environment-configured parameters of the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MintConfig {
    /// Token contract address (opaque; the contract itself is external).
    pub contract_address: String,
    /// Backend signing identity that must be authorized on the contract.
    pub signer: String,
    /// Proof points per CUR8 token.
    pub conversion_rate: u64,
    /// Policy floor: requests below this many points are rejected.
    pub min_proof_points: u64,
    /// Per-wallet daily mint ceiling, in tokens.
    pub daily_claim_limit: u64,
    /// Per-transaction maximum reward, in tokens.
    pub max_reward_per_tx: u64,
    /// Seconds a wallet must wait between successful mints.
    pub claim_cooldown_secs: u64,
}

impl MintConfig {
    /// Reject parameter values that would make the gateway divide by zero
    /// or silently refuse every mint. Config and env values are untrusted.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.conversion_rate == 0 {
            bail!("mint.conversion_rate must be greater than zero");
        }
        if self.daily_claim_limit == 0 {
            bail!("mint.daily_claim_limit must be greater than zero");
        }
        if self.max_reward_per_tx == 0 {
            bail!("mint.max_reward_per_tx must be greater than zero");
        }
        Ok(())
    }
}

impl Default for MintConfig {
    fn default() -> Self {
        Self {
            contract_address: "0x0000000000000000000000000000000000000000".to_string(),
            signer: "aicurate-backend".to_string(),
            conversion_rate: 100,
            min_proof_points: 100,
            daily_claim_limit: 50,
            max_reward_per_tx: 10,
            claim_cooldown_secs: 3600,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floor_conversion() {
        assert_eq!(Cur8Amount::from_proof_points(250, 100).value(), 2);
        assert_eq!(Cur8Amount::from_proof_points(100, 100).value(), 1);
        assert_eq!(Cur8Amount::from_proof_points(99, 100).value(), 0);
        assert_eq!(Cur8Amount::from_proof_points(0, 100).value(), 0);
    }

    #[test]
    fn test_config_rejects_zero_parameters() {
        assert!(MintConfig::default().validate().is_ok());

        let zero_rate = MintConfig {
            conversion_rate: 0,
            ..MintConfig::default()
        };
        assert!(zero_rate.validate().is_err());

        let zero_limit = MintConfig {
            daily_claim_limit: 0,
            ..MintConfig::default()
        };
        assert!(zero_limit.validate().is_err());

        let zero_max = MintConfig {
            max_reward_per_tx: 0,
            ..MintConfig::default()
        };
        assert!(zero_max.validate().is_err());
    }
}
