use aicurate_mint::MintConfig;
use aicurate_rewards::PolicyConfig;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub node: NodeSettings,
    pub api: ApiConfig,
    pub policy: PolicyConfig,
    pub mint: MintConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSettings {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node: NodeSettings {
                name: "aicurate-node".to_string(),
            },
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            policy: PolicyConfig::default(),
            mint: MintConfig::default(),
        }
    }
}

impl NodeConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Environment variables win over file values; precedence is applied by
    /// the caller after loading.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(name) = env::var("AICURATE_NODE_NAME") {
            if !name.is_empty() {
                self.node.name = name;
            }
        }

        if let Ok(host) = env::var("AICURATE_API_HOST") {
            self.api.host = host;
        }
        if let Ok(port) = env::var("AICURATE_API_PORT") {
            if let Ok(port) = port.parse() {
                self.api.port = port;
            }
        }

        if let Ok(address) = env::var("AICURATE_CONTRACT_ADDRESS") {
            self.mint.contract_address = address;
        }
        if let Ok(signer) = env::var("AICURATE_SIGNER") {
            self.mint.signer = signer;
        }
        if let Ok(rate) = env::var("AICURATE_CONVERSION_RATE") {
            if let Ok(rate) = rate.parse() {
                self.mint.conversion_rate = rate;
            }
        }
        if let Ok(min) = env::var("AICURATE_MIN_PROOF_POINTS") {
            if let Ok(min) = min.parse() {
                self.mint.min_proof_points = min;
            }
        }
        if let Ok(limit) = env::var("AICURATE_DAILY_CLAIM_LIMIT") {
            if let Ok(limit) = limit.parse() {
                self.mint.daily_claim_limit = limit;
            }
        }
        if let Ok(max) = env::var("AICURATE_MAX_REWARD_PER_TX") {
            if let Ok(max) = max.parse() {
                self.mint.max_reward_per_tx = max;
            }
        }
        if let Ok(cooldown) = env::var("AICURATE_CLAIM_COOLDOWN_SECS") {
            if let Ok(cooldown) = cooldown.parse() {
                self.mint.claim_cooldown_secs = cooldown;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_roundtrip() {
        let config = NodeConfig::default();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aicurate.toml");

        config.save_to_file(&path).unwrap();
        let loaded = NodeConfig::from_file(&path).unwrap();

        assert_eq!(loaded.api.port, config.api.port);
        assert_eq!(loaded.mint.conversion_rate, config.mint.conversion_rate);
        assert_eq!(loaded.policy.badge_mint_points, config.policy.badge_mint_points);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = NodeConfig::default();
        env::set_var("AICURATE_API_PORT", "9090");
        env::set_var("AICURATE_CONVERSION_RATE", "200");
        env::set_var("AICURATE_SIGNER", "backend-2");

        config.apply_env_overrides();
        assert_eq!(config.api.port, 9090);
        assert_eq!(config.mint.conversion_rate, 200);
        assert_eq!(config.mint.signer, "backend-2");

        env::remove_var("AICURATE_API_PORT");
        env::remove_var("AICURATE_CONVERSION_RATE");
        env::remove_var("AICURATE_SIGNER");
    }
}
