use thiserror::Error;

#[derive(Error, Debug)]
pub enum MintError {
    #[error("Backend signer is not an authorized minter on the token contract")]
    MinterNotAuthorized,

    #[error("Proof points below minting floor: {points} < {min}")]
    BelowMinimum { points: u64, min: u64 },

    #[error("Reward of {tokens} CUR8 exceeds per-transaction maximum of {max}")]
    RewardTooLarge { tokens: u64, max: u64 },

    #[error("Mint rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Chain call failed: {0}")]
    ChainCallFailed(String),
}

impl MintError {
    /// Transient failures are eligible for an out-of-band retry; policy
    /// rejections are not.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ChainCallFailed(_))
    }
}

pub type Result<T> = std::result::Result<T, MintError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(MintError::ChainCallFailed("rpc timeout".to_string()).is_transient());
        assert!(!MintError::MinterNotAuthorized.is_transient());
        assert!(!MintError::RateLimited {
            retry_after_secs: 60
        }
        .is_transient());
        assert!(!MintError::RewardTooLarge {
            tokens: 20,
            max: 10
        }
        .is_transient());
        assert!(!MintError::BelowMinimum {
            points: 10,
            min: 100
        }
        .is_transient());
    }
}
