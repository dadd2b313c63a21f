use aicurate_ledger::{BadgeType, LedgerError, UserId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RewardError {
    #[error("Invalid reward amount: {0}")]
    InvalidRewardAmount(String),

    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("Badge {badge} already minted for {user}")]
    AlreadyMinted { user: UserId, badge: BadgeType },

    #[error("Ledger write failed: {0}")]
    LedgerWriteFailed(String),
}

impl From<LedgerError> for RewardError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::UserNotFound(user) => Self::UserNotFound(user),
            LedgerError::AlreadyMinted { user, badge } => Self::AlreadyMinted { user, badge },
            other => Self::LedgerWriteFailed(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, RewardError>;
