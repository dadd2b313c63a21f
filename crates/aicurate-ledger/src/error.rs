use crate::types::{BadgeType, UserId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("Badge {badge} already minted for {user}")]
    AlreadyMinted { user: UserId, badge: BadgeType },

    #[error("Proof point overflow for {0}")]
    PointOverflow(UserId),

    #[error("Ledger write failed: {0}")]
    WriteFailed(String),

    #[error("Reconciliation mismatch for {user}: ledger has {ledger_total}, activity sums to {activity_total}")]
    ReconciliationMismatch {
        user: UserId,
        ledger_total: u64,
        activity_total: u64,
    },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
