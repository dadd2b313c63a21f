pub mod error;
pub mod ledger;
pub mod storage;
pub mod types;

pub use error::{LedgerError, Result};
pub use ledger::{CreditResult, LedgerManager};
pub use storage::{
    ActivityRecord, BadgeMintRecord, BadgeMintStatus, CreditOutcome, LedgerStorage, MemoryLedger,
    MintAttemptRecord, UserRecord,
};
pub use types::{
    ActivityKind, BadgeType, EventKey, ProofPoints, UserId, WalletAddress, POINTS_PER_LEVEL,
};
