pub mod error;
pub mod notify;
pub mod orchestrator;
pub mod policy;

pub use error::{Result, RewardError};
pub use notify::{LevelUpNotifier, LogNotifier};
pub use orchestrator::{MintOutcome, RewardOrchestrator, RewardOutcome};
pub use policy::{PolicyConfig, RewardDecision, RewardEvent, RewardPolicy};
