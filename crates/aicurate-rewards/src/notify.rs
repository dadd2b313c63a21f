use aicurate_ledger::UserId;
use async_trait::async_trait;
use tracing::info;

/// Level-up notifications are delegated to an external collaborator
/// (push service, in-app feed). The orchestrator only guarantees exactly
/// one emission per level transition.
#[async_trait]
pub trait LevelUpNotifier: Send + Sync {
    async fn level_up(&self, user: &UserId, new_level: u32);
}

/// Default notifier: a structured log line.
pub struct LogNotifier;

#[async_trait]
impl LevelUpNotifier for LogNotifier {
    async fn level_up(&self, user: &UserId, new_level: u32) {
        info!(user = %user, new_level, "🎉 Level up notification");
    }
}
