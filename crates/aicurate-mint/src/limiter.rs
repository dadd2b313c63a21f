use crate::error::{MintError, Result};
use crate::types::Cur8Amount;
use aicurate_ledger::WalletAddress;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Debug, Clone)]
struct WalletWindow {
    day: NaiveDate,
    minted_today: u64,
    /// Tokens reserved by in-flight mints, counted against the ceiling so
    /// two concurrent requests cannot both pass the limit check.
    reserved: u64,
    /// Outstanding reservations. The cooldown treats each as a provisional
    /// mint, so a second request cannot slip in before the first commits.
    inflight: u32,
    last_mint_at: Option<DateTime<Utc>>,
}

impl WalletWindow {
    fn fresh(day: NaiveDate) -> Self {
        Self {
            day,
            minted_today: 0,
            reserved: 0,
            inflight: 0,
            last_mint_at: None,
        }
    }
}

/// Per-wallet daily ceiling and cooldown. Check-then-reserve happens under
/// a single write lock; quota is committed only after the chain call
/// succeeds and released when it fails.
pub struct RateLimiter {
    daily_limit: u64,
    cooldown: Duration,
    windows: Arc<RwLock<HashMap<WalletAddress, WalletWindow>>>,
}

impl RateLimiter {
    pub fn new(daily_limit: u64, cooldown_secs: u64) -> Self {
        Self {
            daily_limit,
            cooldown: Duration::seconds(cooldown_secs as i64),
            windows: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn reserve(&self, wallet: WalletAddress, tokens: Cur8Amount) -> Result<()> {
        self.reserve_at(wallet, tokens, Utc::now()).await
    }

    pub async fn commit(&self, wallet: WalletAddress, tokens: Cur8Amount) {
        self.commit_at(wallet, tokens, Utc::now()).await
    }

    pub(crate) async fn reserve_at(
        &self,
        wallet: WalletAddress,
        tokens: Cur8Amount,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let mut windows = self.windows.write().await;
        let today = now.date_naive();

        let window = windows
            .entry(wallet)
            .or_insert_with(|| WalletWindow::fresh(today));

        // The ceiling resets at UTC midnight; the cooldown carries over.
        if window.day != today {
            let last = window.last_mint_at;
            *window = WalletWindow::fresh(today);
            window.last_mint_at = last;
        }

        if self.cooldown > Duration::zero() && window.inflight > 0 {
            // A reservation is a provisional mint; if it commits the caller
            // would be inside the cooldown anyway.
            let retry_after_secs = self.cooldown.num_seconds().max(1) as u64;
            debug!(
                wallet = %wallet,
                inflight = window.inflight,
                "Mint rejected: reservation outstanding"
            );
            return Err(MintError::RateLimited { retry_after_secs });
        }

        if let Some(last) = window.last_mint_at {
            let elapsed = now - last;
            if elapsed < self.cooldown {
                let retry_after_secs = (self.cooldown - elapsed).num_seconds().max(1) as u64;
                debug!(
                    wallet = %wallet,
                    retry_after_secs,
                    "Mint rejected: cooldown active"
                );
                return Err(MintError::RateLimited { retry_after_secs });
            }
        }

        let committed_and_inflight = window.minted_today + window.reserved;
        if committed_and_inflight + tokens.value() > self.daily_limit {
            let midnight = today
                .succ_opt()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc())
                .unwrap_or(now);
            let retry_after_secs = (midnight - now).num_seconds().max(1) as u64;
            debug!(
                wallet = %wallet,
                minted_today = window.minted_today,
                reserved = window.reserved,
                requested = tokens.value(),
                daily_limit = self.daily_limit,
                "Mint rejected: daily ceiling reached"
            );
            return Err(MintError::RateLimited { retry_after_secs });
        }

        window.reserved += tokens.value();
        window.inflight += 1;
        debug!(
            wallet = %wallet,
            reserved = window.reserved,
            minted_today = window.minted_today,
            "🔒 Mint quota reserved"
        );
        Ok(())
    }

    pub(crate) async fn commit_at(
        &self,
        wallet: WalletAddress,
        tokens: Cur8Amount,
        now: DateTime<Utc>,
    ) {
        let mut windows = self.windows.write().await;
        if let Some(window) = windows.get_mut(&wallet) {
            window.reserved = window.reserved.saturating_sub(tokens.value());
            window.inflight = window.inflight.saturating_sub(1);
            window.minted_today += tokens.value();
            window.last_mint_at = Some(now);
            info!(
                wallet = %wallet,
                minted_today = window.minted_today,
                daily_limit = self.daily_limit,
                "✅ Mint quota committed"
            );
        }
    }

    /// Release a reservation after a failed chain call so a transient
    /// failure does not burn the wallet's daily allowance.
    pub async fn release(&self, wallet: WalletAddress, tokens: Cur8Amount) {
        let mut windows = self.windows.write().await;
        if let Some(window) = windows.get_mut(&wallet) {
            window.reserved = window.reserved.saturating_sub(tokens.value());
            window.inflight = window.inflight.saturating_sub(1);
            debug!(wallet = %wallet, reserved = window.reserved, "🔓 Mint quota released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn wallet(byte: u8) -> WalletAddress {
        WalletAddress::from_bytes([byte; 20])
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 30, h, m, 0).unwrap()
    }

    #[tokio::test]
    async fn test_daily_ceiling_counts_reservations() {
        let limiter = RateLimiter::new(10, 0);
        let w = wallet(1);

        limiter.reserve_at(w, Cur8Amount::new(6), at(9, 0)).await.unwrap();
        // 6 reserved + 5 requested > 10: rejected even though nothing is
        // committed yet.
        let err = limiter
            .reserve_at(w, Cur8Amount::new(5), at(9, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, MintError::RateLimited { .. }));

        limiter.reserve_at(w, Cur8Amount::new(4), at(9, 0)).await.unwrap();
    }

    #[tokio::test]
    async fn test_release_frees_quota() {
        let limiter = RateLimiter::new(5, 0);
        let w = wallet(2);

        limiter.reserve_at(w, Cur8Amount::new(5), at(10, 0)).await.unwrap();
        assert!(limiter
            .reserve_at(w, Cur8Amount::new(1), at(10, 0))
            .await
            .is_err());

        limiter.release(w, Cur8Amount::new(5)).await;
        limiter.reserve_at(w, Cur8Amount::new(5), at(10, 0)).await.unwrap();
    }

    #[tokio::test]
    async fn test_cooldown_after_commit() {
        let limiter = RateLimiter::new(100, 3600);
        let w = wallet(3);

        limiter.reserve_at(w, Cur8Amount::new(1), at(8, 0)).await.unwrap();
        limiter.commit_at(w, Cur8Amount::new(1), at(8, 0)).await;

        let err = limiter
            .reserve_at(w, Cur8Amount::new(1), at(8, 30))
            .await
            .unwrap_err();
        match err {
            MintError::RateLimited { retry_after_secs } => {
                assert_eq!(retry_after_secs, 1800);
            }
            other => panic!("expected RateLimited, got {:?}", other),
        }

        limiter.reserve_at(w, Cur8Amount::new(1), at(9, 0)).await.unwrap();
    }

    #[tokio::test]
    async fn test_window_resets_at_midnight() {
        let limiter = RateLimiter::new(5, 0);
        let w = wallet(4);

        limiter.reserve_at(w, Cur8Amount::new(5), at(23, 0)).await.unwrap();
        limiter.commit_at(w, Cur8Amount::new(5), at(23, 0)).await;
        assert!(limiter
            .reserve_at(w, Cur8Amount::new(1), at(23, 30))
            .await
            .is_err());

        let next_day = Utc.with_ymd_and_hms(2026, 8, 31, 0, 5, 0).unwrap();
        limiter
            .reserve_at(w, Cur8Amount::new(5), next_day)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_failed_mint_keeps_cooldown_clear() {
        let limiter = RateLimiter::new(10, 3600);
        let w = wallet(5);

        // Reserve then release (failed chain call): no cooldown starts.
        limiter.reserve_at(w, Cur8Amount::new(2), at(12, 0)).await.unwrap();
        limiter.release(w, Cur8Amount::new(2)).await;

        limiter.reserve_at(w, Cur8Amount::new(2), at(12, 1)).await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_reservations_respect_ceiling() {
        let limiter = Arc::new(RateLimiter::new(10, 0));
        let w = wallet(6);

        let mut handles = Vec::new();
        for _ in 0..10 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(
                async move { limiter.reserve(w, Cur8Amount::new(2)).await },
            ));
        }

        let mut granted = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                granted += 1;
            }
        }
        // 10 tokens of ceiling, 2 per request: exactly 5 may pass.
        assert_eq!(granted, 5);
    }

    #[tokio::test]
    async fn test_outstanding_reservation_activates_cooldown() {
        let limiter = RateLimiter::new(100, 3600);
        let w = wallet(7);

        limiter.reserve_at(w, Cur8Amount::new(1), at(8, 0)).await.unwrap();

        // The first reservation has not committed yet; a second request at
        // the same instant must still hit the cooldown.
        let err = limiter
            .reserve_at(w, Cur8Amount::new(1), at(8, 0))
            .await
            .unwrap_err();
        match err {
            MintError::RateLimited { retry_after_secs } => {
                assert_eq!(retry_after_secs, 3600);
            }
            other => panic!("expected RateLimited, got {:?}", other),
        }

        // Released reservation clears it again.
        limiter.release(w, Cur8Amount::new(1)).await;
        limiter.reserve_at(w, Cur8Amount::new(1), at(8, 1)).await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_reservations_respect_cooldown() {
        let limiter = Arc::new(RateLimiter::new(100, 3600));
        let w = wallet(8);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(
                async move { limiter.reserve(w, Cur8Amount::new(1)).await },
            ));
        }

        let mut granted = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                granted += 1;
            }
        }
        assert_eq!(granted, 1);
    }
}
