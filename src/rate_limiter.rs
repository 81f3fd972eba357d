//! Shared request budget for all outbound API calls
//!
//! Every remote call acquires a slot here first, so the aggregate rate across
//! all concurrent tasks stays under the configured ceiling. A burst rejection
//! from upstream (HTTP 429) parks every caller behind a long cooldown before
//! the next slot is granted. Requests are never dropped, only delayed.

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

const DEFAULT_BURST_COOLDOWN: Duration = Duration::from_secs(300);

pub struct ApiRateLimiter {
    limiter: DirectLimiter,
    cooldown: Duration,
    cooldown_until: Mutex<Option<Instant>>,
}

impl ApiRateLimiter {
    pub fn new(requests_per_second: u32) -> Self {
        Self::with_cooldown(requests_per_second, DEFAULT_BURST_COOLDOWN)
    }

    pub fn with_cooldown(requests_per_second: u32, cooldown: Duration) -> Self {
        let quota = Quota::per_second(
            NonZeroU32::new(requests_per_second.max(1)).expect("non-zero after max(1)"),
        );
        Self {
            limiter: RateLimiter::direct(quota),
            cooldown,
            cooldown_until: Mutex::new(None),
        }
    }

    /// Suspend until a request slot is available. Ordering among waiters is
    /// not guaranteed; only the aggregate ceiling is.
    pub async fn acquire(&self) {
        loop {
            self.wait_out_cooldown().await;
            self.limiter.until_ready().await;
            // A rejection may have landed while this caller was queued for a
            // slot; the slot is forfeited and the caller goes back to sleep.
            if self.cooldown_deadline().await.is_none() {
                return;
            }
        }
    }

    async fn wait_out_cooldown(&self) {
        while let Some(until) = self.cooldown_deadline().await {
            debug!(
                "rate limiter cooling down for {:?}",
                until - Instant::now()
            );
            tokio::time::sleep_until(until).await;
        }
    }

    /// The active cooldown deadline, if one is still in the future.
    async fn cooldown_deadline(&self) -> Option<Instant> {
        (*self.cooldown_until.lock().await).filter(|until| *until > Instant::now())
    }

    /// Record a burst rejection from upstream. All callers, current and
    /// future, wait out the cooldown before the next slot is granted.
    pub async fn report_burst_rejected(&self) {
        let mut guard = self.cooldown_until.lock().await;
        let until = Instant::now() + self.cooldown;
        // Keep the later deadline if two rejections race.
        if guard.map_or(true, |existing| until > existing) {
            warn!(
                "upstream burst rejection, cooling down all requests for {:?}",
                self.cooldown
            );
            *guard = Some(until);
        }
    }
}
