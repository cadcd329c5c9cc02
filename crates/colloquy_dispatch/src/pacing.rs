//! Per-model request pacing using governor's GCRA limiter.

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Spaces a model's attempts to at most `requests_per_minute`, one at a
/// time (no bursts). Shared by every request targeting the model.
pub struct RequestPacer {
    limiter: DirectRateLimiter,
    per_minute: NonZeroU32,
}

impl RequestPacer {
    /// Pacer for a rate, `None` when the rate is zero.
    pub fn per_minute(requests_per_minute: u32) -> Option<Self> {
        let per_minute = NonZeroU32::new(requests_per_minute)?;
        let quota = Quota::per_minute(per_minute).allow_burst(NonZeroU32::MIN);
        Some(Self {
            limiter: RateLimiter::direct(quota),
            per_minute,
        })
    }

    /// Wait until the next attempt may start.
    pub async fn until_ready(&self) {
        self.limiter.until_ready().await;
    }

    /// Claim a slot if one is available now.
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }

    /// Configured rate.
    pub fn requests_per_minute(&self) -> u32 {
        self.per_minute.get()
    }
}

impl std::fmt::Debug for RequestPacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestPacer")
            .field("per_minute", &self.per_minute)
            .finish_non_exhaustive()
    }
}
