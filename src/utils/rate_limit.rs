//! Request rate limiting for outbound API calls.

use std::num::NonZeroU32;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;

/// Shared limiter gating calls to external APIs.
///
/// Wraps a governor direct limiter with a fixed per-second quota. Callers
/// await [`ApiRateLimiter::acquire`] before each request; the call resolves
/// immediately while capacity remains and otherwise waits for the next slot.
pub struct ApiRateLimiter {
    limiter: DefaultDirectRateLimiter,
}

impl std::fmt::Debug for ApiRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiRateLimiter").finish_non_exhaustive()
    }
}

impl ApiRateLimiter {
    /// Build a limiter allowing `requests_per_second` calls per second.
    /// Zero is coerced to one request per second.
    pub fn new(requests_per_second: u32) -> Self {
        let per_second = NonZeroU32::new(requests_per_second).unwrap_or(nonzero!(1u32));
        Self {
            limiter: RateLimiter::direct(Quota::per_second(per_second)),
        }
    }

    /// Wait until the next request is allowed
    pub async fn acquire(&self) {
        self.limiter.until_ready().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_acquire_within_quota_is_immediate() {
        let limiter = ApiRateLimiter::new(100);
        let start = std::time::Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() < std::time::Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_zero_rate_coerced_to_one() {
        let limiter = ApiRateLimiter::new(0);
        limiter.acquire().await;
    }
}
