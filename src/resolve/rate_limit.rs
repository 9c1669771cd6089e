//! Minimum-gap rate limiter for registry calls.

use std::time::{Duration, Instant};

use tokio::sync::Mutex;

/// Enforces a minimum gap between consecutive external calls.
///
/// The limiter owns its last-call timestamp; callers hold a shared
/// reference and `acquire` before every registry call. Holding the
/// internal lock across the sleep means concurrent acquirers queue up
/// and each departs at least one gap after the previous one.
#[derive(Debug)]
pub struct RateLimiter {
    gap: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Create a limiter with the given minimum inter-call gap.
    #[must_use]
    pub const fn new(gap: Duration) -> Self {
        Self {
            gap,
            last_call: Mutex::const_new(None),
        }
    }

    /// Wait until at least one gap has passed since the previous call,
    /// then claim the current instant as the new last-call time.
    pub async fn acquire(&self) {
        let mut last = self.last_call.lock().await;

        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.gap {
                tokio::time::sleep(self.gap - elapsed).await;
            }
        }

        *last = Some(Instant::now());
    }

    /// The configured minimum gap.
    #[must_use]
    pub const fn gap(&self) -> Duration {
        self.gap
    }
}
