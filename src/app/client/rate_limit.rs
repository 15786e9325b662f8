//! Global pacing of outbound API calls
//!
//! One limiter is shared by every client operation. Callers queue on the inner
//! lock, and the lock is held across the pacing sleep, so the ceiling holds
//! across all endpoints no matter how many tasks call in.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Spaces calls at least `interval` apart
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Limiter allowing `calls` per minute
    ///
    /// Zero disables pacing entirely.
    pub fn per_minute(calls: u32) -> Self {
        let interval = if calls == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs(60) / calls
        };
        Self::with_interval(interval)
    }

    /// Limiter with an explicit minimum spacing between calls
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            last_call: Mutex::new(None),
        }
    }

    /// Minimum spacing between two calls
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until the next call is allowed and claim the slot
    pub async fn wait(&self) {
        let mut last_call = self.last_call.lock().await;

        if let Some(previous) = *last_call {
            let ready_at = previous + self.interval;
            let now = Instant::now();
            if ready_at > now {
                tracing::trace!(
                    "Rate limiter pacing call by {}ms",
                    (ready_at - now).as_millis()
                );
                tokio::time::sleep_until(ready_at).await;
            }
        }

        *last_call = Some(Instant::now());
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::per_minute(crate::constants::CALLS_PER_MINUTE)
    }
}
