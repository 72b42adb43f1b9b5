//! Request pacing for the upstream API.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::time::{sleep_until, Duration, Instant};

/// Enforces a fixed minimum gap between consecutive requests.
///
/// The first request goes out immediately. Every later caller waits until
/// `interval` has passed since the previous request started. There is no
/// backoff: the gap is a hard floor, not an adaptive delay.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    last: Arc<Mutex<Option<Instant>>>,
    interval: Duration,
}

impl RateLimiter {
    /// Creates a limiter with `interval` between requests.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            last: Arc::new(Mutex::new(None)),
            interval,
        }
    }

    /// Creates a limiter from a millisecond delay.
    #[must_use]
    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    /// Waits until the next request slot, then claims it.
    pub async fn acquire(&self) {
        let mut last = self.last.lock().await;
        if let Some(previous) = *last {
            sleep_until(previous + self.interval).await;
        }
        *last = Some(Instant::now());
    }
}
