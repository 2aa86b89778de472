// Client-side throttle for the Hugging Face inference API.
//
// The serverless inference tier rejects bursts with 429s. A long document is
// split into many chunks and each chunk is one API call, so calls are spaced
// out to a configured rate. The limiter is shared between concurrent requests.

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

/// Spaces calls at least `interval` apart. A limiter built with a
/// non-positive rate lets everything through.
#[derive(Clone)]
pub struct RateLimiter {
    interval: Option<Duration>,
    next_slot: Arc<Mutex<Option<Instant>>>,
}

impl RateLimiter {
    pub fn per_second(requests_per_second: f64) -> Self {
        let interval = (requests_per_second > 0.0 && requests_per_second.is_finite())
            .then(|| Duration::from_secs_f64(1.0 / requests_per_second));
        Self {
            interval,
            next_slot: Arc::new(Mutex::new(None)),
        }
    }

    /// Reserve the next slot and sleep until it arrives.
    ///
    /// The slot is reserved while holding the lock and the sleep happens after
    /// releasing it, so waiting callers queue up one interval apart instead of
    /// serializing on the mutex.
    pub async fn acquire(&self) {
        let Some(interval) = self.interval else {
            return;
        };

        let wake_at = {
            let mut next_slot = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = match *next_slot {
                Some(reserved) if reserved > now => reserved,
                _ => now,
            };
            *next_slot = Some(slot + interval);
            slot
        };

        tokio::time::sleep_until(wake_at).await;
    }
}
