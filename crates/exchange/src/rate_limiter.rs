use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

/// Enforces a minimum interval between consecutive requests to one venue.
///
/// Slots are handed out in call order; a caller whose slot lies in the future sleeps
/// until it, so two requests are never issued less than `min_interval` apart.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            next_slot: Mutex::new(None),
        }
    }

    /// Waits for the next free slot and returns the instant the caller was released at.
    pub async fn acquire(&self) -> Instant {
        let slot = {
            let mut next_slot = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = match *next_slot {
                Some(next) if next > now => next,
                _ => now,
            };
            *next_slot = Some(slot + self.min_interval);
            slot
        };

        if slot > Instant::now() {
            debug!("Rate limiter: waiting {:?} for next slot", slot - Instant::now());
            sleep_until(slot).await;
        }
        slot
    }
}
