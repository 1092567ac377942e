//! Request pacing for the embeddings endpoint.

use tokio::sync::Mutex;
use tokio::time::{sleep_until, Duration, Instant};

/// Spaces embedding requests at least `interval` apart.
///
/// Each caller reserves the next free slot under a short lock and then
/// waits for it outside the lock, so concurrent embeds queue up in slot
/// order without one caller's wait blocking the bookkeeping.
#[derive(Debug)]
pub struct EmbedPacer {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl EmbedPacer {
    /// At most `per_second` requests per second; zero means one.
    pub fn per_second(per_second: u32) -> Self {
        Self {
            interval: Duration::from_millis(1000 / u64::from(per_second.max(1))),
            next_slot: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait for this caller's slot.
    pub async fn wait_turn(&self) {
        let slot = {
            let mut next = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = next.map_or(now, |at| at.max(now));
            *next = Some(slot + self.interval);
            slot
        };
        sleep_until(slot).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    #[test]
    fn test_interval_from_rate() {
        assert_eq!(EmbedPacer::per_second(50).interval(), Duration::from_millis(20));
        assert_eq!(EmbedPacer::per_second(0).interval(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_request_is_not_delayed() {
        let pacer = EmbedPacer::per_second(1);
        let start = Instant::now();
        pacer.wait_turn().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_get_spaced_slots() {
        let pacer = Arc::new(EmbedPacer::per_second(10));
        let start = Instant::now();

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let pacer = Arc::clone(&pacer);
                tokio::spawn(async move {
                    pacer.wait_turn().await;
                    start.elapsed()
                })
            })
            .collect();

        let mut elapsed = Vec::new();
        for handle in handles {
            elapsed.push(handle.await.unwrap());
        }
        elapsed.sort();
        assert_eq!(elapsed[0], Duration::ZERO);
        assert!(elapsed[1] >= Duration::from_millis(100));
        assert!(elapsed[2] >= Duration::from_millis(200));
    }
}
