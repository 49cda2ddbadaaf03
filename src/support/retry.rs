//! Exponential backoff with full jitter, used by transports to pace reconnect attempts.

use std::time::Duration;

use rand::Rng;

const BASE: Duration = Duration::from_millis(500);
const CAP: Duration = Duration::from_secs(30);

/// Backoff sequence: 0.5s -> 30s cap, full jitter.
#[derive(Debug, Clone)]
pub struct Backoff {
    attempt: u32,
}

impl Backoff {
    pub fn new() -> Self {
        Self { attempt: 0 }
    }

    /// Delay for the next attempt and advance the counter.
    pub fn next_delay(&mut self) -> Duration {
        let exp = BASE.saturating_mul(1 << self.attempt.min(16));
        let capped = exp.min(CAP);
        self.attempt += 1;
        let jittered_millis = rand::thread_rng().gen_range(0..=capped.as_millis().max(1) as u64);
        Duration::from_millis(jittered_millis)
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_stays_within_cap() {
        let mut b = Backoff::new();
        for _ in 0..40 {
            let d = b.next_delay();
            assert!(d <= CAP);
        }
    }

    #[test]
    fn reset_restarts_sequence() {
        let mut b = Backoff::new();
        for _ in 0..10 {
            b.next_delay();
        }
        b.reset();
        assert_eq!(b.attempt, 0);
    }
}
