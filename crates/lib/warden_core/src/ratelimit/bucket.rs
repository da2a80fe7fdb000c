//! Token bucket state for a single client.

use tokio::time::Instant;

/// Capped token count refilled continuously at a fixed rate.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    tokens: f64,
    capacity: f64,
    rate_per_sec: f64,
    last_refill: Instant,
    /// Last admission attempt; drives idle eviction only.
    last_seen: Instant,
}

impl TokenBucket {
    /// A full bucket.
    pub fn new(rate_per_sec: f64, burst: u32, now: Instant) -> Self {
        let capacity = f64::from(burst);
        Self {
            tokens: capacity,
            capacity,
            rate_per_sec,
            last_refill: now,
            last_seen: now,
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.rate_per_sec).min(self.capacity);
        self.last_refill = now;
    }

    /// Take one token if available. Never waits.
    pub fn try_acquire(&mut self, now: Instant) -> bool {
        self.refill(now);
        self.last_seen = now;
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    pub fn last_seen(&self) -> Instant {
        self.last_seen
    }

    /// Tokens currently available, after refilling up to `now`.
    pub fn available(&mut self, now: Instant) -> f64 {
        self.refill(now);
        self.tokens
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn starts_full_and_drains() {
        let now = Instant::now();
        let mut bucket = TokenBucket::new(1.0, 3, now);
        assert!(bucket.try_acquire(now));
        assert!(bucket.try_acquire(now));
        assert!(bucket.try_acquire(now));
        assert!(!bucket.try_acquire(now));
    }

    #[test]
    fn refills_at_rate_and_caps_at_burst() {
        let start = Instant::now();
        let mut bucket = TokenBucket::new(2.0, 4, start);
        for _ in 0..4 {
            assert!(bucket.try_acquire(start));
        }
        let later = start + Duration::from_millis(500);
        assert!((bucket.available(later) - 1.0).abs() < 1e-9);
        let much_later = start + Duration::from_secs(60);
        assert!((bucket.available(much_later) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn refused_attempts_still_count_as_activity() {
        let start = Instant::now();
        let mut bucket = TokenBucket::new(1.0, 1, start);
        assert!(bucket.try_acquire(start));
        let later = start + Duration::from_millis(10);
        assert!(!bucket.try_acquire(later));
        assert_eq!(bucket.last_seen(), later);
    }
}
