//! Token bucket state.

use std::time::Duration;

const NANOS_PER_SEC: f64 = 1_000_000_000.0;

/// Slack applied to the admission check so that accumulated floating-point
/// error (e.g. 0.9999999999 after a full refill period) still admits.
pub const TOKEN_EPSILON: f64 = 1e-9;

/// Bucket parameters shared by every key of a limiter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketPolicy {
    /// Maximum tokens a bucket can hold
    pub capacity: f64,
    /// Tokens added per second
    pub refill_rate: f64,
}

impl BucketPolicy {
    /// Time for an empty bucket to refill completely.
    pub fn full_refill(&self) -> Duration {
        Duration::from_secs_f64(self.capacity / self.refill_rate)
    }
}

/// Per-key token bucket, refilled lazily on access.
#[derive(Debug, Clone)]
pub struct Bucket {
    /// Currently available tokens, within `[0, capacity]`
    tokens: f64,
    /// Clock timestamp of the last refill
    last_refill: u64,
}

impl Bucket {
    /// A full bucket as of `now`.
    pub fn full(policy: &BucketPolicy, now: u64) -> Self {
        Self {
            tokens: policy.capacity,
            last_refill: now,
        }
    }

    /// Refill for the time elapsed since the last refill, then try to take
    /// one token.
    ///
    /// Returns `true` if a token was taken. A clock that moved backwards
    /// counts as zero elapsed time.
    pub fn try_take(&mut self, policy: &BucketPolicy, now: u64) -> bool {
        self.refill(policy, now);

        if self.tokens + TOKEN_EPSILON >= 1.0 {
            self.tokens = (self.tokens - 1.0).max(0.0);
            true
        } else {
            false
        }
    }

    fn refill(&mut self, policy: &BucketPolicy, now: u64) {
        let elapsed = now.saturating_sub(self.last_refill) as f64 / NANOS_PER_SEC;
        self.tokens = (self.tokens + elapsed * policy.refill_rate).min(policy.capacity);
        self.last_refill = now;
    }

    /// Whether the bucket has been untouched for at least `ttl`.
    ///
    /// Compared in `u128`: a `ttl` beyond `u64::MAX` nanoseconds is never
    /// reached rather than wrapping to a shorter one.
    pub fn is_idle(&self, now: u64, ttl: Duration) -> bool {
        u128::from(now.saturating_sub(self.last_refill)) >= ttl.as_nanos()
    }

    /// Tokens as of the last operation.
    pub fn tokens(&self) -> f64 {
        self.tokens
    }

    pub fn last_refill(&self) -> u64 {
        self.last_refill
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEC: u64 = 1_000_000_000;

    fn five_per_minute() -> BucketPolicy {
        BucketPolicy {
            capacity: 5.0,
            refill_rate: 1.0 / 60.0,
        }
    }

    #[test]
    fn test_full_refill_duration() {
        assert_eq!(five_per_minute().full_refill(), Duration::from_secs(300));
    }

    #[test]
    fn test_take_until_empty() {
        let policy = five_per_minute();
        let mut bucket = Bucket::full(&policy, 0);

        for _ in 0..5 {
            assert!(bucket.try_take(&policy, 0));
        }
        assert!(!bucket.try_take(&policy, 0));
        assert_eq!(bucket.tokens(), 0.0);
    }

    #[test]
    fn test_refill_is_clamped_to_capacity() {
        let policy = five_per_minute();
        let mut bucket = Bucket::full(&policy, 0);

        assert!(bucket.try_take(&policy, 0));
        assert!(bucket.try_take(&policy, 3600 * SEC));
        assert_eq!(bucket.tokens(), 4.0);
    }

    #[test]
    fn test_one_period_refills_one_token() {
        let policy = five_per_minute();
        let mut bucket = Bucket::full(&policy, 0);
        for _ in 0..5 {
            bucket.try_take(&policy, 0);
        }

        assert!(!bucket.try_take(&policy, 59 * SEC));
        assert!(bucket.try_take(&policy, 60 * SEC));
        assert!(bucket.tokens() < 1.0);
    }

    #[test]
    fn test_denial_keeps_tokens() {
        let policy = BucketPolicy {
            capacity: 1.0,
            refill_rate: 1.0,
        };
        let mut bucket = Bucket::full(&policy, 0);
        assert!(bucket.try_take(&policy, 0));

        assert!(!bucket.try_take(&policy, SEC / 2));
        assert!((bucket.tokens() - 0.5).abs() < 1e-12);
        assert_eq!(bucket.last_refill(), SEC / 2);
    }

    #[test]
    fn test_clock_going_backwards_is_ignored() {
        let policy = five_per_minute();
        let mut bucket = Bucket::full(&policy, 100 * SEC);
        for _ in 0..5 {
            bucket.try_take(&policy, 100 * SEC);
        }

        assert!(!bucket.try_take(&policy, 10 * SEC));
        assert_eq!(bucket.tokens(), 0.0);
    }

    #[test]
    fn test_is_idle() {
        let policy = five_per_minute();
        let bucket = Bucket::full(&policy, 10 * SEC);

        assert!(!bucket.is_idle(15 * SEC, Duration::from_secs(10)));
        assert!(bucket.is_idle(20 * SEC, Duration::from_secs(10)));
        assert!(!bucket.is_idle(0, Duration::from_secs(10)));
    }

    #[test]
    fn test_is_idle_with_ttl_beyond_u64_nanos() {
        let policy = five_per_minute();
        let bucket = Bucket::full(&policy, 0);
        // 2e10 seconds does not fit in u64 nanoseconds.
        let ttl = Duration::from_secs(20_000_000_000);

        assert!(!bucket.is_idle(3_200_000_000 * SEC, ttl));
        assert!(!bucket.is_idle(u64::MAX, ttl));
    }
}
