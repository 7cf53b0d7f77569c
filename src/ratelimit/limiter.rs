//! Core rate limiter implementation.

use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, trace};

use super::bucket::{Bucket, BucketPolicy};
use super::clock::{Clock, SystemClock};
use crate::config::LimiterConfig;
use crate::error::Result;

/// Per-key token bucket rate limiter.
///
/// Buckets live in a sharded map; each bucket has its own mutex, so calls
/// for different keys only share a shard read lock while calls for the same
/// key are serialized through the bucket's mutex. Idle buckets are removed by
/// [`RateLimiter::evict_idle`].
pub struct RateLimiter<C: Clock = SystemClock> {
    /// Token buckets indexed by key
    buckets: DashMap<String, Mutex<Bucket>>,
    /// Capacity and refill rate shared by every bucket
    policy: BucketPolicy,
    /// Idle time after which a bucket is indistinguishable from a fresh one
    idle_ttl: Duration,
    clock: C,
}

impl RateLimiter<SystemClock> {
    /// Create a new rate limiter on the system clock.
    pub fn new(capacity: f64, refill_rate: f64) -> Result<Self> {
        Self::with_config(&LimiterConfig::new(capacity, refill_rate), SystemClock::new())
    }
}

impl<C: Clock> RateLimiter<C> {
    /// Create a rate limiter from a validated configuration.
    pub fn with_config(config: &LimiterConfig, clock: C) -> Result<Self> {
        config.validate()?;

        let policy = BucketPolicy {
            capacity: config.capacity,
            refill_rate: config.refill_rate,
        };
        let idle_ttl = policy.full_refill().mul_f64(config.eviction_factor);

        Ok(Self {
            buckets: DashMap::new(),
            policy,
            idle_ttl,
            clock,
        })
    }

    /// Try to take one token for `key`.
    ///
    /// Returns `true` if the caller may proceed. Any string is a valid key;
    /// a previously unseen key starts with a full bucket.
    pub fn consume(&self, key: &str) -> bool {
        if let Some(bucket) = self.buckets.get(key) {
            return self.take(key, &bucket);
        }

        let bucket = self.buckets.entry(key.to_owned()).or_insert_with(|| {
            debug!(key = %key, capacity = self.policy.capacity, "Creating new token bucket");
            Mutex::new(Bucket::full(&self.policy, self.clock.now()))
        });
        // Downgrade so other keys in the shard are not held up by this bucket.
        let bucket = bucket.downgrade();
        self.take(key, &bucket)
    }

    fn take(&self, key: &str, bucket: &Mutex<Bucket>) -> bool {
        let mut bucket = bucket.lock();
        // Read the clock under the lock so timestamps stay ordered per key.
        let allowed = bucket.try_take(&self.policy, self.clock.now());

        trace!(key = %key, allowed, tokens = bucket.tokens(), "Consumed from token bucket");
        if !allowed {
            debug!(key = %key, "Rate limit exceeded");
        }
        allowed
    }

    /// Remove buckets that have been idle for at least [`idle_ttl`](Self::idle_ttl).
    ///
    /// Such buckets have fully refilled, so dropping them does not change any
    /// future decision. Returns the number of buckets removed.
    pub fn evict_idle(&self) -> usize {
        let now = self.clock.now();
        let before = self.buckets.len();

        self.buckets
            .retain(|_, bucket| !bucket.get_mut().is_idle(now, self.idle_ttl));

        let evicted = before.saturating_sub(self.buckets.len());
        if evicted > 0 {
            debug!(evicted, remaining = self.buckets.len(), "Evicted idle token buckets");
        }
        evicted
    }

    /// Tokens available for `key` as of its last operation.
    ///
    /// Returns `None` if no bucket exists for the key.
    pub fn available(&self, key: &str) -> Option<f64> {
        self.buckets.get(key).map(|bucket| bucket.lock().tokens())
    }

    /// Get the number of live buckets.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Idle time after which a bucket is evicted.
    pub fn idle_ttl(&self) -> Duration {
        self.idle_ttl
    }

    pub fn capacity(&self) -> f64 {
        self.policy.capacity
    }

    pub fn refill_rate(&self) -> f64 {
        self.policy.refill_rate
    }
}

impl<C: Clock> super::backend::RateLimiterBackend for RateLimiter<C> {
    fn consume(&self, key: &str) -> bool {
        RateLimiter::<C>::consume(self, key)
    }
}

impl<C: Clock> std::fmt::Debug for RateLimiter<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("policy", &self.policy)
            .field("idle_ttl", &self.idle_ttl)
            .field("buckets", &self.buckets.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::ManualClock;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;

    fn five_per_minute(clock: &ManualClock) -> RateLimiter<ManualClock> {
        RateLimiter::with_config(&LimiterConfig::new(5.0, 1.0 / 60.0), clock.clone()).unwrap()
    }

    #[test]
    fn test_rate_limiter_creation() {
        let limiter = RateLimiter::new(5.0, 1.0 / 60.0).unwrap();
        assert_eq!(limiter.bucket_count(), 0);
        assert_eq!(limiter.capacity(), 5.0);
        assert_eq!(limiter.idle_ttl(), Duration::from_secs(600));
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(RateLimiter::new(0.0, 1.0).is_err());
        assert!(RateLimiter::new(5.0, 0.0).is_err());
        assert!(RateLimiter::new(f64::INFINITY, 1.0).is_err());
    }

    #[test]
    fn test_exact_initial_allowance() {
        let clock = ManualClock::new();
        let limiter = five_per_minute(&clock);

        let results: Vec<bool> = (0..5).map(|_| limiter.consume("user:1")).collect();
        assert_eq!(results, vec![true; 5]);
        assert!(!limiter.consume("user:1"));
    }

    #[test]
    fn test_refill_after_denial() {
        let clock = ManualClock::new();
        let limiter = five_per_minute(&clock);
        for _ in 0..5 {
            limiter.consume("user:1");
        }
        assert!(!limiter.consume("user:1"));

        clock.advance(Duration::from_secs(60));
        assert!(limiter.consume("user:1"));
        assert!(!limiter.consume("user:1"));
    }

    #[test]
    fn test_full_refill_restores_capacity() {
        let clock = ManualClock::new();
        let limiter = five_per_minute(&clock);
        for _ in 0..5 {
            limiter.consume("user:1");
        }

        clock.advance(Duration::from_secs(300));
        for _ in 0..5 {
            assert!(limiter.consume("user:1"));
        }
        assert!(!limiter.consume("user:1"));
    }

    #[test]
    fn test_tokens_stay_within_bounds() {
        let clock = ManualClock::new();
        let limiter = five_per_minute(&clock);

        for step in 0..200u64 {
            limiter.consume("user:1");
            let tokens = limiter.available("user:1").unwrap();
            assert!((0.0..=5.0).contains(&tokens), "tokens out of range: {}", tokens);
            clock.advance(Duration::from_secs(step % 90));
        }
    }

    #[test]
    fn test_keys_are_independent() {
        let clock = ManualClock::new();
        let limiter = five_per_minute(&clock);

        for _ in 0..5 {
            assert!(limiter.consume("user:1"));
        }
        assert!(!limiter.consume("user:1"));
        assert!(limiter.consume("user:2"));
        assert_eq!(limiter.available("user:2"), Some(4.0));
    }

    #[test]
    fn test_interleaved_keys_total() {
        let clock = ManualClock::new();
        let limiter = five_per_minute(&clock);

        let allowed = (0..12)
            .flat_map(|_| [limiter.consume("user:1"), limiter.consume("user:2")])
            .filter(|allowed| *allowed)
            .count();
        assert_eq!(allowed, 10);
    }

    #[test]
    fn test_empty_key_is_a_regular_key() {
        let clock = ManualClock::new();
        let limiter = five_per_minute(&clock);

        for _ in 0..5 {
            assert!(limiter.consume(""));
        }
        assert!(!limiter.consume(""));
        assert!(limiter.consume("user:1"));
        assert_eq!(limiter.bucket_count(), 2);
    }

    #[test]
    fn test_new_key_starts_full() {
        let clock = ManualClock::new();
        clock.advance(Duration::from_secs(1_000));
        let limiter = five_per_minute(&clock);

        assert_eq!(limiter.available("fresh"), None);
        assert!(limiter.consume("fresh"));
        assert_eq!(limiter.available("fresh"), Some(4.0));
    }

    #[test]
    fn test_no_double_debit_under_contention() {
        let clock = ManualClock::new();
        let config = LimiterConfig::new(1.0, 1.0 / 3600.0);
        let limiter = Arc::new(RateLimiter::with_config(&config, clock).unwrap());

        let threads = 16;
        let barrier = Arc::new(Barrier::new(threads));
        let granted = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let limiter = limiter.clone();
                let barrier = barrier.clone();
                let granted = granted.clone();
                thread::spawn(move || {
                    barrier.wait();
                    if limiter.consume("user:42") {
                        granted.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(granted.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_contention_grants_exactly_capacity() {
        let clock = ManualClock::new();
        let config = LimiterConfig::new(50.0, 1.0);
        let limiter = Arc::new(RateLimiter::with_config(&config, clock).unwrap());

        let barrier = Arc::new(Barrier::new(8));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let limiter = limiter.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    let mut granted = 0;
                    for i in 0..100 {
                        // Mix in private keys so shards see unrelated traffic.
                        limiter.consume(&format!("other:{}:{}", t, i));
                        if limiter.consume("shared") {
                            granted += 1;
                        }
                    }
                    granted
                })
            })
            .collect();

        let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, 50);
    }

    #[test]
    fn test_evict_idle_buckets() {
        let clock = ManualClock::new();
        let limiter = five_per_minute(&clock);
        limiter.consume("user:1");

        clock.advance(Duration::from_secs(500));
        limiter.consume("user:2");

        clock.advance(Duration::from_secs(100));
        assert_eq!(limiter.evict_idle(), 1);
        assert_eq!(limiter.available("user:1"), None);
        assert!(limiter.available("user:2").is_some());
    }

    #[test]
    fn test_long_idle_ttl_does_not_evict_early() {
        let clock = ManualClock::new();
        // Full refill takes 1e10 s, so idle_ttl exceeds u64::MAX nanoseconds.
        let config = LimiterConfig::new(2.0, 2e-10);
        let kept = RateLimiter::with_config(&config, clock.clone()).unwrap();
        let swept = RateLimiter::with_config(&config, clock.clone()).unwrap();

        for limiter in [&kept, &swept] {
            assert!(limiter.consume("user:1"));
            assert!(limiter.consume("user:1"));
            assert!(!limiter.consume("user:1"));
        }

        clock.advance(Duration::from_secs(3_200_000_000));
        assert_eq!(swept.evict_idle(), 0);
        assert_eq!(swept.available("user:1"), Some(0.0));
        assert_eq!(kept.consume("user:1"), swept.consume("user:1"));
    }

    #[test]
    fn test_evict_idle_on_empty_limiter() {
        let clock = ManualClock::new();
        let limiter = five_per_minute(&clock);
        assert_eq!(limiter.evict_idle(), 0);
    }

    #[test]
    fn test_eviction_does_not_change_decisions() {
        let clock = ManualClock::new();
        let kept = five_per_minute(&clock);
        let evicted = five_per_minute(&clock);

        for _ in 0..5 {
            kept.consume("user:1");
            evicted.consume("user:1");
        }
        clock.advance(evicted.idle_ttl());
        assert_eq!(evicted.evict_idle(), 1);

        for _ in 0..7 {
            assert_eq!(kept.consume("user:1"), evicted.consume("user:1"));
        }
    }
}
