//! Rate limiter trait used by request handlers.

/// Trait for rate limiter implementations.
///
/// Handlers depend on this trait rather than on [`super::RateLimiter`]
/// directly, so they can be driven by any clock or by a stub in tests.
pub trait RateLimiterBackend: Send + Sync {
    /// Take one permit for `key`, returning `false` when none is available.
    ///
    /// Never blocks on I/O and never fails.
    fn consume(&self, key: &str) -> bool;
}
