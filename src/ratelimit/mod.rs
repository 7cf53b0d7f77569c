//! Token bucket rate limiting.

mod backend;
mod bucket;
mod clock;
mod key;
mod limiter;
mod sweeper;

pub use backend::RateLimiterBackend;
pub use bucket::{Bucket, BucketPolicy, TOKEN_EPSILON};
pub use clock::{Clock, SystemClock};
#[cfg(test)]
pub use clock::ManualClock;
pub use key::LimitKey;
pub use limiter::RateLimiter;
pub use sweeper::Sweeper;
