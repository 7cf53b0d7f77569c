//! Background eviction of idle token buckets.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::clock::Clock;
use super::limiter::RateLimiter;

/// Handle to a running sweeper task.
///
/// The task calls [`RateLimiter::evict_idle`] once per interval until
/// [`Sweeper::shutdown`] is called.
pub struct Sweeper {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Sweeper {
    /// Spawn a sweeper on the current tokio runtime.
    pub fn spawn<C: Clock + 'static>(limiter: Arc<RateLimiter<C>>, period: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; nothing is idle yet.
            ticker.tick().await;

            info!(interval = ?period, "Bucket sweeper started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let evicted = limiter.evict_idle();
                        debug!(evicted, buckets = limiter.bucket_count(), "Sweep complete");
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }

            info!("Bucket sweeper stopped");
        });

        Self {
            shutdown_tx,
            handle,
        }
    }

    /// Stop the sweeper and wait for the task to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.handle.await {
            warn!(error = %e, "Bucket sweeper task failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LimiterConfig;
    use crate::ratelimit::ManualClock;

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_evicts_idle_buckets() {
        let clock = ManualClock::new();
        let config = LimiterConfig::new(1.0, 1.0);
        let limiter = Arc::new(RateLimiter::with_config(&config, clock.clone()).unwrap());

        limiter.consume("user:1");
        limiter.consume("user:2");
        clock.advance(limiter.idle_ttl());

        let sweeper = Sweeper::spawn(limiter.clone(), Duration::from_secs(1));
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(limiter.bucket_count(), 0);
        sweeper.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_keeps_active_buckets() {
        let clock = ManualClock::new();
        let config = LimiterConfig::new(1.0, 1.0);
        let limiter = Arc::new(RateLimiter::with_config(&config, clock).unwrap());
        limiter.consume("user:1");

        let sweeper = Sweeper::spawn(limiter.clone(), Duration::from_secs(1));
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(limiter.bucket_count(), 1);
        sweeper.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_stops_task() {
        let limiter = Arc::new(RateLimiter::new(5.0, 1.0).unwrap());
        let sweeper = Sweeper::spawn(limiter, Duration::from_secs(3600));
        tokio::time::timeout(Duration::from_secs(5), sweeper.shutdown())
            .await
            .expect("sweeper did not stop");
    }
}
