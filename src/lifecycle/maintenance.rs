//! Background sweeper for in-memory gate state.
//!
//! Expired limiter windows and stale upstream failures are dropped on a
//! fixed interval so memory stays bounded by active clients.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

use crate::observability::metrics;
use crate::security::FixedWindowRateLimiter;
use crate::upstream::ErrorCache;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepReport {
    pub limiter_entries_removed: usize,
    pub cached_failures_removed: usize,
}

pub struct Maintenance {
    limiter: Arc<FixedWindowRateLimiter>,
    error_cache: Arc<ErrorCache>,
    interval: Duration,
}

impl Maintenance {
    pub fn new(
        limiter: Arc<FixedWindowRateLimiter>,
        error_cache: Arc<ErrorCache>,
        interval: Duration,
    ) -> Self {
        Self {
            limiter,
            error_cache,
            interval,
        }
    }

    pub fn sweep(&self) -> SweepReport {
        let report = SweepReport {
            limiter_entries_removed: self.limiter.cleanup(),
            cached_failures_removed: self.error_cache.purge_expired(),
        };
        metrics::set_limiter_keys(self.limiter.len());
        report
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Maintenance sweeper starting");

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
        // The first tick completes immediately; nothing to sweep yet.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.sweep();
                    if report != SweepReport::default() {
                        tracing::debug!(
                            limiter_entries_removed = report.limiter_entries_removed,
                            cached_failures_removed = report.cached_failures_removed,
                            tracked_keys = self.limiter.len(),
                            "Maintenance sweep"
                        );
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Maintenance sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::ManualClock;

    fn setup() -> (Arc<ManualClock>, Arc<FixedWindowRateLimiter>, Arc<ErrorCache>) {
        let clock = Arc::new(ManualClock::new(1_000));
        let limiter = Arc::new(FixedWindowRateLimiter::with_clock(
            5,
            Duration::from_secs(60),
            clock.clone(),
        ));
        let cache = Arc::new(ErrorCache::new(Duration::ZERO, 10));
        (clock, limiter, cache)
    }

    #[test]
    fn test_sweep_removes_expired_state() {
        let (clock, limiter, cache) = setup();
        limiter.check_limit("a");
        limiter.check_limit("b");
        cache.record("fp", "boom");

        let maintenance = Maintenance::new(limiter.clone(), cache, Duration::from_secs(60));
        let report = maintenance.sweep();
        assert_eq!(report.limiter_entries_removed, 0);
        assert_eq!(report.cached_failures_removed, 1);

        clock.advance(Duration::from_secs(61));
        limiter.check_limit("c");
        let report = maintenance.sweep();
        assert_eq!(report.limiter_entries_removed, 2);
        assert_eq!(limiter.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_sweeps_until_shutdown() {
        let (clock, limiter, cache) = setup();
        limiter.check_limit("a");
        clock.advance(Duration::from_secs(120));

        let (tx, rx) = broadcast::channel(1);
        let task = tokio::spawn(
            Maintenance::new(limiter.clone(), cache, Duration::from_secs(1)).run(rx),
        );

        time::sleep(Duration::from_millis(1_500)).await;
        assert!(limiter.is_empty());

        tx.send(()).unwrap();
        task.await.unwrap();
    }
}
