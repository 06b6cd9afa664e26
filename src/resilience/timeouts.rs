//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap upstream calls with a per-kind deadline
//! - Keep timeout errors distinct from transport errors
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timed-out upstream calls surface as 504 Gateway Timeout

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// The wrapped operation did not finish before its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("deadline of {0:?} elapsed")]
pub struct DeadlineElapsed(pub Duration);

/// Run `future` with a hard deadline.
pub async fn with_deadline<F, T>(deadline: Duration, future: F) -> Result<T, DeadlineElapsed>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(deadline, future)
        .await
        .map_err(|_| DeadlineElapsed(deadline))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fast_future_completes() {
        let value = with_deadline(Duration::from_millis(200), async { 7 }).await;
        assert_eq!(value, Ok(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_future_times_out() {
        let result = with_deadline(Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
        })
        .await;
        assert_eq!(result, Err(DeadlineElapsed(Duration::from_millis(50))));
    }
}
