//! Fixed-size request bursts separated by a pause.

use std::future::Future;
use std::time::Duration;

use futures_util::future::join_all;
use log::info;

/// Number of completed items between progress log lines.
const PROGRESS_EVERY: usize = 1000;

/// Runs tasks in bursts of at most `burst_size`, pausing between bursts.
///
/// A burst always runs to completion; there is no cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BurstLimiter {
    burst_size: usize,
    pause: Duration,
}

impl BurstLimiter {
    pub fn new(burst_size: usize, pause: Duration) -> Self {
        Self {
            burst_size: burst_size.max(1),
            pause,
        }
    }

    pub fn burst_size(&self) -> usize {
        self.burst_size
    }

    pub fn pause(&self) -> Duration {
        self.pause
    }

    /// Results come back in input order.
    pub async fn run<I, T, F, Fut>(&self, items: Vec<I>, task: F) -> Vec<T>
    where
        F: Fn(I) -> Fut,
        Fut: Future<Output = T>,
    {
        let total = items.len();
        let mut results = Vec::with_capacity(total);
        let mut items = items.into_iter().peekable();

        while items.peek().is_some() {
            let burst: Vec<Fut> = items.by_ref().take(self.burst_size).map(&task).collect();
            let before = results.len();
            results.extend(join_all(burst).await);

            if results.len() / PROGRESS_EVERY > before / PROGRESS_EVERY {
                info!("Processed {}/{} records", results.len(), total);
            }
            if items.peek().is_some() && !self.pause.is_zero() {
                tokio::time::sleep(self.pause).await;
            }
        }

        results
    }
}

impl Default for BurstLimiter {
    fn default() -> Self {
        Self::new(25, Duration::from_secs(1))
    }
}
