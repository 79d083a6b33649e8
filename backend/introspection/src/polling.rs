use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use treeprobe_core::ProbeResult;

/// Bounded retry loop with a fixed interval and a deadline.
#[derive(Debug, Clone, Copy)]
pub struct Poller {
    interval: Duration,
    timeout: Duration,
}

impl Poller {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `attempt` until it yields `Some`, fails, or the deadline passes.
    ///
    /// `Ok(None)` from an attempt means "not yet"; errors stop the loop
    /// immediately. The final attempt is made at the deadline itself, and
    /// `Ok(None)` is returned if it too comes up empty. A timeout too large
    /// to add to the current instant means no deadline at all.
    pub async fn run<T, F, Fut>(&self, mut attempt: F) -> ProbeResult<Option<T>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ProbeResult<Option<T>>>,
    {
        let deadline = Instant::now().checked_add(self.timeout);
        loop {
            if let Some(value) = attempt().await? {
                return Ok(Some(value));
            }
            let now = Instant::now();
            let pause = match deadline {
                Some(deadline) if now >= deadline => return Ok(None),
                Some(deadline) => self.interval.min(deadline - now),
                None => self.interval,
            };
            sleep(pause).await;
        }
    }
}
