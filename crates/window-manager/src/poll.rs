//! Deadline-bounded polling shared by every wait-style window operation.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};

/// How long to keep probing and how long to sleep between probes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollPolicy {
    pub timeout: Duration,
    pub interval: Duration,
}

impl PollPolicy {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }

    /// Policy for a fixed number of retries spaced `interval` apart.
    pub fn from_retries(retries: u32, interval: Duration) -> Self {
        Self {
            timeout: interval.saturating_mul(retries),
            interval,
        }
    }
}

/// Runs `probe` until it yields `Some`, or until the policy deadline passes.
///
/// The probe always runs at least once. `Ok(None)` means the deadline expired;
/// an `Err` from the probe ends the wait immediately.
pub async fn poll_until<T, E, F, Fut>(policy: PollPolicy, mut probe: F) -> Result<Option<T>, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    let deadline = Instant::now() + policy.timeout;
    loop {
        if let Some(value) = probe().await? {
            return Ok(Some(value));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        sleep(policy.interval).await;
    }
}
