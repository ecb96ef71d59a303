// src/core/deadline.rs

use crate::core::error::ProbeError;
use std::future::Future;
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval, timeout};
use tracing::debug;

/// Runs `fut`, turning an expired deadline into `ProbeError::Timeout`.
pub async fn with_timeout<T, F>(limit: Duration, fut: F) -> Result<T, ProbeError>
where
    F: Future<Output = Result<T, ProbeError>>,
{
    timeout(limit, fut).await.map_err(|_| ProbeError::Timeout(limit))?
}

/// State reported by one attempt against an asynchronous remote job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollState<T> {
    Ready(T),
    Pending,
}

/// Calls `attempt` every `every` until it reports `Ready`, fails, or `deadline` passes.
///
/// The first attempt happens immediately. An attempt error ends polling at once.
pub async fn poll_until<T, F, Fut>(every: Duration, deadline: Duration, mut attempt: F) -> Result<T, ProbeError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<PollState<T>, ProbeError>>,
{
    let polling = async {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut attempts = 0u32;
        loop {
            ticker.tick().await;
            attempts += 1;
            match attempt().await? {
                PollState::Ready(value) => {
                    debug!(attempts, "Remote job ready.");
                    return Ok(value);
                }
                PollState::Pending => debug!(attempts, "Remote job still pending."),
            }
        }
    };
    with_timeout(deadline, polling).await
}
