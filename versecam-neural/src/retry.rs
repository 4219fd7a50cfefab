//! Bounded retry with a fixed inter-attempt delay.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Run `op` up to `attempts` times, sleeping `delay` between attempts.
/// Returns the first success, or the last error once attempts are
/// exhausted. The caller decides what exhaustion means; the pipeline
/// downgrades it to a missing poem body rather than a failed job.
pub async fn retry_fixed<T, E, F, Fut>(attempts: u32, delay: Duration, mut op: F) -> Result<T, E>
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts => {
                warn!(attempt, error = %e, "attempt failed; retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                warn!(attempt, error = %e, "attempt failed; giving up");
                return Err(e);
            }
        }
    }
}
