use std::fmt;
use std::future::Future;

use tokio::time::sleep;

use crate::backoff::{Backoff, Delays};

/// Runs `action` until it succeeds, `should_retry` rejects the error, or
/// `backoff` runs out of delays.
///
/// On persistent failure the action runs once more than the number of delays
/// the policy yields, and the last error is returned unchanged.
pub async fn retry_with_backoff<T, E, F, Fut, P>(
    label: &str,
    backoff: &dyn Backoff,
    mut action: F,
    should_retry: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: fmt::Display,
{
    let mut delays = Delays::new(backoff);
    let mut attempt = 1u32;

    loop {
        let err = match action().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !should_retry(&err) {
            return Err(err);
        }

        let Some(delay) = delays.next() else {
            tracing::warn!(label, attempts = attempt, error = %err, "retries exhausted");
            return Err(err);
        };

        tracing::info!(
            label,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "retrying after failure"
        );
        sleep(delay).await;
        attempt += 1;
    }
}
