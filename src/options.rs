use std::sync::Arc;

use crate::backoff::{Backoff, ExponentialBackoffJitter};
use crate::settings::{
    DEFAULT_IDEMPOTENT_RETRY_INITIAL_WAIT, DEFAULT_IDEMPOTENT_RETRY_MAX_WAIT,
    DEFAULT_IN_PROGRESS_CODE, DEFAULT_RETRY_INITIAL_WAIT, DEFAULT_RETRY_MAX_WAIT, DEFAULT_TIMEOUT,
};

/// Configures timeout, retry and logging behavior of a client.
#[derive(Clone, Debug)]
pub struct ClientOptions {
    /// Per-attempt timeout in milliseconds.
    pub timeout_ms: u64,
    /// Policy for transient failures (transport errors, retryable API errors).
    pub retry: Arc<dyn Backoff>,
    /// Policy for polling an idempotent request the server reports as still
    /// running.
    pub idempotent_retry: Arc<dyn Backoff>,
    /// Error code that signals an idempotent request is still running.
    pub in_progress_code: String,
    /// Log response headers and bodies of failed requests at `info` instead
    /// of `debug`.
    pub verbose_errors: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            retry: Arc::new(ExponentialBackoffJitter::new(
                DEFAULT_RETRY_INITIAL_WAIT,
                DEFAULT_RETRY_MAX_WAIT,
            )),
            idempotent_retry: Arc::new(ExponentialBackoffJitter::new(
                DEFAULT_IDEMPOTENT_RETRY_INITIAL_WAIT,
                DEFAULT_IDEMPOTENT_RETRY_MAX_WAIT,
            )),
            in_progress_code: DEFAULT_IN_PROGRESS_CODE.to_owned(),
            verbose_errors: false,
        }
    }
}

/// Per-call overrides for [`crate::McdClient::execute_with`].
///
/// Unset fields fall back to the client's [`ClientOptions`].
#[derive(Clone, Debug, Default)]
pub struct CallOptions {
    pub timeout_ms: Option<u64>,
    pub retry: Option<Arc<dyn Backoff>>,
    /// Sent as the idempotency header; enables in-progress polling.
    pub idempotency_key: Option<String>,
    pub idempotent_retry: Option<Arc<dyn Backoff>>,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn retry(mut self, backoff: impl Backoff + 'static) -> Self {
        self.retry = Some(Arc::new(backoff));
        self
    }

    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    pub fn idempotent_retry(mut self, backoff: impl Backoff + 'static) -> Self {
        self.idempotent_retry = Some(Arc::new(backoff));
        self
    }
}
