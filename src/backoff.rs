//! Delay generation for retry loops.
//!
//! A [`Backoff`] maps an attempt number to a delay. [`Backoff::delays`]
//! turns that into a finite lazy sequence: the sequence ends after the first
//! attempt whose exponential delay reaches the configured ceiling, so the
//! number of retries is fixed by `start` and `maximum` alone.

use std::fmt;
use std::time::Duration;

use rand::Rng;

/// A retry delay strategy.
pub trait Backoff: fmt::Debug + Send + Sync {
    /// Scaling factor for computed delays.
    fn start(&self) -> Duration;

    /// Cap on computed delays.
    fn maximum(&self) -> Duration;

    /// Delay to wait before retry number `attempt` (zero-based).
    fn backoff(&self, attempt: u32) -> Duration;

    /// Lazy sequence of delays for one retry loop.
    fn delays(&self) -> Delays<'_>
    where
        Self: Sized,
    {
        Delays::new(self)
    }
}

/// `min(maximum, start * 2^attempt)`.
pub fn exponential_delay(start: Duration, maximum: Duration, attempt: u32) -> Duration {
    2u32.checked_pow(attempt)
        .and_then(|factor| start.checked_mul(factor))
        .unwrap_or(maximum)
        .min(maximum)
}

/// Iterator over the delays of a [`Backoff`].
#[derive(Debug)]
pub struct Delays<'a> {
    backoff: &'a dyn Backoff,
    attempt: u32,
    done: bool,
}

impl<'a> Delays<'a> {
    pub fn new(backoff: &'a dyn Backoff) -> Self {
        Self {
            backoff,
            attempt: 0,
            done: false,
        }
    }
}

impl Iterator for Delays<'_> {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.done {
            return None;
        }
        let attempt = self.attempt;
        let ceiling = self.backoff.maximum();
        if exponential_delay(self.backoff.start(), ceiling, attempt) >= ceiling {
            self.done = true;
        }
        self.attempt = self.attempt.saturating_add(1);
        Some(self.backoff.backoff(attempt))
    }
}

/// Exponentially increasing delay between attempts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExponentialBackoff {
    pub start: Duration,
    pub maximum: Duration,
}

impl ExponentialBackoff {
    pub fn new(start: Duration, maximum: Duration) -> Self {
        Self { start, maximum }
    }
}

impl Backoff for ExponentialBackoff {
    fn start(&self) -> Duration {
        self.start
    }

    fn maximum(&self) -> Duration {
        self.maximum
    }

    fn backoff(&self, attempt: u32) -> Duration {
        exponential_delay(self.start, self.maximum, attempt)
    }
}

/// Exponential backoff where each delay is drawn uniformly from
/// `[0, exponential(attempt)]`, spreading out concurrent retrying clients.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExponentialBackoffJitter {
    pub start: Duration,
    pub maximum: Duration,
}

impl ExponentialBackoffJitter {
    pub fn new(start: Duration, maximum: Duration) -> Self {
        Self { start, maximum }
    }
}

impl Backoff for ExponentialBackoffJitter {
    fn start(&self) -> Duration {
        self.start
    }

    fn maximum(&self) -> Duration {
        self.maximum
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let upper = exponential_delay(self.start, self.maximum, attempt);
        let upper_nanos = u64::try_from(upper.as_nanos()).unwrap_or(u64::MAX);
        Duration::from_nanos(rand::thread_rng().gen_range(0..=upper_nanos))
    }
}
