//! Back-off policies deciding whether, and how long, to wait before a retry.
//!
//! A [`BackOffPolicy`] is consulted by the request loop after every attempt
//! that produced a response. The policy is reset at the start of every
//! request, so a single instance must not be shared between requests that run
//! at the same time.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use bare_connection::clients::{BackOffPolicy, ExponentialBackOffPolicy};
//!
//! let policy = ExponentialBackOffPolicy::builder()
//!     .retry_status_code(503)
//!     .retry_status_code(429)
//!     .initial_sleep(Duration::from_millis(250))
//!     .max_sleep(Duration::from_secs(10))
//!     .build();
//!
//! assert!(policy.is_back_off_required(429));
//! assert!(!policy.is_back_off_required(500));
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use crate::clients::http_response::SC_UNAVAILABLE;

/// Default growth factor between two delays.
pub const DEFAULT_MULTIPLIER: f64 = 1.5;

/// Default first delay.
pub const DEFAULT_INITIAL_SLEEP: Duration = Duration::from_millis(500);

/// Default delay ceiling; once reached the policy gives up.
pub const DEFAULT_MAX_SLEEP: Duration = Duration::from_millis(30000);

/// Random offset, in milliseconds, applied to every computed delay.
const JITTER_MILLIS: i64 = 100;

/// Strategy deciding whether a response warrants a retry and how long to wait.
pub trait BackOffPolicy: Send {
    /// Returns `true` if a response with this status should be retried.
    fn is_back_off_required(&self, status_code: u16) -> bool;

    /// Waits before the next attempt.
    ///
    /// Returns `true` if the caller should retry, `false` once the delay
    /// budget is exhausted or the wait was interrupted.
    fn back_off(&mut self) -> bool;

    /// Restores the initial delay.
    fn reset(&mut self);
}

/// Marker returned by a [`Sleeper`] whose wait was cut short.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SleepInterrupted;

/// The blocking wait used between attempts.
pub trait Sleeper: Send + Sync {
    /// Blocks for `duration`.
    ///
    /// # Errors
    ///
    /// Returns [`SleepInterrupted`] if the wait did not complete.
    fn sleep(&self, duration: Duration) -> Result<(), SleepInterrupted>;
}

impl<F> Sleeper for F
where
    F: Fn(Duration) -> Result<(), SleepInterrupted> + Send + Sync,
{
    fn sleep(&self, duration: Duration) -> Result<(), SleepInterrupted> {
        self(duration)
    }
}

/// Sleeps on the current thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) -> Result<(), SleepInterrupted> {
        std::thread::sleep(duration);
        Ok(())
    }
}

/// Exponential, jittered back-off.
///
/// Each call to [`back_off`](BackOffPolicy::back_off) sleeps for the current
/// delay, then grows it to `delay * multiplier ± 100ms`. The delay never
/// shrinks except through [`reset`](BackOffPolicy::reset). Once the delay
/// reaches the maximum, the policy stops sleeping and reports that the caller
/// should give up.
///
/// The default policy retries only `503 Service Unavailable`.
pub struct ExponentialBackOffPolicy {
    retry_status_codes: BTreeSet<u16>,
    multiplier: f64,
    initial_delay: u64,
    max_delay: u64,
    current_delay: u64,
    sleeper: Arc<dyn Sleeper>,
}

impl fmt::Debug for ExponentialBackOffPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExponentialBackOffPolicy")
            .field("retry_status_codes", &self.retry_status_codes)
            .field("multiplier", &self.multiplier)
            .field("initial_delay", &self.initial_delay)
            .field("max_delay", &self.max_delay)
            .field("current_delay", &self.current_delay)
            .finish_non_exhaustive()
    }
}

impl ExponentialBackOffPolicy {
    /// Creates a policy from explicit values.
    ///
    /// A multiplier below 1 is raised to 1, and a maximum below the initial
    /// delay is raised to the initial delay.
    #[must_use]
    pub fn new(
        retry_status_codes: impl IntoIterator<Item = u16>,
        multiplier: f64,
        initial_sleep: Duration,
        max_sleep: Duration,
    ) -> Self {
        let initial_delay = millis(initial_sleep);
        Self {
            retry_status_codes: retry_status_codes.into_iter().collect(),
            multiplier: if multiplier.is_nan() || multiplier < 1.0 {
                1.0
            } else {
                multiplier
            },
            initial_delay,
            max_delay: millis(max_sleep).max(initial_delay),
            current_delay: initial_delay,
            sleeper: Arc::new(ThreadSleeper),
        }
    }

    /// Creates a new builder with the default delays and no retryable codes.
    #[must_use]
    pub fn builder() -> ExponentialBackOffPolicyBuilder {
        ExponentialBackOffPolicyBuilder::new()
    }

    /// Returns the delay the next back-off will sleep for.
    #[must_use]
    pub const fn current_delay(&self) -> Duration {
        Duration::from_millis(self.current_delay)
    }

    /// Returns the delay restored by a reset.
    #[must_use]
    pub const fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay)
    }

    /// Returns the delay ceiling.
    #[must_use]
    pub const fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay)
    }

    /// Returns the growth factor.
    #[must_use]
    pub const fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Returns the status codes that trigger a back-off.
    pub fn retry_status_codes(&self) -> impl Iterator<Item = u16> + '_ {
        self.retry_status_codes.iter().copied()
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )]
    fn advance(&mut self) {
        let jitter = rand::thread_rng().gen_range(-JITTER_MILLIS..JITTER_MILLIS);
        let scaled = (self.current_delay as f64 * self.multiplier) as i64;
        let next = scaled.saturating_add(jitter).max(0) as u64;
        self.current_delay = next.max(self.current_delay);
    }
}

impl Default for ExponentialBackOffPolicy {
    fn default() -> Self {
        Self::builder().retry_status_code(SC_UNAVAILABLE).build()
    }
}

impl BackOffPolicy for ExponentialBackOffPolicy {
    fn is_back_off_required(&self, status_code: u16) -> bool {
        self.retry_status_codes.contains(&status_code)
    }

    fn back_off(&mut self) -> bool {
        if self.current_delay >= self.max_delay {
            return false;
        }
        let delay = Duration::from_millis(self.current_delay);
        self.advance();
        self.sleeper.sleep(delay).is_ok()
    }

    fn reset(&mut self) {
        self.current_delay = self.initial_delay;
    }
}

/// Builder for constructing [`ExponentialBackOffPolicy`] instances.
///
/// # Defaults
///
/// - `multiplier`: 1.5
/// - `initial_sleep`: 500 ms
/// - `max_sleep`: 30 s
/// - retryable status codes: none
/// - sleeper: [`ThreadSleeper`]
pub struct ExponentialBackOffPolicyBuilder {
    retry_status_codes: Vec<u16>,
    multiplier: f64,
    initial_sleep: Duration,
    max_sleep: Duration,
    sleeper: Arc<dyn Sleeper>,
}

impl fmt::Debug for ExponentialBackOffPolicyBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExponentialBackOffPolicyBuilder")
            .field("retry_status_codes", &self.retry_status_codes)
            .field("multiplier", &self.multiplier)
            .field("initial_sleep", &self.initial_sleep)
            .field("max_sleep", &self.max_sleep)
            .finish_non_exhaustive()
    }
}

impl Default for ExponentialBackOffPolicyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ExponentialBackOffPolicyBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            retry_status_codes: Vec::new(),
            multiplier: DEFAULT_MULTIPLIER,
            initial_sleep: DEFAULT_INITIAL_SLEEP,
            max_sleep: DEFAULT_MAX_SLEEP,
            sleeper: Arc::new(ThreadSleeper),
        }
    }

    /// Registers a status code that triggers a back-off. Duplicates are ignored.
    #[must_use]
    pub fn retry_status_code(mut self, status_code: u16) -> Self {
        if !self.retry_status_codes.contains(&status_code) {
            self.retry_status_codes.push(status_code);
        }
        self
    }

    /// Sets the growth factor between delays.
    #[must_use]
    pub const fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Sets the first delay.
    #[must_use]
    pub const fn initial_sleep(mut self, initial_sleep: Duration) -> Self {
        self.initial_sleep = initial_sleep;
        self
    }

    /// Sets the delay ceiling.
    #[must_use]
    pub const fn max_sleep(mut self, max_sleep: Duration) -> Self {
        self.max_sleep = max_sleep;
        self
    }

    /// Replaces the blocking wait.
    #[must_use]
    pub fn sleeper(mut self, sleeper: impl Sleeper + 'static) -> Self {
        self.sleeper = Arc::new(sleeper);
        self
    }

    /// Builds the [`ExponentialBackOffPolicy`].
    #[must_use]
    pub fn build(self) -> ExponentialBackOffPolicy {
        let mut policy = ExponentialBackOffPolicy::new(
            self.retry_status_codes,
            self.multiplier,
            self.initial_sleep,
            self.max_sleep,
        );
        policy.sleeper = self.sleeper;
        policy
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
