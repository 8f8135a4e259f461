//! Bounded retry with jittered exponential backoff.
//!
//! Admission attempts that lose a race inside the store (serialization
//! failure, deadlock, lock timeout) are rerun from the top. Only errors the
//! caller's predicate marks as transient are retried; anything else ends the
//! loop immediately.
//!
//! # Example
//!
//! ```rust
//! use slot_booking_runtime::retry::{RetryError, RetryPolicy, retry_with_predicate};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), RetryError<String>> {
//! let policy = RetryPolicy::builder()
//!     .max_retries(5)
//!     .initial_delay(Duration::from_millis(5))
//!     .max_delay(Duration::from_millis(200))
//!     .build();
//!
//! let value = retry_with_predicate(
//!     &policy,
//!     || async move { Ok::<_, String>(42) },
//!     |err: &String| err.contains("busy"),
//! )
//! .await?;
//! assert_eq!(value, 42);
//! # Ok(())
//! # }
//! ```

use rand::Rng;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;

/// Retry policy configuration for exponential backoff.
///
/// # Default Values
///
/// - `max_retries`: 3
/// - `initial_delay`: 5ms
/// - `max_delay`: 200ms
/// - `multiplier`: 2.0
/// - `jitter`: true (each delay is scaled by a random factor in `[0.5, 1.0]`)
///
/// Defaults are sized for lock contention, where the competing transaction
/// usually finishes within milliseconds.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt
    pub max_retries: usize,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Cap for the exponential delay
    pub max_delay: Duration,
    /// Growth factor between retries
    pub multiplier: f64,
    /// Randomize delays so contending callers spread out
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl RetryPolicy {
    /// Create a new policy builder.
    #[must_use]
    pub const fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder {
            max_retries: None,
            initial_delay: None,
            max_delay: None,
            multiplier: None,
            jitter: None,
        }
    }

    /// Total attempts this policy allows, the first one included.
    #[must_use]
    pub const fn max_attempts(&self) -> usize {
        self.max_retries.saturating_add(1)
    }

    /// Un-jittered delay before retry number `retry` (zero-based).
    ///
    /// `initial_delay * multiplier^retry`, capped at `max_delay`.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_possible_wrap,
        clippy::cast_sign_loss
    )]
    pub fn delay_for_attempt(&self, retry: usize) -> Duration {
        if retry == 0 {
            return self.initial_delay.min(self.max_delay);
        }
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let delay_ms = self.initial_delay.as_millis() as f64 * self.multiplier.powi(exponent);
        if !delay_ms.is_finite() || delay_ms >= self.max_delay.as_millis() as f64 {
            return self.max_delay;
        }
        Duration::from_millis(delay_ms as u64)
    }

    /// Delay actually slept before retry number `retry`.
    #[must_use]
    pub fn backoff(&self, retry: usize) -> Duration {
        let delay = self.delay_for_attempt(retry);
        if self.jitter && !delay.is_zero() {
            delay.mul_f64(rand::thread_rng().gen_range(0.5..=1.0))
        } else {
            delay
        }
    }
}

/// Builder for [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct RetryPolicyBuilder {
    max_retries: Option<usize>,
    initial_delay: Option<Duration>,
    max_delay: Option<Duration>,
    multiplier: Option<f64>,
    jitter: Option<bool>,
}

impl RetryPolicyBuilder {
    /// Set maximum number of retries.
    #[must_use]
    pub const fn max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Set initial delay before first retry.
    #[must_use]
    pub const fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = Some(delay);
        self
    }

    /// Set maximum delay (cap for exponential backoff).
    #[must_use]
    pub const fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = Some(delay);
        self
    }

    /// Set multiplier for exponential backoff.
    #[must_use]
    pub const fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = Some(multiplier);
        self
    }

    /// Enable or disable jitter.
    #[must_use]
    pub const fn jitter(mut self, jitter: bool) -> Self {
        self.jitter = Some(jitter);
        self
    }

    /// Build the [`RetryPolicy`].
    #[must_use]
    pub fn build(self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries.unwrap_or(3),
            initial_delay: self.initial_delay.unwrap_or(Duration::from_millis(5)),
            max_delay: self.max_delay.unwrap_or(Duration::from_millis(200)),
            multiplier: self.multiplier.unwrap_or(2.0),
            jitter: self.jitter.unwrap_or(true),
        }
    }
}

/// Why a retried operation gave up.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RetryError<E: fmt::Display> {
    /// The operation failed with an error the predicate does not retry.
    #[error("{0}")]
    Permanent(E),

    /// Every allowed attempt failed with a retryable error.
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted {
        /// Attempts made, the first one included
        attempts: usize,
        /// Error from the final attempt
        last: E,
    },
}

/// Retry an async operation while `is_retryable` holds for its error.
///
/// # Errors
///
/// - [`RetryError::Permanent`] as soon as a non-retryable error occurs
/// - [`RetryError::Exhausted`] once `policy.max_attempts()` attempts have
///   all failed with retryable errors
pub async fn retry_with_predicate<F, Fut, T, E, P>(
    policy: &RetryPolicy,
    mut operation: F,
    is_retryable: P,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
    P: Fn(&E) -> bool,
{
    let mut retry = 0;

    loop {
        match operation().await {
            Ok(result) => {
                if retry > 0 {
                    tracing::debug!(attempts = retry + 1, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(err) => {
                if !is_retryable(&err) {
                    return Err(RetryError::Permanent(err));
                }

                if retry >= policy.max_retries {
                    tracing::warn!(
                        attempts = retry + 1,
                        error = %err,
                        "Operation failed after max retries"
                    );
                    return Err(RetryError::Exhausted {
                        attempts: retry + 1,
                        last: err,
                    });
                }

                let delay = policy.backoff(retry);
                tracing::warn!(
                    retry,
                    delay_ms = delay.as_millis(),
                    error = %err,
                    "Transient failure, retrying"
                );
                sleep(delay).await;
                retry += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use slot_booking_core::StoreError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn no_jitter(max_retries: usize) -> RetryPolicy {
        RetryPolicy::builder()
            .max_retries(max_retries)
            .initial_delay(Duration::from_millis(1))
            .max_delay(Duration::from_millis(2))
            .jitter(false)
            .build()
    }

    fn lock_timeout() -> StoreError {
        StoreError::Conflict("canceling statement due to lock timeout".to_string())
    }

    #[test]
    fn default_delays_double_up_to_the_cap() {
        let policy = RetryPolicy::default();
        let delays: Vec<u128> = (0..7)
            .map(|retry| policy.delay_for_attempt(retry).as_millis())
            .collect();

        assert_eq!(delays, vec![5, 10, 20, 40, 80, 160, 200]);
        assert_eq!(policy.delay_for_attempt(usize::MAX), policy.max_delay);
    }

    #[test]
    fn initial_delay_above_cap_is_clamped() {
        let policy = RetryPolicy::builder()
            .initial_delay(Duration::from_millis(500))
            .max_delay(Duration::from_millis(50))
            .build();

        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(50));
        assert!(policy.backoff(3) <= Duration::from_millis(50));
    }

    #[test]
    fn max_attempts_counts_first_try() {
        assert_eq!(no_jitter(0).max_attempts(), 1);
        assert_eq!(RetryPolicy::default().max_attempts(), 4);
    }

    proptest! {
        #[test]
        fn jittered_backoff_stays_within_bounds(retry in 0usize..16) {
            let policy = RetryPolicy::builder()
                .initial_delay(Duration::from_millis(4))
                .max_delay(Duration::from_millis(100))
                .build();
            let ceiling = policy.delay_for_attempt(retry);
            let delay = policy.backoff(retry);
            let slack = Duration::from_micros(1);
            prop_assert!(delay <= ceiling + slack);
            prop_assert!(delay + slack >= ceiling / 2);
        }
    }

    #[tokio::test]
    async fn first_success_is_not_retried() {
        let calls = &AtomicUsize::new(0);

        let result = retry_with_predicate(
            &RetryPolicy::default(),
            || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, StoreError>("admitted")
            },
            StoreError::is_transient,
        )
        .await;

        assert_eq!(result, Ok("admitted"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn conflicts_are_retried_until_success() {
        let calls = &AtomicUsize::new(0);

        let result = retry_with_predicate(
            &no_jitter(3),
            || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(lock_timeout())
                } else {
                    Ok("admitted")
                }
            },
            StoreError::is_transient,
        )
        .await;

        assert_eq!(result, Ok("admitted"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn persistent_conflict_exhausts_with_last_error() {
        let calls = &AtomicUsize::new(0);

        let result = retry_with_predicate(
            &no_jitter(2),
            || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(lock_timeout())
            },
            StoreError::is_transient,
        )
        .await;

        assert_eq!(
            result,
            Err(RetryError::Exhausted {
                attempts: 3,
                last: lock_timeout(),
            })
        );
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn database_failure_stops_immediately() {
        let calls = &AtomicUsize::new(0);

        let result = retry_with_predicate(
            &no_jitter(5),
            || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(StoreError::Database("connection refused".to_string()))
            },
            StoreError::is_transient,
        )
        .await;

        assert_eq!(
            result,
            Err(RetryError::Permanent(StoreError::Database(
                "connection refused".to_string()
            )))
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
