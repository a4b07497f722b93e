//! Retry logic with exponential backoff
//!
//! This module provides configurable retry logic for transient failures.
//! It implements exponential backoff with optional jitter to prevent thundering herd.
//!
//! # Example
//!
//! ```no_run
//! use feedsync::retry::{IsRetryable, fetch_with_retry};
//! use feedsync::config::RetryConfig;
//!
//! #[derive(Debug)]
//! enum MyError {
//!     Transient,
//!     Permanent,
//! }
//!
//! impl std::fmt::Display for MyError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "{:?}", self)
//!     }
//! }
//!
//! impl IsRetryable for MyError {
//!     fn is_retryable(&self) -> bool {
//!         matches!(self, MyError::Transient)
//!     }
//! }
//!
//! # async fn example() -> Result<(), feedsync::retry::RetryExhausted<MyError>> {
//! let config = RetryConfig::default();
//! let result = fetch_with_retry(&config, |_attempt| async {
//!     // Your operation here
//!     Ok::<_, MyError>(())
//! }).await?;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::{Error, UpstreamError};
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (a credential was rejected, the network timed out) should return `true`.
/// Permanent failures (no credential left, storage failure) should return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for UpstreamError {
    fn is_retryable(&self) -> bool {
        match self {
            // Each attempt draws a fresh credential, so a rejected one is worth retrying
            UpstreamError::CredentialExpired { .. }
            | UpstreamError::RateLimited { .. }
            | UpstreamError::BadRequest { .. }
            | UpstreamError::Rejected { .. } => true,
            // Already the result of an exhausted retry loop
            UpstreamError::FetchFailed { .. } => false,
        }
    }
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            Error::Upstream(e) => e.is_retryable(),
            // HttpUpstream reports transport errors as UpstreamFailure; this arm
            // covers UpstreamApi implementations that surface reqwest errors directly
            Error::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            // The pool is empty; retrying immediately cannot help
            Error::NoAvailableCredential => false,
            Error::Database(_) | Error::Sqlx(_) => false,
            Error::Config { .. } => false,
            Error::NotFound(_) => false,
            Error::CrawlInProgress { .. } => false,
            Error::ShuttingDown => false,
            Error::Serialization(_) => false,
            Error::Other(_) => false,
        }
    }
}

/// Execute an async operation with exponential backoff retry logic
///
/// The operation receives the zero-based attempt number. It runs once, then up to
/// `config.max_attempts` more times while it keeps failing with retryable errors.
///
/// # Returns
///
/// Returns the successful result, or the last error together with the total number
/// of attempts made.
pub async fn fetch_with_retry<F, Fut, T, E>(
    config: &RetryConfig,
    mut operation: F,
) -> Result<T, RetryExhausted<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay;

    loop {
        match operation(attempt).await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::info!(attempts = attempt + 1, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < config.max_attempts => {
                attempt += 1;

                tracing::warn!(
                    error = %e,
                    attempt = attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis(),
                    "Operation failed, retrying"
                );

                let jittered_delay = if config.jitter {
                    add_jitter(delay)
                } else {
                    delay
                };

                if !jittered_delay.is_zero() {
                    tokio::time::sleep(jittered_delay).await;
                }

                let next_delay =
                    Duration::from_secs_f64(delay.as_secs_f64() * config.backoff_multiplier);
                delay = next_delay.min(config.max_delay);
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(
                        error = %e,
                        attempts = attempt + 1,
                        "Operation failed after all retry attempts exhausted"
                    );
                } else {
                    tracing::error!(
                        error = %e,
                        "Operation failed with non-retryable error"
                    );
                }
                return Err(RetryExhausted {
                    error: e,
                    attempts: attempt + 1,
                });
            }
        }
    }
}

/// Last error of a failed retry loop
#[derive(Debug)]
pub struct RetryExhausted<E> {
    /// Error returned by the final attempt
    pub error: E,
    /// Total attempts made, including the first
    pub attempts: u32,
}

/// Add random jitter to a delay to prevent thundering herd
///
/// Jitter is uniformly distributed between 0% and 100% of the delay.
/// This means the actual delay will be between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    let jittered_secs = delay.as_secs_f64() * (1.0 + jitter_factor);
    Duration::from_secs_f64(jittered_secs)
}
