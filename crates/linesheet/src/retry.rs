//! Bounded retries for calls to external collaborators.
//!
//! Every model call in a batch goes through a [`RetryPolicy`]: a fixed number of attempts with
//! a fixed pause in between. When the attempts run out the caller either gets the last error
//! ([`RetryPolicy::run`]) or a terminal fallback value ([`RetryPolicy::run_or`]), so one bad
//! product never aborts the batch.

use std::future::Future;

use super::*;

/// Default number of attempts per call.
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;

/// Default pause between attempts.
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(2);

/// How often, and how patiently, a failing call is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  /// Total attempts, at least 1
  pub max_attempts: usize,
  /// Pause between consecutive attempts
  pub backoff:      Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self { Self { max_attempts: DEFAULT_MAX_ATTEMPTS, backoff: DEFAULT_BACKOFF } }
}

impl RetryPolicy {
  /// Creates a policy. `max_attempts` below 1 is raised to 1.
  pub fn new(max_attempts: usize, backoff: Duration) -> Self {
    Self { max_attempts: max_attempts.max(1), backoff }
  }

  /// A policy that retries without pausing.
  pub fn immediate(max_attempts: usize) -> Self { Self::new(max_attempts, Duration::ZERO) }

  /// Runs `op` until it succeeds or the attempts are exhausted.
  ///
  /// `op` receives the 1-based attempt number. Each failure except the last is logged and
  /// followed by the backoff pause.
  ///
  /// # Errors
  ///
  /// Returns the error of the last attempt.
  ///
  /// ```
  /// use linesheet::{error::LinesheetError, retry::RetryPolicy};
  ///
  /// # tokio_test::block_on(async {
  /// let result = RetryPolicy::immediate(3)
  ///   .run("flaky call", |attempt| async move {
  ///     if attempt < 3 {
  ///       Err(LinesheetError::Api("busy".into()))
  ///     } else {
  ///       Ok(attempt)
  ///     }
  ///   })
  ///   .await;
  /// assert_eq!(result.unwrap(), 3);
  /// # });
  /// ```
  pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T>
  where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T>>, {
    let attempts = self.max_attempts.max(1);
    let mut attempt = 1;
    loop {
      match op(attempt).await {
        Ok(value) => {
          if attempt > 1 {
            debug!("{label} succeeded on attempt {attempt}");
          }
          return Ok(value);
        },
        Err(e) if attempt < attempts => {
          warn!("{label} failed (attempt {attempt}/{attempts}): {e}");
          if !self.backoff.is_zero() {
            tokio::time::sleep(self.backoff).await;
          }
          attempt += 1;
        },
        Err(e) => {
          warn!("{label} failed after {attempts} attempts: {e}");
          return Err(e);
        },
      }
    }
  }

  /// Like [`RetryPolicy::run`], but returns `fallback` once the attempts are exhausted.
  pub async fn run_or<T, F, Fut>(&self, label: &str, op: F, fallback: T) -> T
  where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T>>, {
    self.run(label, op).await.unwrap_or(fallback)
  }
}
