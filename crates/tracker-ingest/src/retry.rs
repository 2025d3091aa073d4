//! Bounded retry with jittered exponential backoff.
//!
//! Each attempt may be bounded by a deadline. The whole retry budget is
//! cancelled by dropping the future returned from [`RetryPolicy::run`].

use std::{future::Future, time::Duration};

use rand_core::{OsRng, RngCore as _};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  /// Total attempts, including the first. Treated as at least 1.
  pub max_attempts:    u32,
  /// Delay before the second attempt; doubles for each later one.
  pub base_delay:      Duration,
  pub max_delay:       Duration,
  /// Deadline for a single attempt. `None` waits indefinitely.
  pub attempt_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_attempts:    3,
      base_delay:      Duration::from_millis(25),
      max_delay:       Duration::from_secs(1),
      attempt_timeout: Some(Duration::from_secs(5)),
    }
  }
}

/// How a single attempt went wrong.
#[derive(Debug)]
pub enum Attempt<E> {
  Failed(E),
  TimedOut(Duration),
}

/// Every attempt failed; `last` is the final attempt's outcome.
#[derive(Debug)]
pub struct Exhausted<E> {
  pub attempts: u32,
  pub last:     Attempt<E>,
}

impl RetryPolicy {
  /// Retry back-to-back with no delay and no deadline.
  pub fn immediate(max_attempts: u32) -> Self {
    Self {
      max_attempts,
      base_delay: Duration::ZERO,
      max_delay: Duration::ZERO,
      attempt_timeout: None,
    }
  }

  /// Backoff before the attempt following failed attempt number `failed`
  /// (1-based), without jitter.
  pub fn backoff(&self, failed: u32) -> Duration {
    let factor = 1u32.checked_shl(failed.saturating_sub(1)).unwrap_or(u32::MAX);
    self.base_delay.saturating_mul(factor).min(self.max_delay)
  }

  /// [`Self::backoff`] plus up to 50% random jitter.
  fn jittered(&self, failed: u32) -> Duration {
    let delay = self.backoff(failed);
    let spread = delay.as_micros() as u64 / 2;
    if spread == 0 {
      return delay;
    }
    delay + Duration::from_micros(OsRng.next_u64() % (spread + 1))
  }

  /// Run `op` until it succeeds or the attempt budget is spent.
  pub async fn run<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<T, Exhausted<E>>
  where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
  {
    let max_attempts = self.max_attempts.max(1);
    let mut attempt = 1;

    loop {
      let outcome = match self.attempt_timeout {
        Some(limit) => match tokio::time::timeout(limit, op()).await {
          Ok(result) => result.map_err(Attempt::Failed),
          Err(_) => Err(Attempt::TimedOut(limit)),
        },
        None => op().await.map_err(Attempt::Failed),
      };

      let failure = match outcome {
        Ok(value) => return Ok(value),
        Err(failure) => failure,
      };

      match &failure {
        Attempt::Failed(e) => warn!(label, attempt, max_attempts, error = %e, "attempt failed"),
        Attempt::TimedOut(limit) => warn!(label, attempt, max_attempts, ?limit, "attempt timed out"),
      }

      if attempt >= max_attempts {
        return Err(Exhausted { attempts: attempt, last: failure });
      }

      let delay = self.jittered(attempt);
      if !delay.is_zero() {
        tokio::time::sleep(delay).await;
      }
      attempt += 1;
    }
  }
}
