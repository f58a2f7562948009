//! Bounded exponential backoff around generator calls.
//!
//! Only transient failures are retried. The wait before retry `n` (0-based) is
//! `base * 2^n + jitter`, with jitter drawn uniformly from `[0, max_jitter]`.
//! Waits are tokio sleeps, so nothing is held while backing off.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::error::GenerationError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
  pub max_attempts: u32,
  pub base_delay: Duration,
  pub max_jitter: Duration,
}

impl RetryPolicy {
  /// `max_attempts` is clamped to at least one call.
  pub fn new(max_attempts: u32, base_delay: Duration, max_jitter: Duration) -> Self {
    Self { max_attempts: max_attempts.max(1), base_delay, max_jitter }
  }

  /// Delay before the retry that follows failed attempt `attempt` (0-based).
  pub fn delay_for(&self, attempt: u32) -> Duration {
    let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
    let base = self.base_delay.saturating_mul(factor);
    let jitter_ms = self.max_jitter.as_millis() as u64;
    let jitter = if jitter_ms == 0 { 0 } else { rand::thread_rng().gen_range(0..=jitter_ms) };
    base.saturating_add(Duration::from_millis(jitter))
  }
}

/// Run `op` until it succeeds, fails fatally, or the attempt budget is spent.
/// The closure receives the 0-based attempt number.
pub async fn with_backoff<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, GenerationError>
where
  F: FnMut(u32) -> Fut,
  Fut: Future<Output = Result<T, GenerationError>>,
{
  let mut attempt = 0;
  loop {
    match op(attempt).await {
      Ok(v) => return Ok(v),
      Err(e) if e.is_transient() && attempt + 1 < policy.max_attempts => {
        let wait = policy.delay_for(attempt);
        warn!(
          target: "edmoti_backend",
          attempt = attempt + 1,
          max_attempts = policy.max_attempts,
          wait_ms = wait.as_millis() as u64,
          error = %e,
          "Transient generator failure; backing off"
        );
        tokio::time::sleep(wait).await;
        attempt += 1;
      }
      Err(e) => return Err(e),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::{Arc, Mutex};
  use tokio::time::Instant;

  fn rate_limited() -> GenerationError {
    GenerationError::Transient { status: Some(429), message: "Too Many Requests".into() }
  }

  fn policy(max: u32) -> RetryPolicy {
    RetryPolicy::new(max, Duration::from_millis(4000), Duration::from_millis(2000))
  }

  #[test]
  fn delay_doubles_and_stays_within_jitter() {
    let p = policy(5);
    for attempt in 0..4 {
      let d = p.delay_for(attempt).as_millis() as u64;
      let floor = 4000 * (1 << attempt);
      assert!(d >= floor && d <= floor + 2000, "attempt {attempt}: {d}");
    }
  }

  #[test]
  fn zero_attempts_still_calls_once() {
    assert_eq!(RetryPolicy::new(0, Duration::ZERO, Duration::ZERO).max_attempts, 1);
  }

  #[tokio::test(start_paused = true)]
  async fn succeeds_on_last_attempt_with_growing_waits() {
    let calls = Arc::new(Mutex::new(Vec::<Instant>::new()));
    let p = policy(5);
    let seen = calls.clone();
    let out = with_backoff(&p, move |attempt| {
      let seen = seen.clone();
      async move {
        seen.lock().unwrap().push(Instant::now());
        if attempt < 4 { Err(rate_limited()) } else { Ok("lesson") }
      }
    })
    .await;

    assert_eq!(out, Ok("lesson"));
    let stamps = calls.lock().unwrap().clone();
    assert_eq!(stamps.len(), 5);
    let gaps: Vec<Duration> = stamps.windows(2).map(|w| w[1] - w[0]).collect();
    for pair in gaps.windows(2) {
      assert!(pair[1] > pair[0], "waits not increasing: {:?}", gaps);
    }
    assert!(gaps[0] >= Duration::from_millis(4000));
  }

  #[tokio::test(start_paused = true)]
  async fn fatal_error_is_not_retried() {
    let count = Arc::new(Mutex::new(0u32));
    let c = count.clone();
    let out: Result<(), _> = with_backoff(&policy(5), move |_| {
      let c = c.clone();
      async move {
        *c.lock().unwrap() += 1;
        Err(GenerationError::Fatal("HTTP 400: bad request".into()))
      }
    })
    .await;
    assert!(matches!(out, Err(GenerationError::Fatal(_))));
    assert_eq!(*count.lock().unwrap(), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn exhausted_budget_returns_last_transient_error() {
    let count = Arc::new(Mutex::new(0u32));
    let c = count.clone();
    let out: Result<(), _> = with_backoff(&policy(3), move |attempt| {
      let c = c.clone();
      async move {
        *c.lock().unwrap() += 1;
        Err(GenerationError::Transient { status: Some(503), message: format!("try {attempt}") })
      }
    })
    .await;
    assert_eq!(*count.lock().unwrap(), 3);
    assert_eq!(out, Err(GenerationError::Transient { status: Some(503), message: "try 2".into() }));
  }
}
