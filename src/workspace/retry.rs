//! Fixed-schedule retry for network operations

use std::thread;
use std::time::Duration;

/// Pause before each retry; an operation gets `delays.len() + 1` attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
  delays: Vec<Duration>,
}

/// The last error and how many attempts were made
#[derive(Debug)]
pub struct RetryExhausted<E> {
  pub attempts: usize,
  pub last_error: E,
}

impl RetryPolicy {
  pub fn new(delays: Vec<Duration>) -> Self {
    Self { delays }
  }

  /// Run `op` until it succeeds or the schedule is exhausted. Every failure
  /// counts as transient.
  pub fn run<T, E, F>(&self, mut op: F) -> Result<T, RetryExhausted<E>>
  where
    E: std::fmt::Display,
    F: FnMut() -> Result<T, E>,
  {
    let mut attempts = 0;
    loop {
      attempts += 1;
      match op() {
        Ok(value) => return Ok(value),
        Err(err) => match self.delays.get(attempts - 1) {
          Some(delay) => {
            tracing::warn!("Attempt {} failed, retrying in {:?}: {}", attempts, delay, err);
            if !delay.is_zero() {
              thread::sleep(*delay);
            }
          }
          None => {
            return Err(RetryExhausted {
              attempts,
              last_error: err,
            });
          }
        },
      }
    }
  }
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self::new(vec![
      Duration::from_millis(500),
      Duration::from_millis(2500),
      Duration::from_millis(5000),
    ])
  }
}
