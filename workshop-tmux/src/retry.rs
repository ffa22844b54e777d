//! Bounded retry for tmux calls that may transiently fail, such as keystroke
//! delivery to a pane whose process is still starting.
//!
//! The policy is deliberately flat: a fixed number of attempts separated by a
//! fixed pause.

use std::time::Duration;

use crate::error::TmuxError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub attempts: u32,
    /// Pause between attempts.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, backoff: Duration) -> Self {
        Self { attempts, backoff }
    }

    /// Run `op` until it succeeds or the attempts are used up; the last error
    /// is returned.
    pub fn run<T, F>(&self, label: &str, mut op: F) -> Result<T, TmuxError>
    where
        F: FnMut() -> Result<T, TmuxError>,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::debug!(label, attempt, "succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if attempt < attempts => {
                    tracing::warn!(label, attempt, attempts, error = %err, "retrying");
                    if !self.backoff.is_zero() {
                        std::thread::sleep(self.backoff);
                    }
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
