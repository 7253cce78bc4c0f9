//! Bounded busy-retry for lock contention.

use crate::error::{EditorError, EditorResult};
use log::warn;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Exponential backoff applied to `Busy` failures only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Zero behaves like one.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubled for each later attempt.
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1_000,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no waiting.
    pub fn never() -> Self {
        Self {
            max_attempts: 1,
            base_delay_ms: 0,
        }
    }

    /// Delay slept after the failed attempt with zero-based index `attempt`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
    }
}

/// Runs `op`, retrying while it fails with [`EditorError::Busy`].
///
/// Non-busy errors are returned immediately. After the last attempt the busy
/// error is surfaced unchanged so the caller can decide what to tell the user.
pub fn with_busy_retry<T>(
    policy: &RetryPolicy,
    mut op: impl FnMut() -> EditorResult<T>,
) -> EditorResult<T> {
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match op() {
            Err(err @ EditorError::Busy { .. }) if attempt + 1 < attempts => {
                let delay = policy.delay_after(attempt);
                warn!(
                    "event=busy_retry module=db status=retry attempt={} max_attempts={} delay_ms={} error={}",
                    attempt + 1,
                    attempts,
                    delay.as_millis(),
                    err
                );
                std::thread::sleep(delay);
                attempt += 1;
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{with_busy_retry, RetryPolicy};
    use crate::error::EditorError;
    use std::cell::Cell;
    use std::time::Duration;

    fn busy() -> EditorError {
        EditorError::Busy {
            context: "test".to_string(),
            message: "database is locked".to_string(),
        }
    }

    #[test]
    fn delay_doubles_per_attempt() {
        let policy = RetryPolicy {
            max_attempts: 4,
            base_delay_ms: 10,
        };
        assert_eq!(policy.delay_after(0), Duration::from_millis(10));
        assert_eq!(policy.delay_after(2), Duration::from_millis(40));
    }

    #[test]
    fn busy_errors_are_retried_until_success() {
        let calls = Cell::new(0);
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 0,
        };
        let value = with_busy_retry(&policy, || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(busy())
            } else {
                Ok(7)
            }
        })
        .unwrap();
        assert_eq!(value, 7);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn retries_are_bounded() {
        let calls = Cell::new(0);
        let policy = RetryPolicy {
            max_attempts: 2,
            base_delay_ms: 0,
        };
        let err = with_busy_retry(&policy, || -> Result<(), EditorError> {
            calls.set(calls.get() + 1);
            Err(busy())
        })
        .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn other_errors_are_not_retried() {
        let calls = Cell::new(0);
        let err = with_busy_retry(&RetryPolicy::default(), || -> Result<(), EditorError> {
            calls.set(calls.get() + 1);
            Err(EditorError::Engine {
                context: "test".to_string(),
                message: "no such table".to_string(),
            })
        })
        .unwrap_err();
        assert_eq!(err.code(), "engine");
        assert_eq!(calls.get(), 1);
    }
}
