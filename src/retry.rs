//! Bounded retry for storage operations.
//!
//! Transient failures are retried immediately, without backoff, up to a fixed
//! number of attempts. Exhaustion is reported as
//! [`Error::RetriesExhausted`] so callers can tell "no data" apart from
//! "storage unreachable".

use tracing::warn;

use crate::config::RetryConfig;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
}

impl RetryPolicy {
    /// Create a policy allowing `max_attempts` tries (at least one).
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run `op`, retrying while it fails with a transient error.
    ///
    /// # Errors
    /// Returns the first non-transient error unchanged, or
    /// [`Error::RetriesExhausted`] wrapping the last transient error.
    pub fn run<T, F>(&self, operation: &'static str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Result<T>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() => {
                    warn!(operation, attempt, error = %e, "Transient storage failure");
                    if attempt >= self.max_attempts {
                        return Err(Error::RetriesExhausted {
                            operation,
                            attempts: attempt,
                            last: Box::new(e),
                        });
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;

    fn busy() -> Error {
        StorageError::Busy("database is locked".into()).into()
    }

    #[test]
    fn succeeds_after_transient_failures() {
        let policy = RetryPolicy::new(5);
        let mut calls = 0;
        let value = policy
            .run("read", || {
                calls += 1;
                if calls < 4 {
                    Err(busy())
                } else {
                    Ok(calls)
                }
            })
            .unwrap();
        assert_eq!(value, 4);
        assert_eq!(calls, 4);
    }

    #[test]
    fn exhaustion_is_reported_not_swallowed() {
        let policy = RetryPolicy::new(5);
        let mut calls = 0;
        let err = policy
            .run::<(), _>("read", || {
                calls += 1;
                Err(busy())
            })
            .unwrap_err();

        assert_eq!(calls, 5);
        match err {
            Error::RetriesExhausted {
                operation,
                attempts,
                last,
            } => {
                assert_eq!(operation, "read");
                assert_eq!(attempts, 5);
                assert!(last.is_transient());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn permanent_errors_are_not_retried() {
        let policy = RetryPolicy::new(5);
        let mut calls = 0;
        let err = policy
            .run::<(), _>("write", || {
                calls += 1;
                Err(StorageError::Database("constraint failed".into()).into())
            })
            .unwrap_err();
        assert_eq!(calls, 1);
        assert!(matches!(err, Error::Storage(StorageError::Database(_))));
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        let policy = RetryPolicy::new(0);
        assert_eq!(policy.max_attempts(), 1);
        assert_eq!(policy.run("noop", || Ok(7)).unwrap(), 7);
    }
}
