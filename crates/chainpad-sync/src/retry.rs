//! Bounded retry loop.
//!
//! Settling a set of replicas is a loop of "deliver, sync, check". Every such
//! loop runs under a fixed attempt budget and fails with
//! [`SyncError::RetryExhausted`] instead of spinning forever.

use std::ops::ControlFlow;

use crate::error::{Result, SyncError};

/// Retries an attempt up to a fixed number of times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundedRetry {
    max_attempts: usize,
}

impl BoundedRetry {
    /// Create a retry budget of `max_attempts`.
    pub fn new(max_attempts: usize) -> Self {
        Self { max_attempts }
    }

    /// The attempt budget.
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Run `attempt` with the zero-based attempt number until it breaks.
    pub fn run<T>(&self, mut attempt: impl FnMut(usize) -> ControlFlow<T>) -> Result<T> {
        for n in 0..self.max_attempts {
            if let ControlFlow::Break(value) = attempt(n) {
                return Ok(value);
            }
        }
        tracing::warn!(attempts = self.max_attempts, "retry budget exhausted");
        Err(SyncError::RetryExhausted {
            attempts: self.max_attempts,
        })
    }
}

impl Default for BoundedRetry {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breaks_early() {
        let retry = BoundedRetry::new(10);
        let result = retry.run(|n| {
            if n == 3 {
                ControlFlow::Break(n)
            } else {
                ControlFlow::Continue(())
            }
        });
        assert_eq!(result, Ok(3));
    }

    #[test]
    fn test_exhausted() {
        let mut calls = 0;
        let result: Result<()> = BoundedRetry::new(5).run(|_| {
            calls += 1;
            ControlFlow::Continue(())
        });
        assert_eq!(result, Err(SyncError::RetryExhausted { attempts: 5 }));
        assert_eq!(calls, 5);
    }
}
