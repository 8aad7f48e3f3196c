//! Bounded Retry
//!
//! Runs a fallible command until it succeeds or the attempt ceiling is reached,
//! sleeping a fixed interval between attempts. There is no backoff growth and no
//! error classification: every failure is retried the same way.

use crate::error::{AdminError, AdminResult};

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Attempt ceiling and fixed pause between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub interval_secs: u64,
}

impl RetryPolicy {
    /// `max_attempts` is clamped to at least one attempt.
    pub fn new(max_attempts: u32, interval_secs: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval_secs,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(10, 5)
    }
}

/// Cooperative cancellation, observed only between attempts.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    flag: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Retry driver for a single logical command.
#[derive(Debug, Clone)]
pub struct Retry {
    policy: RetryPolicy,
    cancel: Option<CancelFlag>,
}

impl Retry {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            cancel: None,
        }
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Runs `operation` until it returns `Ok`, or fails with
    /// [`AdminError::RetryExhausted`] carrying the attempt count and last cause.
    ///
    /// Attempts never overlap: the next one starts only after the previous
    /// future has resolved and the interval has elapsed.
    pub async fn run<T, F, Fut>(&self, name: &str, mut operation: F) -> AdminResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AdminResult<T>>,
    {
        let mut attempts: u32 = 0;

        loop {
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            attempts += 1;
            tracing::error!("Command '{}' failed: {}", name, err);

            if attempts >= self.policy.max_attempts {
                tracing::error!(
                    "Command '{}' gave up after {} attempt(s)",
                    name,
                    attempts
                );
                return Err(AdminError::RetryExhausted {
                    attempts,
                    source: Box::new(err),
                });
            }

            tracing::warn!(
                "Command '{}' failed, tries again in {}s (tries: {})",
                name,
                self.policy.interval_secs,
                attempts
            );
            tokio::time::sleep(self.policy.interval()).await;

            if self.cancel.as_ref().is_some_and(|c| c.is_cancelled()) {
                tracing::info!("Command '{}' cancelled after {} attempt(s)", name, attempts);
                return Err(AdminError::Cancelled { attempts });
            }
        }
    }
}
