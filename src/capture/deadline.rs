//! Session deadline used as a cooperative cancellation token.
//!
//! Waits that have no bound of their own (navigation to network idle, the
//! settle loop) race against the deadline instead of polling it.

use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Absolute point in time after which the session stops waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    /// Deadline `budget` from now.
    #[must_use]
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now() + budget,
        }
    }

    #[must_use]
    pub fn at(at: Instant) -> Self {
        Self { at }
    }

    #[must_use]
    pub fn instant(&self) -> Instant {
        self.at
    }

    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.at
    }

    /// Drive `operation` until it completes or the deadline passes.
    ///
    /// Returns `None` when the deadline won; the future is dropped.
    pub async fn run<F, T>(&self, operation: F) -> Option<T>
    where
        F: Future<Output = T>,
    {
        tokio::time::timeout_at(self.at, operation).await.ok()
    }

    /// Sleep for `duration`, cut short by the deadline.
    ///
    /// Returns `false` when the deadline was reached.
    pub async fn sleep(&self, duration: Duration) -> bool {
        let wake = Instant::now() + duration;
        if wake >= self.at {
            tokio::time::sleep_until(self.at).await;
            false
        } else {
            tokio::time::sleep_until(wake).await;
            true
        }
    }
}

/// Run a fallible operation with its own timeout, nested inside the deadline.
///
/// The effective bound is whichever of `timeout` and the deadline comes first.
pub async fn with_timeout<F, T>(
    deadline: &Deadline,
    operation: F,
    timeout: Duration,
    operation_name: &str,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let bound = deadline.remaining().min(timeout);
    match tokio::time::timeout(bound, operation).await {
        Ok(result) => result,
        Err(_) => Err(anyhow::anyhow!(
            "{operation_name} timeout after {} ms",
            bound.as_millis()
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn run_returns_none_after_deadline() {
        let deadline = Deadline::after(Duration::from_millis(100));
        let result = deadline
            .run(tokio::time::sleep(Duration::from_secs(10)))
            .await;
        assert!(result.is_none());
        assert!(deadline.is_expired());
    }

    #[tokio::test(start_paused = true)]
    async fn run_returns_value_before_deadline() {
        let deadline = Deadline::after(Duration::from_secs(10));
        assert_eq!(deadline.run(async { 7 }).await, Some(7));
    }

    #[tokio::test(start_paused = true)]
    async fn sleep_is_cut_short() {
        let deadline = Deadline::after(Duration::from_millis(300));
        assert!(deadline.sleep(Duration::from_millis(100)).await);
        assert!(!deadline.sleep(Duration::from_secs(5)).await);
        assert_eq!(deadline.remaining(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn nested_timeout_uses_smaller_bound() {
        let deadline = Deadline::after(Duration::from_secs(60));
        let err = with_timeout(
            &deadline,
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            },
            Duration::from_secs(1),
            "Auxiliary navigation",
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("Auxiliary navigation timeout"));
    }
}
