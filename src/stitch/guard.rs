use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::errors::StitchError;

/// Time and cancellation budget of one request.
///
/// Every adapter call runs through [`JobScope::bounded`], which caps it by the
/// per-call timeout and by whatever is left before the deadline.
#[derive(Debug, Clone)]
pub struct JobScope {
    call_timeout: Duration,
    deadline: Option<Instant>,
    cancel: CancellationToken,
}

impl JobScope {
    #[must_use]
    pub fn new(call_timeout: Duration) -> Self {
        Self {
            call_timeout,
            deadline: None,
            cancel: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// # Errors
    ///
    /// `Cancelled` once the token fired or the deadline passed.
    pub fn check(&self, operation: &'static str) -> Result<(), StitchError> {
        if self.cancel.is_cancelled() {
            return Err(StitchError::Cancelled(operation));
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(StitchError::Cancelled(operation));
        }
        Ok(())
    }

    fn budget(&self) -> Duration {
        match self.deadline {
            Some(deadline) => self
                .call_timeout
                .min(deadline.saturating_duration_since(Instant::now())),
            None => self.call_timeout,
        }
    }

    /// Runs one adapter call under the request's budget.
    ///
    /// # Errors
    ///
    /// `Cancelled` if the request is already over or is cancelled mid-call,
    /// `Timeout` if the call outlives its budget, otherwise the call's own error.
    pub async fn bounded<T, F>(&self, operation: &'static str, call: F) -> Result<T, StitchError>
    where
        F: Future<Output = Result<T, StitchError>>,
    {
        self.check(operation)?;
        let budget = self.budget();

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(StitchError::Cancelled(operation)),
            outcome = tokio::time::timeout(budget, call) => match outcome {
                Ok(result) => result,
                Err(_) => {
                    warn!(operation, budget_ms = budget.as_millis() as u64, "adapter call timed out");
                    Err(StitchError::Timeout {
                        operation,
                        after: budget,
                    })
                }
            },
        }
    }

    /// Runs the call that commits the result.
    ///
    /// Checked against cancellation and the deadline before it starts; once started it
    /// is not cut by the per-call timeout or the token, only by the request deadline.
    ///
    /// # Errors
    ///
    /// `Cancelled` if the request is already over, `Timeout` if the deadline passes
    /// mid-call, otherwise the call's own error.
    pub async fn committed<T, F>(&self, operation: &'static str, call: F) -> Result<T, StitchError>
    where
        F: Future<Output = Result<T, StitchError>>,
    {
        self.check(operation)?;
        let Some(deadline) = self.deadline else {
            return call.await;
        };

        let remaining = deadline.saturating_duration_since(Instant::now());
        match tokio::time::timeout(remaining, call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(operation, "request deadline passed during commit");
                Err(StitchError::Timeout {
                    operation,
                    after: remaining,
                })
            }
        }
    }
}
