//! Cancellation and deadlines shared by the manager and backends.

use crate::{PersistenceError, PersistenceResult};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Cancellation scope passed to every manager and persistence call.
///
/// A context is done once its token is cancelled or its deadline has
/// passed. Backends should check it before starting work and may race
/// their I/O against [`Context::done`].
#[derive(Debug, Clone, Default)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Context {
    /// A context that is never done unless cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// A context driven by an existing token.
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Sets an absolute deadline.
    #[must_use]
    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Sets a deadline relative to now.
    #[must_use]
    pub fn timeout(self, timeout: Duration) -> Self {
        self.deadline(Instant::now() + timeout)
    }

    /// A child context: cancelled with this one, cancellable on its own.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Cancels this context and its children.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns the underlying token.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_done(&self) -> bool {
        self.token.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Fails with a cancelled error once the context is done.
    pub fn check(&self) -> PersistenceResult<()> {
        if self.is_done() {
            Err(self.cancelled_error())
        } else {
            Ok(())
        }
    }

    /// Resolves once the token is cancelled or the deadline passes.
    pub async fn done(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.token.cancelled() => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => self.token.cancelled().await,
        }
    }

    /// Runs `fut` until it completes or the context is done, whichever
    /// comes first. A context that is already done never polls `fut`.
    pub async fn run<F: Future>(&self, fut: F) -> PersistenceResult<F::Output> {
        tokio::select! {
            biased;
            _ = self.done() => Err(self.cancelled_error()),
            out = fut => Ok(out),
        }
    }

    fn cancelled_error(&self) -> PersistenceError {
        if self.token.is_cancelled() {
            PersistenceError::cancelled("context cancelled")
        } else {
            PersistenceError::cancelled("deadline exceeded").with_sub_code("deadline")
        }
    }
}
