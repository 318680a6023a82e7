//! Cancellation and deadline scope shared by a consumer loop and its handlers.
//!
//! A `Context` is cheap to clone. Children derived with [`Context::child`] or
//! [`Context::with_time_to_live`] are cancelled when their parent is, never the
//! other way round.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a context is done.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextError {
    #[error("context canceled")]
    Canceled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

#[derive(Debug, Clone)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
    time_to_live: Option<Duration>,
}

impl Context {
    /// Wrap an existing cancellation token with no deadline.
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
            time_to_live: None,
        }
    }

    /// A root context that is only cancelled explicitly.
    pub fn background() -> Self {
        Self::new(CancellationToken::new())
    }

    /// Derive a child that can be cancelled independently of this context.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
            time_to_live: self.time_to_live,
        }
    }

    /// Derive a child that expires after `ttl`, capped by this context's deadline.
    pub fn with_time_to_live(&self, ttl: Duration) -> Self {
        let own = Instant::now() + ttl;
        let deadline = match self.deadline {
            Some(parent) if parent < own => parent,
            _ => own,
        };

        Self {
            token: self.token.child_token(),
            deadline: Some(deadline),
            time_to_live: Some(ttl),
        }
    }

    /// Time-to-live the context was derived with, if any.
    pub fn time_to_live(&self) -> Option<Duration> {
        self.time_to_live
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left until the deadline; zero once it has passed.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// `None` while the context is live. Cancellation wins over an expired deadline.
    pub fn err(&self) -> Option<ContextError> {
        if self.token.is_cancelled() {
            return Some(ContextError::Canceled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolves once the context is cancelled or its deadline passes.
    pub async fn done(&self) -> ContextError {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    biased;
                    _ = self.token.cancelled() => ContextError::Canceled,
                    _ = tokio::time::sleep_until(deadline) => ContextError::DeadlineExceeded,
                }
            }
            None => {
                self.token.cancelled().await;
                ContextError::Canceled
            }
        }
    }

    /// Drive `fut` until it completes or the context is done, whichever comes first.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, ContextError>
    where
        F: Future,
    {
        tokio::select! {
            biased;
            err = self.done() => Err(err),
            output = fut => Ok(output),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_deadline_expires() {
        let ctx = Context::background().with_time_to_live(Duration::from_secs(5));
        assert_eq!(ctx.err(), None);
        assert_eq!(ctx.time_to_live(), Some(Duration::from_secs(5)));

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(ctx.err(), Some(ContextError::DeadlineExceeded));
        assert_eq!(ctx.remaining(), Some(Duration::ZERO));
    }

    #[tokio::test(start_paused = true)]
    async fn test_child_deadline_capped_by_parent() {
        let parent = Context::background().with_time_to_live(Duration::from_secs(10));
        let child = parent.with_time_to_live(Duration::from_secs(60));

        assert_eq!(child.deadline(), parent.deadline());
        assert_eq!(child.time_to_live(), Some(Duration::from_secs(60)));
    }

    #[tokio::test]
    async fn test_cancel_propagates_to_children_only() {
        let parent = Context::background();
        let child = parent.child();

        child.cancel();
        assert!(!parent.is_cancelled());

        let other = parent.child();
        parent.cancel();
        assert_eq!(other.err(), Some(ContextError::Canceled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_wins_over_deadline() {
        let ctx = Context::background().with_time_to_live(Duration::from_millis(1));
        tokio::time::advance(Duration::from_millis(5)).await;
        ctx.cancel();
        assert_eq!(ctx.err(), Some(ContextError::Canceled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_at_deadline() {
        let ctx = Context::background().with_time_to_live(Duration::from_secs(1));
        let result = ctx
            .run(tokio::time::sleep(Duration::from_secs(30)))
            .await;
        assert_eq!(result, Err(ContextError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn test_run_returns_output() {
        let ctx = Context::background();
        let result = ctx.run(async { 42 }).await;
        assert_eq!(result, Ok(42));
    }
}
