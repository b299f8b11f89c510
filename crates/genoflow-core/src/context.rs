//! Deadline-carrying cancellation context.
//!
//! Every externally facing operation receives a [`CallContext`]. It combines a
//! [`CancellationToken`] (fired by process shutdown or an explicit cancel) with
//! an optional absolute deadline. Child contexts created with
//! [`CallContext::with_timeout`] inherit the parent's cancellation and never
//! extend its deadline.

use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Clone, Debug)]
pub struct CallContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CallContext {
    /// A context that is never done unless cancelled explicitly.
    pub fn background() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
        }
    }

    /// Derive a context from a shared shutdown token.
    pub fn from_token(token: &CancellationToken) -> Self {
        Self {
            token: token.child_token(),
            deadline: None,
        }
    }

    /// Child context expiring after `timeout`, or at the parent's deadline if
    /// that comes first.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let requested = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(parent) if parent < requested => parent,
            _ => requested,
        };
        Self {
            token: self.token.child_token(),
            deadline: Some(deadline),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    pub fn is_done(&self) -> bool {
        if self.token.is_cancelled() {
            return true;
        }
        matches!(self.deadline, Some(d) if Instant::now() >= d)
    }

    /// Resolves once the context is cancelled or its deadline elapses.
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
}

impl Default for CallContext {
    fn default() -> Self {
        Self::background()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn background_is_not_done() {
        let ctx = CallContext::background();
        assert!(!ctx.is_done());
        assert!(ctx.remaining().is_none());
    }

    #[tokio::test]
    async fn zero_timeout_is_immediately_done() {
        let ctx = CallContext::background().with_timeout(Duration::ZERO);
        assert!(ctx.is_done());
        ctx.done().await;
    }

    #[tokio::test]
    async fn child_never_outlives_parent_deadline() {
        let parent = CallContext::background().with_timeout(Duration::from_millis(50));
        let child = parent.with_timeout(Duration::from_secs(3600));
        assert_eq!(child.deadline(), parent.deadline());
    }

    #[tokio::test]
    async fn cancelling_parent_cancels_child() {
        let parent = CallContext::background();
        let child = parent.with_timeout(Duration::from_secs(60));
        parent.cancel();
        assert!(child.is_done());
    }

    #[tokio::test(start_paused = true)]
    async fn done_resolves_at_deadline() {
        let ctx = CallContext::background().with_timeout(Duration::from_secs(10));
        tokio::time::advance(Duration::from_secs(11)).await;
        ctx.done().await;
        assert!(ctx.is_done());
    }
}
