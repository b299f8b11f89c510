//! Serialization boundary for store operations.
//!
//! All statements run one at a time behind a single mutex owned by the store.
//! The statement itself runs on a spawned task so that a caller whose context
//! expires can return immediately with [`StoreError::ContextTimeoutExceeded`];
//! the spawned task still finishes its write in the background.

use crate::error::{StoreError, StoreResult};
use genoflow_core::CallContext;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone, Default)]
pub struct SerialExecutor {
    lock: Arc<Mutex<()>>,
}

impl SerialExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `operation` under the lock, racing it against `ctx`.
    ///
    /// A context that is already done is rejected before anything is spawned,
    /// so no partial write can happen in that case.
    pub async fn run<T, F>(
        &self,
        ctx: &CallContext,
        operation: &'static str,
        statement: F,
    ) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>> + Send + 'static,
        T: Send + 'static,
    {
        if ctx.is_done() {
            tracing::warn!(operation, "Context already expired, statement not issued");
            return Err(StoreError::ContextTimeoutExceeded { operation });
        }

        let lock = self.lock.clone();
        let handle = tokio::spawn(async move {
            let _guard = lock.lock().await;
            statement.await
        });

        tokio::select! {
            joined = handle => joined?,
            _ = ctx.done() => {
                tracing::warn!(operation, "Context expired while waiting for store");
                Err(StoreError::ContextTimeoutExceeded { operation })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn expired_context_never_runs_statement() {
        let executor = SerialExecutor::new();
        let ran = Arc::new(AtomicUsize::new(0));
        let ran_clone = ran.clone();
        let ctx = CallContext::background().with_timeout(Duration::ZERO);

        let result = executor
            .run(&ctx, "ping", async move {
                ran_clone.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;

        assert!(matches!(
            result,
            Err(StoreError::ContextTimeoutExceeded { operation: "ping" })
        ));
        tokio::task::yield_now().await;
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn slow_statement_times_out_but_completes() {
        let executor = SerialExecutor::new();
        let ran = Arc::new(AtomicUsize::new(0));
        let ran_clone = ran.clone();
        let ctx = CallContext::background().with_timeout(Duration::from_millis(20));

        let result = executor
            .run(&ctx, "slow", async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                ran_clone.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(StoreError::ContextTimeoutExceeded { .. })));

        // The write lands after the caller gave up.
        executor
            .run(&CallContext::background(), "barrier", async { Ok(()) })
            .await
            .unwrap();
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn statements_never_overlap() {
        let executor = SerialExecutor::new();
        let active = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let executor = executor.clone();
            let active = active.clone();
            let max_seen = max_seen.clone();
            tasks.push(tokio::spawn(async move {
                executor
                    .run(&CallContext::background(), "count", async move {
                        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                        max_seen.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        active.fetch_sub(1, Ordering::SeqCst);
                        Ok(())
                    })
                    .await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }
}
