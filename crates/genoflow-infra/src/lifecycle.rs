//! Explicit ownership of long-lived resources.
//!
//! Background tasks are spawned through [`Lifecycle::spawn`] and share one
//! cancellation token. Resources such as the bus connection or the database
//! pool register a hook with [`Lifecycle::on_shutdown`]. [`Lifecycle::shutdown`]
//! cancels the token, waits for every tracked task and then runs the hooks in
//! reverse registration order.

use genoflow_core::CallContext;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

type HookFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;
type Hook = Box<dyn FnOnce() -> HookFuture + Send>;

pub struct Lifecycle {
    token: CancellationToken,
    tracker: TaskTracker,
    hooks: Mutex<Vec<(String, Hook)>>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            tracker: TaskTracker::new(),
            hooks: Mutex::new(Vec::new()),
        }
    }

    fn hooks(&self) -> MutexGuard<'_, Vec<(String, Hook)>> {
        self.hooks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Token cancelled when shutdown starts.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// A call context cancelled on shutdown.
    pub fn context(&self) -> CallContext {
        CallContext::from_token(&self.token)
    }

    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Register a hook run once every tracked task has finished.
    pub fn on_shutdown<F, Fut>(&self, name: impl Into<String>, hook: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let name = name.into();
        tracing::debug!(hook = %name, "Shutdown hook registered");
        let hook: Hook = Box::new(move || Box::pin(hook()) as HookFuture);
        self.hooks().push((name, hook));
    }

    /// Spawn a task that shutdown waits for.
    pub fn spawn<F>(&self, name: &str, task: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        tracing::debug!(task = %name, "Spawning tracked task");
        self.tracker.spawn(task)
    }

    /// Resolves when the OS asks the process to stop or shutdown already began.
    pub async fn wait_for_signal(&self) {
        tokio::select! {
            _ = crate::signal::shutdown_signal() => {}
            _ = self.token.cancelled() => {}
        }
    }

    /// Cancel, drain tracked tasks, then run hooks newest first.
    ///
    /// Every hook runs even if an earlier one fails; the first failure is
    /// returned.
    pub async fn shutdown(&self) -> anyhow::Result<()> {
        tracing::info!("Shutting down");
        self.token.cancel();
        self.tracker.close();
        self.tracker.wait().await;

        let hooks = std::mem::take(&mut *self.hooks());
        let mut first_error = None;
        for (name, hook) in hooks.into_iter().rev() {
            match hook().await {
                Ok(()) => tracing::info!(hook = %name, "Shutdown hook completed"),
                Err(e) => {
                    tracing::error!(hook = %name, error = %format!("{:#}", e), "Shutdown hook failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
