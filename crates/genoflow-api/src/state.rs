use genoflow_agent::Agent;
use genoflow_core::CallContext;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct AppState {
    pub agent: Agent,
    /// Deadline for the store reads behind one request
    pub store_timeout: Duration,
    shutdown: CancellationToken,
}

impl AppState {
    pub fn new(agent: Agent, store_timeout: Duration, shutdown: CancellationToken) -> Self {
        Self {
            agent,
            store_timeout,
            shutdown,
        }
    }

    /// Context for one request: cancelled on shutdown, bounded by the store deadline.
    pub fn request_context(&self) -> CallContext {
        CallContext::from_token(&self.shutdown).with_timeout(self.store_timeout)
    }
}
