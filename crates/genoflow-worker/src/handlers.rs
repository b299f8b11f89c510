//! Job handlers for the validation and processing queues.

use async_trait::async_trait;
use genoflow_agent::Agent;
use genoflow_bus::{HandlerOutcome, JobHandler};
use genoflow_core::{log_error, CallContext, JobKind, ProcessingJob, ValidationJob};
use std::time::Duration;

/// Handles `{user_id, file_name}` jobs; the notification is ready when the
/// file passed validation.
pub struct ValidationHandler {
    agent: Agent,
    timeout: Duration,
}

impl ValidationHandler {
    const NAME: &'static str = "validate";

    pub fn new(agent: Agent, timeout: Duration) -> Self {
        Self { agent, timeout }
    }
}

#[async_trait]
impl JobHandler for ValidationHandler {
    fn kind(&self) -> JobKind {
        JobKind::Validation
    }

    async fn handle(&self, ctx: &CallContext, payload: &[u8]) -> HandlerOutcome {
        let job: ValidationJob = match serde_json::from_slice(payload) {
            Ok(job) => job,
            Err(e) => {
                tracing::error!(handler = Self::NAME, error = %e, "Could not decode validation job");
                return HandlerOutcome::failed("", "", e);
            }
        };
        tracing::info!(handler = Self::NAME, user_id = %job.user_id, file_name = %job.file_name, "Validation job received");

        let ctx = ctx.with_timeout(self.timeout);
        match self
            .agent
            .validate(&ctx, &job.user_id, &job.file_name, false, true)
            .await
        {
            Ok(result) => HandlerOutcome::ready(job.user_id, job.file_name, result.passed),
            Err(e) => {
                log_error(Self::NAME, &e);
                HandlerOutcome::failed(job.user_id, job.file_name, e)
            }
        }
    }
}

/// Handles `{user_id, file_name, barcode}` jobs. The user's active file is
/// processed; `file_name` is only echoed back in the notification.
pub struct ProcessingHandler {
    agent: Agent,
    timeout: Duration,
}

impl ProcessingHandler {
    const NAME: &'static str = "process";

    pub fn new(agent: Agent, timeout: Duration) -> Self {
        Self { agent, timeout }
    }
}

#[async_trait]
impl JobHandler for ProcessingHandler {
    fn kind(&self) -> JobKind {
        JobKind::Processing
    }

    async fn handle(&self, ctx: &CallContext, payload: &[u8]) -> HandlerOutcome {
        let job: ProcessingJob = match serde_json::from_slice(payload) {
            Ok(job) => job,
            Err(e) => {
                tracing::error!(handler = Self::NAME, error = %e, "Could not decode processing job");
                return HandlerOutcome::failed("", "", e);
            }
        };
        tracing::info!(handler = Self::NAME, user_id = %job.user_id, barcode = %job.barcode, "Processing job received");

        let ctx = ctx.with_timeout(self.timeout);
        match self
            .agent
            .process(&ctx, &job.user_id, &job.barcode, false, true)
            .await
        {
            Ok(()) => HandlerOutcome::ready(job.user_id, job.file_name, true),
            Err(e) => {
                log_error(Self::NAME, &e);
                HandlerOutcome::failed(job.user_id, job.file_name, e)
            }
        }
    }
}
