//! Consume loop for one job domain.

use crate::error::BusResult;
use crate::topology::DomainTopology;
use crate::traits::{Delivery, MessageBus};
use async_trait::async_trait;
use futures::StreamExt;
use genoflow_core::{CallContext, CompletionNotification, JobKind};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Result of handling one delivery.
#[derive(Debug)]
pub struct HandlerOutcome {
    pub user_id: String,
    pub file_name: String,
    /// Reported to subscribers as `is_ready`
    pub success: bool,
    pub error: Option<anyhow::Error>,
}

impl HandlerOutcome {
    pub fn ready(user_id: impl Into<String>, file_name: impl Into<String>, success: bool) -> Self {
        Self {
            user_id: user_id.into(),
            file_name: file_name.into(),
            success,
            error: None,
        }
    }

    pub fn failed(
        user_id: impl Into<String>,
        file_name: impl Into<String>,
        error: impl Into<anyhow::Error>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            file_name: file_name.into(),
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Turns a raw job payload into pipeline work.
#[async_trait]
pub trait JobHandler: Send + Sync {
    fn kind(&self) -> JobKind;

    /// `ctx` is cancelled on process shutdown; handlers add their own deadline.
    async fn handle(&self, ctx: &CallContext, payload: &[u8]) -> HandlerOutcome;
}

/// Consumes a domain's job queue.
///
/// Every delivery is acknowledged whatever the handler returns. On handler
/// error the payload is re-published to the input exchange when `republish`
/// is set. A completion notification is always published to the output
/// exchange.
pub struct QueueListener {
    bus: Arc<dyn MessageBus>,
    domain: DomainTopology,
    republish: bool,
}

impl QueueListener {
    pub fn new(bus: Arc<dyn MessageBus>, domain: DomainTopology) -> Self {
        Self {
            bus,
            domain,
            republish: false,
        }
    }

    pub fn with_republish(mut self, republish: bool) -> Self {
        self.republish = republish;
        self
    }

    /// Run until `shutdown` fires or the delivery stream ends.
    ///
    /// Shutdown also cancels the context of a job already being handled; the
    /// handler returns early and the job is still acked and notified.
    pub async fn run(
        &self,
        handler: Arc<dyn JobHandler>,
        shutdown: CancellationToken,
    ) -> BusResult<()> {
        let consumer_tag = format!("genoflow-{}", self.domain.kind);
        let mut deliveries = self.bus.consume(&self.domain.queue, &consumer_tag).await?;
        tracing::info!(queue = %self.domain.queue, kind = %self.domain.kind, "Consumer started");

        loop {
            let next = tokio::select! {
                _ = shutdown.cancelled() => break,
                next = deliveries.next() => next,
            };
            let Some(delivery) = next else {
                tracing::info!(queue = %self.domain.queue, "Delivery stream ended");
                break;
            };
            let delivery = delivery.map_err(|e| {
                tracing::error!(queue = %self.domain.queue, error = %e, "Consuming failed");
                e
            })?;
            self.dispatch(&delivery, handler.as_ref(), &shutdown).await?;
        }

        tracing::info!(queue = %self.domain.queue, "Consumer stopped");
        Ok(())
    }

    async fn dispatch(
        &self,
        delivery: &Delivery,
        handler: &dyn JobHandler,
        shutdown: &CancellationToken,
    ) -> BusResult<()> {
        tracing::debug!(
            queue = %self.domain.queue,
            body = %String::from_utf8_lossy(&delivery.payload),
            "Received message"
        );

        let ctx = CallContext::from_token(shutdown);
        let outcome = handler.handle(&ctx, &delivery.payload).await;

        delivery.ack().await.map_err(|e| {
            tracing::error!(queue = %self.domain.queue, error = %e, "Ack failed");
            e
        })?;

        if let Some(err) = &outcome.error {
            tracing::warn!(
                queue = %self.domain.queue,
                user_id = %outcome.user_id,
                error = %err,
                "Message processing failed"
            );
            if self.republish {
                self.bus
                    .publish(&self.domain.input_exchange, &delivery.payload)
                    .await?;
                tracing::info!(exchange = %self.domain.input_exchange, "Message re-published");
            }
        }

        let notification = CompletionNotification {
            user_id: outcome.user_id,
            file_name: outcome.file_name,
            rsp_type: self.domain.kind,
            is_ready: outcome.success && outcome.error.is_none(),
        };
        let body = serde_json::to_vec(&notification)?;
        self.bus
            .publish(&self.domain.output_exchange, &body)
            .await
            .map_err(|e| {
                tracing::error!(exchange = %self.domain.output_exchange, error = %e, "Sending notification failed");
                e
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryBus;
    use crate::topology::Topology;
    use genoflow_core::{AmqpConfig, ValidationJob};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    fn topology() -> Topology {
        Topology::from_config(&AmqpConfig {
            addr: String::new(),
            validation_exchange_input: "v_in".into(),
            validation_exchange_output: "v_out".into(),
            processing_exchange_input: "p_in".into(),
            processing_exchange_output: "p_out".into(),
            validation_queue: "validation".into(),
            processing_queue: "processing".into(),
            notification_queue: "rrs".into(),
            processing_consumer_timeout_ms: 1,
        })
    }

    /// Fails the first `failures` calls, then succeeds.
    struct FlakyHandler {
        calls: AtomicUsize,
        failures: usize,
    }

    #[async_trait]
    impl JobHandler for FlakyHandler {
        fn kind(&self) -> JobKind {
            JobKind::Validation
        }

        async fn handle(&self, _ctx: &CallContext, payload: &[u8]) -> HandlerOutcome {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            let job: ValidationJob = match serde_json::from_slice(payload) {
                Ok(job) => job,
                Err(e) => return HandlerOutcome::failed("", "", e),
            };
            if n < self.failures {
                HandlerOutcome::failed(job.user_id, job.file_name, anyhow::anyhow!("boom"))
            } else {
                HandlerOutcome::ready(job.user_id, job.file_name, true)
            }
        }
    }

    /// Parks until its context is cancelled.
    struct ParkedHandler {
        started: AtomicBool,
    }

    #[async_trait]
    impl JobHandler for ParkedHandler {
        fn kind(&self) -> JobKind {
            JobKind::Validation
        }

        async fn handle(&self, ctx: &CallContext, _payload: &[u8]) -> HandlerOutcome {
            self.started.store(true, Ordering::SeqCst);
            ctx.done().await;
            HandlerOutcome::failed("u1", "f1", anyhow::anyhow!("cancelled"))
        }
    }

    fn job() -> Vec<u8> {
        serde_json::to_vec(&ValidationJob {
            user_id: "u1".into(),
            file_name: "f1".into(),
        })
        .unwrap()
    }

    async fn wait_for<F: Fn() -> bool>(cond: F) {
        for _ in 0..200 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn failure_is_acked_and_notified_without_republish() {
        let topology = topology();
        let bus = Arc::new(InMemoryBus::new(&topology));
        let listener = QueueListener::new(bus.clone(), topology.validation.clone());
        let handler = Arc::new(FlakyHandler {
            calls: AtomicUsize::new(0),
            failures: 1,
        });
        let shutdown = CancellationToken::new();
        let task = {
            let shutdown = shutdown.clone();
            let handler = handler.clone();
            tokio::spawn(async move { listener.run(handler, shutdown).await })
        };

        bus.publish("v_in", &job()).await.unwrap();
        wait_for(|| bus.published("v_out").len() == 1).await;
        shutdown.cancel();
        task.await.unwrap().unwrap();

        assert_eq!(bus.ack_count(), 1);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
        let note: CompletionNotification =
            serde_json::from_slice(&bus.published("v_out")[0]).unwrap();
        assert_eq!(note.user_id, "u1");
        assert_eq!(note.rsp_type, JobKind::Validation);
        assert!(!note.is_ready);
        assert_eq!(bus.drain("rrs").len(), 1);
    }

    #[tokio::test]
    async fn republish_retries_until_success() {
        let topology = topology();
        let bus = Arc::new(InMemoryBus::new(&topology));
        let listener =
            QueueListener::new(bus.clone(), topology.validation.clone()).with_republish(true);
        let handler = Arc::new(FlakyHandler {
            calls: AtomicUsize::new(0),
            failures: 2,
        });
        let shutdown = CancellationToken::new();
        let task = {
            let shutdown = shutdown.clone();
            let handler = handler.clone();
            tokio::spawn(async move { listener.run(handler, shutdown).await })
        };

        bus.publish("v_in", &job()).await.unwrap();
        wait_for(|| bus.published("v_out").len() == 3).await;
        shutdown.cancel();
        task.await.unwrap().unwrap();

        let ready: Vec<bool> = bus
            .published("v_out")
            .iter()
            .map(|b| {
                serde_json::from_slice::<CompletionNotification>(b)
                    .unwrap()
                    .is_ready
            })
            .collect();
        assert_eq!(ready, vec![false, false, true]);
        assert_eq!(bus.ack_count(), 3);
    }

    #[tokio::test]
    async fn malformed_payload_still_notifies() {
        let topology = topology();
        let bus = Arc::new(InMemoryBus::new(&topology));
        let listener = QueueListener::new(bus.clone(), topology.validation.clone());
        let handler = Arc::new(FlakyHandler {
            calls: AtomicUsize::new(0),
            failures: 0,
        });
        let shutdown = CancellationToken::new();
        let task = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { listener.run(handler, shutdown).await })
        };

        bus.publish("v_in", b"{not json").await.unwrap();
        wait_for(|| bus.published("v_out").len() == 1).await;
        shutdown.cancel();
        task.await.unwrap().unwrap();

        let note: CompletionNotification =
            serde_json::from_slice(&bus.published("v_out")[0]).unwrap();
        assert_eq!(note.user_id, "");
        assert!(!note.is_ready);
    }

    #[tokio::test]
    async fn closing_the_bus_ends_the_listener() {
        let topology = topology();
        let bus = Arc::new(InMemoryBus::new(&topology));
        let listener = QueueListener::new(bus.clone(), topology.validation.clone());
        let handler = Arc::new(FlakyHandler {
            calls: AtomicUsize::new(0),
            failures: 0,
        });
        let task =
            tokio::spawn(async move { listener.run(handler, CancellationToken::new()).await });

        // One round trip proves the listener is subscribed.
        bus.publish("v_in", &job()).await.unwrap();
        wait_for(|| bus.published("v_out").len() == 1).await;
        bus.close().await.unwrap();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn shutdown_cancels_in_flight_job() {
        let topology = topology();
        let bus = Arc::new(InMemoryBus::new(&topology));
        let listener = QueueListener::new(bus.clone(), topology.validation.clone());
        let handler = Arc::new(ParkedHandler {
            started: AtomicBool::new(false),
        });
        let shutdown = CancellationToken::new();
        let task = {
            let shutdown = shutdown.clone();
            let handler = handler.clone();
            tokio::spawn(async move { listener.run(handler, shutdown).await })
        };

        bus.publish("v_in", &job()).await.unwrap();
        wait_for(|| handler.started.load(Ordering::SeqCst)).await;
        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap()
            .unwrap();

        assert_eq!(bus.ack_count(), 1);
        let note: CompletionNotification =
            serde_json::from_slice(&bus.published("v_out")[0]).unwrap();
        assert!(!note.is_ready);
    }
}
