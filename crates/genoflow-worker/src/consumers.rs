use crate::handlers::{ProcessingHandler, ValidationHandler};
use anyhow::Context;
use genoflow_agent::Agent;
use genoflow_bus::{JobHandler, MessageBus, QueueListener, Topology};
use genoflow_core::DeadlineConfig;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Consume the validation and processing queues until `shutdown` fires.
///
/// If either consumer stops with an error the other one is stopped too and
/// the first error is returned.
pub async fn run_consumers(
    bus: Arc<dyn MessageBus>,
    topology: &Topology,
    agent: Agent,
    deadlines: &DeadlineConfig,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let stop = shutdown.child_token();
    let validation: Arc<dyn JobHandler> =
        Arc::new(ValidationHandler::new(agent.clone(), deadlines.validation));
    let processing: Arc<dyn JobHandler> =
        Arc::new(ProcessingHandler::new(agent, deadlines.processing));

    let mut listeners = JoinSet::new();
    for (domain, handler) in [
        (topology.validation.clone(), validation),
        (topology.processing.clone(), processing),
    ] {
        let listener = QueueListener::new(bus.clone(), domain);
        let stop = stop.clone();
        listeners.spawn(async move { listener.run(handler, stop).await });
    }
    tracing::info!("Bus consumers running");

    let mut first_error = None;
    while let Some(joined) = listeners.join_next().await {
        let result = joined
            .context("consumer task panicked")
            .and_then(|r| r.context("consumer stopped"));
        if let Err(e) = result {
            tracing::error!(error = %format!("{:#}", e), "Bus consumer failed");
            stop.cancel();
            first_error.get_or_insert(e);
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => {
            tracing::info!("Bus consumers stopped");
            Ok(())
        }
    }
}
