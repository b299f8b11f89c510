use crate::app::AppContext;
use crate::command::{required, CliCommand};
use anyhow::{bail, Context};
use async_trait::async_trait;
use clap::builder::PossibleValuesParser;
use clap::{Arg, ArgMatches, Command};
use genoflow_bus::{MessageBus, Topology};
use genoflow_core::{CompletionNotification, JobKind, ProcessingJob, ValidationJob};
use genoflow_worker::run_consumers;
use std::sync::Arc;

/// Serialize the message `message_type` describes and pick its exchange.
///
/// `ready` fakes a completion notification on the output exchange of
/// `response_type`, which lets downstream consumers be exercised by hand.
pub(crate) fn build_message(
    message_type: &str,
    response_type: Option<&str>,
    user_id: &str,
    file_name: &str,
    barcode: Option<&str>,
    topology: &Topology,
) -> anyhow::Result<(String, Vec<u8>)> {
    match message_type {
        "validate" => {
            let job = ValidationJob {
                user_id: user_id.to_string(),
                file_name: file_name.to_string(),
            };
            Ok((
                topology.validation.input_exchange.clone(),
                serde_json::to_vec(&job)?,
            ))
        }
        "process" => {
            let Some(barcode) = barcode else {
                bail!("--barcode is required for `process` messages");
            };
            let job = ProcessingJob {
                user_id: user_id.to_string(),
                file_name: file_name.to_string(),
                barcode: barcode.to_string(),
            };
            Ok((
                topology.processing.input_exchange.clone(),
                serde_json::to_vec(&job)?,
            ))
        }
        "ready" => {
            let (rsp_type, exchange) = match response_type {
                Some("validation") => (JobKind::Validation, &topology.validation.output_exchange),
                Some("processing") => (JobKind::Processing, &topology.processing.output_exchange),
                Some(other) => bail!("invalid response type {}", other),
                None => bail!("--response-type is required for `ready` messages"),
            };
            let notification = CompletionNotification {
                user_id: user_id.to_string(),
                file_name: file_name.to_string(),
                rsp_type,
                is_ready: true,
            };
            Ok((exchange.clone(), serde_json::to_vec(&notification)?))
        }
        other => bail!("invalid message type {}", other),
    }
}

pub struct CreateCommand;

impl CreateCommand {
    const NAME: &'static str = "messenger:create";
}

#[async_trait]
impl CliCommand for CreateCommand {
    fn describe(&self) -> Command {
        Command::new(Self::NAME)
            .about("Publish a validation or processing job, or a ready notification")
            .arg(
                Arg::new("type")
                    .short('t')
                    .long("type")
                    .help("Message type")
                    .value_parser(PossibleValuesParser::new(["validate", "process", "ready"]))
                    .required(true),
            )
            .arg(
                Arg::new("response-type")
                    .short('r')
                    .long("response-type")
                    .help("Notification type for `ready` messages")
                    .value_parser(PossibleValuesParser::new(["validation", "processing"])),
            )
            .arg(super::user_id_arg())
            .arg(
                Arg::new("file-name")
                    .short('f')
                    .long("file-name")
                    .help("Input file name as stored in the upload bucket")
                    .required(true),
            )
            .arg(
                Arg::new("barcode")
                    .short('b')
                    .long("barcode")
                    .help("Barcode for `process` messages"),
            )
    }

    async fn execute(&self, app: &AppContext, args: &ArgMatches) -> anyhow::Result<()> {
        let (exchange, payload) = build_message(
            required(args, "type")?,
            args.get_one::<String>("response-type").map(String::as_str),
            required(args, "user-id")?,
            required(args, "file-name")?,
            args.get_one::<String>("barcode").map(String::as_str),
            &app.topology(),
        )?;

        let bus = app.bus().await?;
        bus.publish(&exchange, &payload).await.map_err(|e| {
            tracing::error!(cli_command = Self::NAME, exchange = %exchange, error = %e, "Publishing failed");
            e
        })?;
        tracing::info!(cli_command = Self::NAME, exchange = %exchange, "Message published");
        Ok(())
    }
}

pub struct ConsumeCommand;

#[async_trait]
impl CliCommand for ConsumeCommand {
    fn describe(&self) -> Command {
        Command::new("messenger:consume").about("Consume validation and processing jobs")
    }

    async fn execute(&self, app: &AppContext, _args: &ArgMatches) -> anyhow::Result<()> {
        let bus: Arc<dyn MessageBus> = app.bus().await?;
        let agent = app.agent().await?;
        let topology = app.topology();
        let deadlines = app.config().deadlines.clone();
        let token = app.lifecycle().token();

        let mut consumers = app.lifecycle().spawn("bus-consumers", async move {
            run_consumers(bus, &topology, agent, &deadlines, token).await
        });

        let finished = tokio::select! {
            _ = app.lifecycle().wait_for_signal() => None,
            joined = &mut consumers => Some(joined),
        };
        let joined = match finished {
            Some(joined) => joined,
            None => {
                tracing::info!("Bus consumer shutdown requested");
                app.lifecycle().token().cancel();
                consumers.await
            }
        };
        joined.context("consumer task panicked")?
    }
}
