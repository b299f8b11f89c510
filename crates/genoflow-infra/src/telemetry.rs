use genoflow_core::{LogConfig, LogFormat};
use tracing_subscriber::{fmt::format::Format, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is not set. Dependencies log at a fixed
/// level whatever `LOG_LEVEL` says.
pub fn default_directive(config: &LogConfig) -> String {
    format!(
        "{},lapin=warn,sqlx=warn,tower_http=info",
        config.filter_directive()
    )
}

/// Install the global tracing subscriber.
pub fn init_tracing(config: &LogConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(config)));
    let registry = tracing_subscriber::registry().with(filter);

    match config.format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
            .try_init()?,
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .event_format(Format::default().compact().with_target(false)),
            )
            .try_init()?,
    }

    tracing::debug!(format = ?config.format, level = config.level, "Tracing initialised");
    Ok(())
}
