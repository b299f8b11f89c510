//! `genoflow` binary entry point.
//!
//! Configuration comes from the environment (`.env` and `.env.local` are
//! loaded first). Run `genoflow --help` for the command list.

use anyhow::Context;
use genoflow_cli::{find, registry, root_command, AppContext};
use genoflow_core::Config;
use genoflow_infra::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("loading configuration")?;
    config.validate().context("invalid configuration")?;
    init_tracing(&config.log)?;

    let registry = registry();
    let matches = root_command(&registry).get_matches();
    let (name, args) = matches
        .subcommand()
        .context("no command given")?;
    let command = find(&registry, name).with_context(|| format!("unknown command {}", name))?;

    let app = AppContext::new(config);
    tracing::info!(cli_command = %name, "Command started");
    let result = command.execute(&app, args).await;
    let shutdown = app.lifecycle().shutdown().await;

    result.with_context(|| format!("{} failed", name))?;
    shutdown.context("shutdown failed")
}
