use crate::app::AppContext;
use crate::command::CliCommand;
use async_trait::async_trait;
use clap::{Arg, ArgMatches, Command};
use genoflow_api::{build_router, serve, with_timeouts, AppState};
use genoflow_infra::shutdown_signal;

/// Listen address: `--port` on all interfaces, else `SERVER_ADDRESS`.
pub(crate) fn listen_address(configured: &str, port: Option<u16>) -> String {
    match port {
        Some(port) => {
            let addr = format!("0.0.0.0:{}", port);
            if addr != configured {
                tracing::warn!(env_address = %configured, flag_address = %addr, "Server address override");
            }
            addr
        }
        None => configured.to_string(),
    }
}

pub struct ServeCommand;

#[async_trait]
impl CliCommand for ServeCommand {
    fn describe(&self) -> Command {
        Command::new("http:serve")
            .about("Serve processing status and product code lookups over HTTP")
            .arg(
                Arg::new("port")
                    .short('p')
                    .long("port")
                    .help("HTTP port")
                    .value_parser(clap::value_parser!(u16)),
            )
    }

    async fn execute(&self, app: &AppContext, args: &ArgMatches) -> anyhow::Result<()> {
        let addr = listen_address(
            &app.config().server.address,
            args.get_one::<u16>("port").copied(),
        );
        let agent = app.agent().await?;
        let state = AppState::new(
            agent,
            app.config().deadlines.store,
            app.lifecycle().token(),
        );

        let server = &app.config().server;
        let router = with_timeouts(build_router(state), server);

        let token = app.lifecycle().token();
        serve(
            &addr,
            router,
            async move {
                tokio::select! {
                    _ = shutdown_signal() => tracing::info!("Server shutdown requested"),
                    _ = token.cancelled() => {}
                }
            },
            server.idle_timeout,
        )
        .await
    }
}
