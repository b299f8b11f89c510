//! Server startup and graceful shutdown

use axum::Router;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Serve `app` on `addr` until `shutdown` resolves, then drain open requests
/// for at most `drain_timeout`.
pub async fn serve<F>(
    addr: &str,
    app: Router,
    shutdown: F,
    drain_timeout: Duration,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "Server ready and accepting connections");

    let stopping = CancellationToken::new();
    let signal = {
        let stopping = stopping.clone();
        async move {
            shutdown.await;
            stopping.cancel();
        }
    };
    let server = async move { axum::serve(listener, app).with_graceful_shutdown(signal).await };
    tokio::pin!(server);

    tokio::select! {
        res = &mut server => res?,
        _ = async {
            stopping.cancelled().await;
            tokio::time::sleep(drain_timeout).await;
        } => {
            tracing::warn!(
                drain_timeout_ms = drain_timeout.as_millis() as u64,
                "Open connections not drained in time"
            );
        }
    }

    tracing::info!("Server stopped");
    Ok(())
}
