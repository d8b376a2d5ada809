use hostrelay::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), HostrelayError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env()?;
    let server = HostrelayServerBuilder::from_config(config)
        .build(InMemoryStore::new(), InMemoryLobbyStore::new())
        .await?;

    tracing::info!(
        http = %server.http_addr()?,
        realtime = %server.realtime_addr()?,
        "listening"
    );

    let shutdown = server.shutdown_token();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            return;
        }
        tracing::info!("ctrl-c received, shutting down");
        shutdown.cancel();
    });

    server.run().await
}
