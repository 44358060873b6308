use std::sync::Arc;

use anyhow::Context;
use stockbridge_api::app::{build_app, services::build_services};
use stockbridge_api::config::ApiConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    stockbridge_observability::init();

    let config = ApiConfig::from_env().context("invalid configuration")?;
    let services = Arc::new(build_services(&config).context("failed to wire the stock backend")?);
    let app = build_app(services.clone(), &config.api_prefix);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        prefix = %config.api_prefix,
        backend = ?config.backend,
        "listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    services.shutdown().await;
    tracing::info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
