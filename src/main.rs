use std::sync::Arc;

use anyhow::Context;
use flare_profilesvc::config::Config;
use flare_profilesvc::metrics::RequestMetrics;
use flare_profilesvc::service::{
    InMemoryProfileService, InstrumentingLayer, LoggingLayer, ProfileService,
};
use flare_profilesvc::telemetry::init_tracing;
use flare_profilesvc::transport;
use prometheus::Registry;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::Layer;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env_or_default().context("failed to load configuration")?;
    init_tracing(&config.log).context("failed to initialize tracing")?;

    info!(
        service = %config.service.name,
        version = %config.service.version,
        "Starting profile service"
    );

    let registry = Registry::new();
    let metrics = RequestMetrics::new("api", "profilesvc")?;
    metrics.register(&registry)?;

    let service = InMemoryProfileService::new();
    let service = LoggingLayer.layer(service);
    let service: Arc<dyn ProfileService> = Arc::new(InstrumentingLayer::new(metrics).layer(service));

    let address = config.server.socket_addr()?;
    let listener = TcpListener::bind(address)
        .await
        .with_context(|| format!("failed to bind {}", address))?;

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl-C, shutting down"),
            Err(e) => error!(error = %e, "failed to listen for Ctrl-C"),
        }
        signal.cancel();
    });

    transport::serve(listener, transport::router(service, registry), shutdown).await?;
    Ok(())
}
