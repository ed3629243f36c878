use std::sync::Arc;

use clap::Parser;
use sensorhub_core::config::SensorHubConfig;
use sensorhub_pubsub::Hub;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

mod app;
mod http;
mod producer;
mod ws;

/// Fan a sensor stream out to WebSocket consumers in timed batches.
#[derive(Debug, Parser)]
#[command(name = "sensorhub-gateway", version)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, env = "SENSORHUB_CONFIG")]
    config: Option<String>,

    /// Listen address (ip:port), overrides the config file.
    #[arg(long)]
    addr: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "sensorhub_gateway=info,sensorhub_pubsub=info,tower_http=debug".into()
            }),
        )
        .init();

    let cli = Cli::parse();

    // load config: --config / SENSORHUB_CONFIG > ./sensorhub.toml, then env overrides
    let mut config = SensorHubConfig::load(cli.config.as_deref()).unwrap_or_else(|e| {
        warn!(code = e.code(), "Config load failed ({}), using defaults", e);
        SensorHubConfig::default()
    });
    if let Some(addr) = cli.addr.as_deref() {
        config.set_listen_addr(addr)?;
    }
    let addr = config.listen_addr()?;

    let hub = Arc::new(Hub::new());
    let shutdown = CancellationToken::new();

    let producer = if config.producer.enabled {
        let producer = producer::SineProducer::new(hub.clone(), &config.producer);
        Some(tokio::spawn(producer.run(shutdown.clone())))
    } else {
        info!("sample producer disabled");
        None
    };

    let state = Arc::new(app::AppState::new(config, hub, shutdown.clone()));
    let connections = state.connections.clone();
    let router = app::build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("SensorHub gateway listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    // the server may also stop on its own; make sure background tasks follow
    shutdown.cancel();
    // upgraded sockets outlive serve; let each one unsubscribe and close
    connections.close();
    connections.wait().await;
    if let Some(handle) = producer {
        let _ = handle.await;
    }
    info!("SensorHub gateway stopped");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM, cancelling `token` so open connections
/// wind down before the server stops accepting.
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
        _ = token.cancelled() => {},
    }

    info!("shutdown signal received");
    token.cancel();
}
