//! Percona XtraDB Backup Kubernetes Operator
//!
//! Main entry point for the operator. Sets up the Kubernetes client, starts the
//! backup controller and the metrics server.

use std::sync::Arc;

use anyhow::Context as _;
use kube::Client;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use xtradb_backup_operator::{
    config::OperatorConfig,
    controllers::{self, Context},
    metrics,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    init_tracing();

    let config = OperatorConfig::from_env().context("loading operator configuration")?;
    info!(?config, "Starting Percona XtraDB Backup Operator");

    // Create Kubernetes client
    let client = Client::try_default().await?;
    info!("Connected to Kubernetes API server");

    let metrics_port = config.metrics_port;
    let context = Arc::new(Context::new(client.clone(), config));

    // Start metrics server
    let metrics_handle = tokio::spawn(metrics::serve(metrics_port));
    info!("Metrics server starting on port {}", metrics_port);

    let backup_controller = controllers::run_backup_controller(client, context);

    // Handle graceful shutdown
    tokio::select! {
        _ = backup_controller => {
            error!("Backup controller exited unexpectedly");
        }
        _ = metrics_handle => {
            error!("Metrics server exited unexpectedly");
        }
        _ = shutdown_signal() => {
            info!("Received shutdown signal, stopping operator");
        }
    }

    info!("Percona XtraDB Backup Operator stopped");
    Ok(())
}

/// Initialize tracing subscriber
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,kube=warn,hyper=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install CTRL+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received CTRL+C signal");
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
        }
    }
}
