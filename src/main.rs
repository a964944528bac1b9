//! highlander - admission webhook enforcing one instance per namespace.
//!
//! This is the main entry point that:
//! - Initializes structured logging
//! - Loads configuration from the environment
//! - Creates the Kubernetes client and resolves every protected kind
//! - Starts the health server and the TLS webhook server

use std::sync::Arc;
use std::time::Duration;

use kube::Client;
use tokio::signal;
use tracing::{error, info};

use highlander::health::run_health_server;
use highlander::{Config, Error, GateRegistry, HealthState, run_webhook_server};

/// Grace period for in-flight admission calls to complete during shutdown
const SHUTDOWN_GRACE_PERIOD_SECS: u64 = 5;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("highlander=info".parse()?)
                .add_directive("kube=info".parse()?),
        )
        .json()
        .init();

    // kube and axum-server both pull in rustls; pin one process-wide provider
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    info!("Starting highlander");

    let config = Config::from_env()?;
    info!(
        resources = ?config.resources.iter().map(ToString::to_string).collect::<Vec<_>>(),
        webhook_port = config.webhook_port,
        health_port = config.health_port,
        "Loaded configuration"
    );

    if !config.cert_path.exists() || !config.key_path.exists() {
        return Err(Error::TlsConfig(format!(
            "webhook certificates not found at {} / {}",
            config.cert_path.display(),
            config.key_path.display()
        ))
        .into());
    }

    // Create Kubernetes client
    let client = Client::try_default().await?;
    info!("Connected to Kubernetes cluster");

    // Create shared health state
    let health_state = Arc::new(HealthState::new());

    // Start health server immediately (liveness should work during setup)
    let health_handle = {
        let health_state = health_state.clone();
        let port = config.health_port;
        tokio::spawn(async move {
            if let Err(e) = run_health_server(health_state, port).await {
                error!("Health server error: {}", e);
            }
        })
    };

    // Resolve every protected kind; an unknown kind is fatal
    let mut registry = GateRegistry::new();
    for identity in config.resources.iter().cloned() {
        let route = registry
            .setup_discovered(client.clone(), identity.clone())
            .await
            .inspect_err(|e| error!(kind = %identity, error = %e, "Failed to set up gate"))?;
        info!(kind = %identity, route = %route, "Gate ready");
    }

    let app = registry.into_router(Some(health_state.clone()));

    let webhook_handle = {
        let port = config.webhook_port;
        let cert_path = config.cert_path.clone();
        let key_path = config.key_path.clone();
        tokio::spawn(async move {
            if let Err(e) = run_webhook_server(app, port, &cert_path, &key_path).await {
                error!("Webhook server error: {}", e);
            }
        })
    };

    health_state.set_ready(true).await;

    // Wait for any task to complete (or fail), or shutdown signal
    tokio::select! {
        result = webhook_handle => {
            if let Err(e) = result {
                error!("Webhook server task panicked: {}", e);
            }
        }
        result = health_handle => {
            if let Err(e) = result {
                error!("Health server task panicked: {}", e);
            }
        }
        // Handle graceful shutdown on SIGTERM or SIGINT
        _ = shutdown_signal() => {
            info!("Received shutdown signal, initiating graceful shutdown...");

            // Fail readiness so the Service stops routing admission calls here
            health_state.set_ready(false).await;
            info!("Marked webhook as not ready");

            info!(
                "Waiting {}s for in-flight admission requests to complete...",
                SHUTDOWN_GRACE_PERIOD_SECS
            );
            tokio::time::sleep(Duration::from_secs(SHUTDOWN_GRACE_PERIOD_SECS)).await;

            info!("Grace period complete, shutting down");
        }
    }

    info!("highlander stopped");
    Ok(())
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
///
/// Note: Signal handler setup failures are fatal - the webhook cannot shut down
/// gracefully without them. Using expect() here is intentional.
#[allow(clippy::expect_used)]
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
