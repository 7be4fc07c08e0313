use std::sync::Arc;
use std::time::Duration;

use kube::Client;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use redis_cluster_operator::{HealthState, OperatorConfig, health, run_controller};

/// Time given to in-flight reconciliations once the operator is marked unready
const DRAIN_PERIOD: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::from_default_env()
        .add_directive("redis_cluster_operator=info".parse()?)
        .add_directive("kube=info".parse()?);
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = OperatorConfig::from_env()?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        namespace = config.watch_namespace.as_deref().unwrap_or("cluster-wide"),
        requeue_interval = ?config.requeue_interval,
        health_port = config.health_port,
        "Starting redis-cluster-operator"
    );

    let client = Client::try_default().await?;
    let state = Arc::new(HealthState::new());

    let mut probes = tokio::spawn(health::serve(state.clone(), config.health_port));
    let mut controller = tokio::spawn(run_controller(client, config, Some(state.clone())));

    tokio::select! {
        joined = &mut controller => {
            if let Err(e) = joined {
                error!("Controller task failed: {}", e);
            }
        }
        joined = &mut probes => {
            match joined {
                Ok(Err(e)) => error!("Health server stopped: {}", e),
                Err(e) => error!("Health server task failed: {}", e),
                Ok(Ok(())) => {}
            }
        }
        _ = shutdown_signal() => {
            info!("Shutdown requested, draining for {:?}", DRAIN_PERIOD);
            state.set_ready(false);
            tokio::time::sleep(DRAIN_PERIOD).await;
        }
    }

    controller.abort();
    probes.abort();
    info!("Operator stopped");
    Ok(())
}

/// Resolve on SIGINT, or SIGTERM on unix
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
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
        _ = interrupt => {},
        _ = terminate => {},
    }
}
