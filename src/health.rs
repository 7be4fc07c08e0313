//! Probe and Prometheus endpoints served next to the controller
//!
//! - `/healthz` answers as long as the process runs
//! - `/readyz` answers 200 once the controller has started watching
//! - `/metrics` exposes reconciliation counters as OpenMetrics text

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;
use tokio::net::TcpListener;

const METRIC_PREFIX: &str = "redis_cluster_operator";
/// `encode` writes the OpenMetrics text format, `# EOF` terminated
const OPENMETRICS_CONTENT_TYPE: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ClusterLabels {
    pub namespace: String,
    pub name: String,
}

impl ClusterLabels {
    fn new(namespace: &str, name: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct PdbActionLabels {
    pub action: String,
}

/// Reconciliation metrics
pub struct Metrics {
    registry: Registry,
    reconciliations: Family<ClusterLabels, Counter>,
    failures: Family<ClusterLabels, Counter>,
    duration: Family<ClusterLabels, Histogram>,
    pdb_actions: Family<PdbActionLabels, Counter>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::with_prefix(METRIC_PREFIX);

        let reconciliations = Family::<ClusterLabels, Counter>::default();
        registry.register(
            "reconciliations",
            "Successful reconciliations per cluster",
            reconciliations.clone(),
        );

        let failures = Family::<ClusterLabels, Counter>::default();
        registry.register(
            "reconciliation_errors",
            "Failed reconciliations per cluster",
            failures.clone(),
        );

        let duration = Family::<ClusterLabels, Histogram>::new_with_constructor(|| {
            Histogram::new(exponential_buckets(0.001, 2.0, 15))
        });
        registry.register(
            "reconcile_duration_seconds",
            "Time spent in successful reconciliations",
            duration.clone(),
        );

        let pdb_actions = Family::<PdbActionLabels, Counter>::default();
        registry.register(
            "pdb_actions",
            "PodDisruptionBudget outcomes of successful reconciliations",
            pdb_actions.clone(),
        );

        Self {
            registry,
            reconciliations,
            failures,
            duration,
            pdb_actions,
        }
    }

    /// Record a successful reconciliation and what it did to the PDB
    pub fn record_success(&self, namespace: &str, name: &str, elapsed: Duration, action: &str) {
        let labels = ClusterLabels::new(namespace, name);
        self.reconciliations.get_or_create(&labels).inc();
        self.duration
            .get_or_create(&labels)
            .observe(elapsed.as_secs_f64());
        self.pdb_actions
            .get_or_create(&PdbActionLabels {
                action: action.to_string(),
            })
            .inc();
    }

    pub fn record_failure(&self, namespace: &str, name: &str) {
        self.failures
            .get_or_create(&ClusterLabels::new(namespace, name))
            .inc();
    }

    /// Drop the per-cluster series of a deleted cluster
    pub fn forget_cluster(&self, namespace: &str, name: &str) {
        let labels = ClusterLabels::new(namespace, name);
        self.reconciliations.remove(&labels);
        self.failures.remove(&labels);
        self.duration.remove(&labels);
        self.pdb_actions
            .get_or_create(&PdbActionLabels {
                action: "deleted".to_string(),
            })
            .inc();
    }

    /// Render the registry in OpenMetrics text format
    pub fn render(&self) -> Result<String, std::fmt::Error> {
        let mut body = String::new();
        encode(&mut body, &self.registry)?;
        Ok(body)
    }
}

/// State shared between the controller and the probe handlers
#[derive(Default)]
pub struct HealthState {
    ready: AtomicBool,
    pub metrics: Metrics,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::Release);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }
}

async fn healthz() -> &'static str {
    "ok"
}

async fn readyz(State(state): State<Arc<HealthState>>) -> Response {
    if state.is_ready() {
        (StatusCode::OK, "ready").into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready").into_response()
    }
}

async fn metrics(State(state): State<Arc<HealthState>>) -> Response {
    match state.metrics.render() {
        Ok(body) => ([(header::CONTENT_TYPE, OPENMETRICS_CONTENT_TYPE)], body).into_response(),
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub fn router(state: Arc<HealthState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Serve the probe endpoints on all interfaces until the listener fails
pub async fn serve(state: Arc<HealthState>, port: u16) -> std::io::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!("Health server listening on 0.0.0.0:{}", port);
    axum::serve(listener, router(state)).await
}
