pub mod config;
pub mod controller;
pub mod crd;
pub mod health;
pub mod resources;

pub use config::OperatorConfig;
pub use controller::{
    BackoffConfig, Context, Error, KubePdbStore, PdbAction, PdbStore, PodDisruptionBudgetControl,
    Result, error_policy, reconcile,
};
pub use crd::RedisCluster;
pub use health::{HealthState, Metrics};

use std::sync::Arc;

use futures::StreamExt;
use k8s_openapi::api::policy::v1::PodDisruptionBudget;
use kube::runtime::Controller;
use kube::runtime::controller::{Action, Error as ControllerError};
use kube::runtime::reflector::ObjectRef;
use kube::runtime::watcher;
use kube::{Api, Client};

type ControllerResult = std::result::Result<
    (ObjectRef<RedisCluster>, Action),
    ControllerError<Error, watcher::Error>,
>;

/// Run the RedisCluster controller until its watch streams end.
///
/// Clusters and the PodDisruptionBudgets they own are watched in
/// `config.watch_namespace`, or in every namespace when it is unset. Any event
/// on either triggers a reconciliation of the owning cluster.
pub async fn run_controller(
    client: Client,
    config: OperatorConfig,
    health_state: Option<Arc<HealthState>>,
) {
    let (clusters, pdbs): (Api<RedisCluster>, Api<PodDisruptionBudget>) =
        match config.watch_namespace.as_deref() {
            Some(ns) => (
                Api::namespaced(client.clone(), ns),
                Api::namespaced(client.clone(), ns),
            ),
            None => (Api::all(client.clone()), Api::all(client.clone())),
        };

    tracing::info!(
        scope = config.watch_namespace.as_deref().unwrap_or("cluster-wide"),
        "Starting RedisCluster controller"
    );

    if let Some(state) = &health_state {
        state.set_ready(true);
    }

    let watch = watcher::Config::default().any_semantic();
    let ctx = Arc::new(Context::new(client, config, health_state));

    Controller::new(clusters, watch.clone())
        .owns(pdbs, watch)
        .run(reconcile, error_policy, ctx)
        .for_each(|result| async move { log_result(result) })
        .await;

    tracing::error!("Controller stream ended unexpectedly");
}

fn log_result(result: ControllerResult) {
    match result {
        Ok((obj, _)) => tracing::debug!("Reconciled {}", obj),
        // Late events for a cluster that is already gone
        Err(ControllerError::ReconcilerFailed(err, obj)) if err.is_not_found() => {
            tracing::debug!("{} no longer exists: {}", obj, err);
        }
        Err(e) => tracing::error!("Reconciliation error: {:?}", e),
    }
}
