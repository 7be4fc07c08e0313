//! Reconciliation entry point for RedisCluster resources
//!
//! Drives the PodDisruptionBudget operations from the controller loop: a
//! deleted cluster loses its PDB, any other cluster gets its PDB created or
//! brought back in line with the spec.

use std::sync::Arc;
use std::time::{Duration, Instant};

use kube::ResourceExt;
use kube::runtime::controller::Action;
use kube::runtime::reflector::ObjectRef;
use tracing::{debug, error, info, instrument, warn};

use crate::controller::context::{Context, FailureTracker};
use crate::controller::error::{BackoffConfig, Error, Result};
use crate::controller::pdb_control::{PdbAction, PodDisruptionBudgetControl};
use crate::controller::store::PdbStore;
use crate::controller::validation::validate_spec;
use crate::crd::RedisCluster;

/// Main reconciliation function
#[instrument(skip(cluster, ctx), fields(name = %cluster.name_any(), namespace = cluster.namespace().unwrap_or_default()))]
pub async fn reconcile(cluster: Arc<RedisCluster>, ctx: Arc<Context>) -> Result<Action> {
    let start = Instant::now();
    let ns = cluster.namespace().unwrap_or_default();
    let name = cluster.name_any();

    info!("Reconciling RedisCluster");

    let control = ctx.pdb_control();
    let result = reconcile_pdb(&cluster, &control, ctx.config.requeue_interval).await;

    if result.is_ok() {
        ctx.failures.clear(&ObjectRef::from_obj(cluster.as_ref()));
    }

    if let Some(state) = &ctx.health_state {
        match &result {
            Ok((_, PdbAction::Deleted)) => state.metrics.forget_cluster(&ns, &name),
            Ok((_, outcome)) => {
                state
                    .metrics
                    .record_success(&ns, &name, start.elapsed(), outcome.as_str())
            }
            Err(_) => state.metrics.record_failure(&ns, &name),
        }
    }

    match result {
        Ok((action, outcome)) => {
            info!(pdb = outcome.as_str(), "Reconciliation completed successfully");
            Ok(action)
        }
        Err(e) => {
            error!("Reconciliation failed: {}", e);
            Err(e)
        }
    }
}

/// Reconcile the cluster's PodDisruptionBudget against any store
///
/// A missing PDB on deletion counts as deleted. Without a finalizer on the
/// cluster the deletion branch is best-effort: under background deletion the
/// owner reference's garbage collection removes the PDB instead.
pub async fn reconcile_pdb<S: PdbStore>(
    cluster: &RedisCluster,
    control: &PodDisruptionBudgetControl<S>,
    requeue_interval: Duration,
) -> Result<(Action, PdbAction)> {
    if cluster.metadata.deletion_timestamp.is_some() {
        match control.delete_pdb(cluster).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                debug!("PodDisruptionBudget for {} already gone", cluster.name_any());
            }
            Err(e) => return Err(e),
        }
        return Ok((Action::await_change(), PdbAction::Deleted));
    }

    validate_spec(cluster)?;

    let outcome = control.ensure_pdb(cluster).await?;
    Ok((Action::requeue(requeue_interval), outcome))
}

/// Error policy for the controller with exponential backoff
pub fn error_policy(cluster: Arc<RedisCluster>, error: &Error, ctx: Arc<Context>) -> Action {
    let name = cluster.name_any();
    let delay = requeue_delay(
        &BackoffConfig::default(),
        &ctx.failures,
        &ObjectRef::from_obj(cluster.as_ref()),
        error,
    );

    if error.is_retryable() {
        warn!(
            "Retryable error for {}: {:?}, requeuing in {:?}",
            name, error, delay
        );
    } else {
        error!(
            "Non-retryable error for {}: {:?}, requeuing in {:?} for manual intervention",
            name, error, delay
        );
    }

    Action::requeue(delay)
}

/// Delay before retrying a failed cluster, growing with its consecutive failures
pub fn requeue_delay(
    backoff: &BackoffConfig,
    failures: &FailureTracker,
    cluster: &ObjectRef<RedisCluster>,
    error: &Error,
) -> Duration {
    let attempt = failures.record_failure(cluster);
    backoff.delay_for_error(error, attempt)
}
