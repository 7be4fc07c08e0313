use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use kube::Client;
use kube::runtime::reflector::ObjectRef;

use crate::config::OperatorConfig;
use crate::controller::pdb_control::PodDisruptionBudgetControl;
use crate::controller::store::KubePdbStore;
use crate::crd::RedisCluster;
use crate::health::HealthState;

/// Shared context for the controller
#[derive(Clone)]
pub struct Context {
    /// Kubernetes client
    pub client: Client,
    /// Runtime settings
    pub config: OperatorConfig,
    /// Health state for recording metrics (optional)
    pub health_state: Option<Arc<HealthState>>,
    /// Consecutive failures per cluster, drives the requeue backoff
    pub failures: Arc<FailureTracker>,
}

impl Context {
    pub fn new(
        client: Client,
        config: OperatorConfig,
        health_state: Option<Arc<HealthState>>,
    ) -> Self {
        Self {
            client,
            config,
            health_state,
            failures: Arc::new(FailureTracker::default()),
        }
    }

    /// PodDisruptionBudget operations backed by the API server
    pub fn pdb_control(&self) -> PodDisruptionBudgetControl<KubePdbStore> {
        PodDisruptionBudgetControl::new(KubePdbStore::new(self.client.clone()))
    }
}

/// Counts consecutive reconcile failures per cluster
#[derive(Debug, Default)]
pub struct FailureTracker {
    counts: Mutex<HashMap<ObjectRef<RedisCluster>, u32>>,
}

impl FailureTracker {
    /// Record a failure and return the number of failures before it
    pub fn record_failure(&self, cluster: &ObjectRef<RedisCluster>) -> u32 {
        let mut counts = self.lock();
        let count = counts.entry(cluster.clone()).or_insert(0);
        let previous = *count;
        *count = count.saturating_add(1);
        previous
    }

    /// Forget the failures of a cluster after a successful reconciliation
    pub fn clear(&self, cluster: &ObjectRef<RedisCluster>) {
        self.lock().remove(cluster);
    }

    pub fn failures(&self, cluster: &ObjectRef<RedisCluster>) -> u32 {
        self.lock().get(cluster).copied().unwrap_or(0)
    }

    // A panic while holding the lock leaves the counts usable
    fn lock(&self) -> MutexGuard<'_, HashMap<ObjectRef<RedisCluster>, u32>> {
        self.counts.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
