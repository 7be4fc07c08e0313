//! Reconciliation operations for a RedisCluster's PodDisruptionBudget
//!
//! Each operation rebuilds the desired PDB from the cluster and issues at most
//! one call to the injected [`PdbStore`]. Errors are returned unchanged; the
//! caller owns retry policy and decides that a missing PDB on delete is fine.

use k8s_openapi::api::policy::v1::PodDisruptionBudget;
use kube::ResourceExt;
use tracing::{debug, info, instrument};

use crate::controller::error::{Error, Result};
use crate::controller::store::PdbStore;
use crate::crd::RedisCluster;
use crate::resources::pdb;

/// What happened to the PodDisruptionBudget during a reconciliation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PdbAction {
    Created,
    Updated,
    Unchanged,
    Deleted,
}

impl PdbAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PdbAction::Created => "created",
            PdbAction::Updated => "updated",
            PdbAction::Unchanged => "unchanged",
            PdbAction::Deleted => "deleted",
        }
    }
}

/// Manages the PodDisruptionBudget derived from a RedisCluster
pub struct PodDisruptionBudgetControl<S> {
    store: S,
}

impl<S: PdbStore> PodDisruptionBudgetControl<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fetch the live PDB for the cluster
    #[instrument(skip(self, cluster), fields(name = %cluster.name_any()))]
    pub async fn get_pdb(&self, cluster: &RedisCluster) -> Result<PodDisruptionBudget> {
        let namespace = cluster_namespace(cluster)?;
        self.store.get(&namespace, &cluster.name_any()).await
    }

    /// Create the PDB for a cluster that has none yet
    #[instrument(skip(self, cluster), fields(name = %cluster.name_any()))]
    pub async fn create_pdb(&self, cluster: &RedisCluster) -> Result<PodDisruptionBudget> {
        cluster_namespace(cluster)?;
        let desired = pdb::desired_pdb(cluster)?;
        let created = self.store.create(&desired).await?;
        info!("Created PodDisruptionBudget");
        Ok(created)
    }

    /// Check whether the live PDB differs from the desired one
    pub fn needs_update(&self, cluster: &RedisCluster, live: &PodDisruptionBudget) -> Result<bool> {
        pdb::needs_update(live, cluster)
    }

    /// Bring the live PDB's labels, annotations and spec back to the desired state
    #[instrument(skip(self, cluster, live), fields(name = %cluster.name_any()))]
    pub async fn update_pdb(
        &self,
        cluster: &RedisCluster,
        live: &PodDisruptionBudget,
    ) -> Result<PodDisruptionBudget> {
        let desired = pdb::desired_pdb(cluster)?;
        let patched = pdb::patch_live_pdb(live, desired);
        let updated = self.store.update(&patched).await?;
        info!(
            resource_version = updated.metadata.resource_version.as_deref().unwrap_or_default(),
            "Updated PodDisruptionBudget"
        );
        Ok(updated)
    }

    /// Delete the cluster's PDB
    ///
    /// A missing PDB is reported as an error; callers treat
    /// [`Error::is_not_found`] as already deleted.
    #[instrument(skip(self, cluster), fields(name = %cluster.name_any()))]
    pub async fn delete_pdb(&self, cluster: &RedisCluster) -> Result<()> {
        let namespace = cluster_namespace(cluster)?;
        self.store.delete(&namespace, &cluster.name_any()).await?;
        info!("Deleted PodDisruptionBudget");
        Ok(())
    }

    /// Fetch the live PDB and create or update it as needed
    pub async fn ensure_pdb(&self, cluster: &RedisCluster) -> Result<PdbAction> {
        let live = match self.get_pdb(cluster).await {
            Ok(live) => live,
            Err(e) if e.is_not_found() => {
                self.create_pdb(cluster).await?;
                return Ok(PdbAction::Created);
            }
            Err(e) => return Err(e),
        };

        if self.needs_update(cluster, &live)? {
            self.update_pdb(cluster, &live).await?;
            Ok(PdbAction::Updated)
        } else {
            debug!("PodDisruptionBudget {} is up to date", cluster.name_any());
            Ok(PdbAction::Unchanged)
        }
    }
}

fn cluster_namespace(cluster: &RedisCluster) -> Result<String> {
    cluster
        .namespace()
        .ok_or(Error::MissingObjectKey(".metadata.namespace"))
}
