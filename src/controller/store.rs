//! Storage seam for PodDisruptionBudgets
//!
//! The reconciliation operations only ever talk to a [`PdbStore`], which keeps
//! them independent of the API client and lets tests substitute an in-memory
//! or mocked store.

use async_trait::async_trait;
use k8s_openapi::api::policy::v1::PodDisruptionBudget;
use kube::api::{DeleteParams, PostParams};
use kube::{Api, Client, ResourceExt};
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use crate::controller::error::{Error, Result};
use crate::resources::FIELD_MANAGER;

/// Get/create/update/delete of PodDisruptionBudgets by namespace and name
///
/// Implementations must return an error for which [`Error::is_not_found`] holds
/// when the object does not exist, and must reject updates carrying a stale
/// resourceVersion.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PdbStore: Send + Sync {
    /// Fetch a PDB
    async fn get(&self, namespace: &str, name: &str) -> Result<PodDisruptionBudget>;

    /// Create a PDB, returning the stored object
    async fn create(&self, pdb: &PodDisruptionBudget) -> Result<PodDisruptionBudget>;

    /// Replace a PDB, returning the stored object
    async fn update(&self, pdb: &PodDisruptionBudget) -> Result<PodDisruptionBudget>;

    /// Delete a PDB
    async fn delete(&self, namespace: &str, name: &str) -> Result<()>;
}

/// [`PdbStore`] backed by the Kubernetes API
#[derive(Clone)]
pub struct KubePdbStore {
    client: Client,
}

impl KubePdbStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<PodDisruptionBudget> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn post_params() -> PostParams {
    PostParams {
        field_manager: Some(FIELD_MANAGER.to_string()),
        ..Default::default()
    }
}

fn namespace_of(pdb: &PodDisruptionBudget) -> Result<String> {
    pdb.namespace()
        .ok_or(Error::MissingObjectKey(".metadata.namespace"))
}

#[async_trait]
impl PdbStore for KubePdbStore {
    async fn get(&self, namespace: &str, name: &str) -> Result<PodDisruptionBudget> {
        Ok(self.api(namespace).get(name).await?)
    }

    async fn create(&self, pdb: &PodDisruptionBudget) -> Result<PodDisruptionBudget> {
        let namespace = namespace_of(pdb)?;
        let created = self.api(&namespace).create(&post_params(), pdb).await?;
        debug!("Created PodDisruptionBudget: {}", created.name_any());
        Ok(created)
    }

    async fn update(&self, pdb: &PodDisruptionBudget) -> Result<PodDisruptionBudget> {
        let namespace = namespace_of(pdb)?;
        let name = pdb
            .metadata
            .name
            .as_deref()
            .ok_or(Error::MissingObjectKey(".metadata.name"))?;

        // PUT carries the live resourceVersion, so a concurrent writer yields a 409
        let updated = self
            .api(&namespace)
            .replace(name, &post_params(), pdb)
            .await?;
        debug!("Replaced PodDisruptionBudget: {}", name);
        Ok(updated)
    }

    async fn delete(&self, namespace: &str, name: &str) -> Result<()> {
        let response = self
            .api(namespace)
            .delete(name, &DeleteParams::default())
            .await?;
        if response.is_left() {
            debug!("Deletion of PodDisruptionBudget {} started", name);
        } else {
            debug!("Deleted PodDisruptionBudget: {}", name);
        }
        Ok(())
    }
}
