//! PodDisruptionBudget resource generation for Redis clusters
//!
//! Every cluster gets exactly one PDB, named after the cluster, that keeps all
//! but one member pod available during voluntary disruptions (node drains,
//! rolling upgrades). The cluster survives losing one node, so evictions are
//! serialized one pod at a time.

use std::collections::BTreeMap;

use k8s_openapi::api::policy::v1::{PodDisruptionBudget, PodDisruptionBudgetSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, LabelSelectorRequirement};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::ResourceExt;
use kube::core::ObjectMeta;

use crate::controller::error::{Error, Result};
use crate::crd::{RedisCluster, RedisClusterSpec};
use crate::resources::common::{cluster_annotations, cluster_labels, owner_reference};

/// Minimum number of member pods that must stay available
///
/// `primaries * (1 + replication_factor)` pods make up the cluster, and at most
/// one of them may be voluntarily evicted at a time.
pub fn min_available(spec: &RedisClusterSpec) -> Result<i32> {
    let primaries = spec
        .number_of_primaries
        .ok_or(Error::MissingObjectKey(".spec.numberOfPrimaries"))?;
    let replication_factor = spec
        .replication_factor
        .ok_or(Error::MissingObjectKey(".spec.replicationFactor"))?;

    if primaries < 1 {
        return Err(Error::ValidationError(format!(
            "numberOfPrimaries must be at least 1, got {primaries}"
        )));
    }
    if replication_factor < 0 {
        return Err(Error::ValidationError(format!(
            "replicationFactor must not be negative, got {replication_factor}"
        )));
    }

    let total_pods = replication_factor
        .checked_add(1)
        .and_then(|pods_per_shard| primaries.checked_mul(pods_per_shard))
        .ok_or_else(|| {
            Error::ValidationError(format!(
                "{primaries} primaries with replicationFactor {replication_factor} overflows the pod count"
            ))
        })?;

    // total_pods >= 1 here
    Ok(total_pods - 1)
}

/// Generate the desired PodDisruptionBudget for the cluster
///
/// The result depends only on the cluster, so calling this twice yields equal
/// objects. The selector matches exactly the PDB's own labels.
pub fn desired_pdb(cluster: &RedisCluster) -> Result<PodDisruptionBudget> {
    let labels = cluster_labels(cluster)?;
    let annotations = cluster_annotations(cluster)?;
    let min_available = min_available(&cluster.spec)?;

    Ok(PodDisruptionBudget {
        metadata: ObjectMeta {
            name: Some(cluster.name_any()),
            namespace: cluster.namespace(),
            labels: Some(labels.clone()),
            annotations: Some(annotations),
            owner_references: Some(vec![owner_reference(cluster)]),
            ..Default::default()
        },
        spec: Some(PodDisruptionBudgetSpec {
            min_available: Some(IntOrString::Int(min_available)),
            selector: Some(LabelSelector {
                match_labels: Some(labels),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    })
}

/// Check whether the live PDB has drifted from the cluster's desired state
///
/// Only labels, annotations and spec are compared. Everything else on the live
/// object (finalizers, resourceVersion, managed fields) belongs to the API
/// server or other controllers.
pub fn needs_update(live: &PodDisruptionBudget, cluster: &RedisCluster) -> Result<bool> {
    let desired = desired_pdb(cluster)?;

    let labels_match = string_maps_equal(
        live.metadata.labels.as_ref(),
        desired.metadata.labels.as_ref(),
    );
    let annotations_match = string_maps_equal(
        live.metadata.annotations.as_ref(),
        desired.metadata.annotations.as_ref(),
    );
    let spec_match = specs_equal(live.spec.as_ref(), desired.spec.as_ref());

    Ok(!(labels_match && annotations_match && spec_match))
}

/// Copy the live PDB and overwrite the reconciled fields with the desired ones
///
/// Identity, resourceVersion and any metadata owned by others are kept, so the
/// write is rejected by the API server if the live object changed meanwhile.
pub fn patch_live_pdb(live: &PodDisruptionBudget, desired: PodDisruptionBudget) -> PodDisruptionBudget {
    let mut patched = live.clone();
    patched.metadata.labels = desired.metadata.labels;
    patched.metadata.annotations = desired.metadata.annotations;
    patched.spec = desired.spec;
    patched
}

/// A missing map and an empty map are the same to the API server
fn string_maps_equal(
    a: Option<&BTreeMap<String, String>>,
    b: Option<&BTreeMap<String, String>>,
) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a == b,
        (Some(m), None) | (None, Some(m)) => m.is_empty(),
        (None, None) => true,
    }
}

fn requirements_equal(
    a: Option<&Vec<LabelSelectorRequirement>>,
    b: Option<&Vec<LabelSelectorRequirement>>,
) -> bool {
    let a = a.map(Vec::as_slice).unwrap_or_default();
    let b = b.map(Vec::as_slice).unwrap_or_default();
    a == b
}

/// An absent selector matches nothing while an empty one matches everything,
/// so presence is significant here.
fn selectors_equal(a: Option<&LabelSelector>, b: Option<&LabelSelector>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => {
            string_maps_equal(a.match_labels.as_ref(), b.match_labels.as_ref())
                && requirements_equal(a.match_expressions.as_ref(), b.match_expressions.as_ref())
        }
        (None, None) => true,
        _ => false,
    }
}

fn specs_equal(a: Option<&PodDisruptionBudgetSpec>, b: Option<&PodDisruptionBudgetSpec>) -> bool {
    let default = PodDisruptionBudgetSpec::default();
    let a = a.unwrap_or(&default);
    let b = b.unwrap_or(&default);

    a.min_available == b.min_available
        && a.max_unavailable == b.max_unavailable
        && selectors_equal(a.selector.as_ref(), b.selector.as_ref())
        && a.unhealthy_pod_eviction_policy == b.unhealthy_pod_eviction_policy
}
