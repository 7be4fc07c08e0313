//! Identity metadata shared by every resource derived from a RedisCluster
//!
//! Labels, annotations and owner references are computed here so that the
//! PodDisruptionBudget selector always matches the labels the cluster's member
//! pods carry.

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;

use crate::controller::error::{Error, Result};
use crate::crd::RedisCluster;

/// API version for RedisCluster CRD
pub const API_VERSION: &str = "redis.example.com/v1alpha1";

/// Kind for RedisCluster CRD
pub const KIND: &str = "RedisCluster";

/// Operator field manager name
pub const FIELD_MANAGER: &str = "redis-cluster-operator";

/// Label identifying the cluster a member pod (or derived resource) belongs to
pub const CLUSTER_NAME_LABEL_KEY: &str = "redis.example.com/cluster-name";

const MAX_LABEL_NAME_LEN: usize = 63;
const MAX_LABEL_PREFIX_LEN: usize = 253;

/// Generate an owner reference for a RedisCluster
///
/// The reference is the controlling one, so child resources are garbage
/// collected when the cluster is deleted.
pub fn owner_reference(cluster: &RedisCluster) -> OwnerReference {
    OwnerReference {
        api_version: API_VERSION.to_string(),
        kind: KIND.to_string(),
        name: cluster.metadata.name.clone().unwrap_or_default(),
        uid: cluster.metadata.uid.clone().unwrap_or_default(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    }
}

/// Labels carried by every member pod of the cluster
///
/// Pod template labels are merged in, but can never replace the cluster name
/// label. Fails when the cluster has no name or any label is malformed.
pub fn cluster_labels(cluster: &RedisCluster) -> Result<BTreeMap<String, String>> {
    let name = cluster
        .metadata
        .name
        .as_deref()
        .filter(|name| !name.is_empty())
        .ok_or(Error::MissingObjectKey(".metadata.name"))?;
    validate_label_value(name)?;

    let mut labels = BTreeMap::new();
    if let Some(template) = &cluster.spec.pod_template {
        for (key, value) in &template.labels {
            validate_label_key(key)?;
            validate_label_value(value)?;
            labels.insert(key.clone(), value.clone());
        }
    }
    labels.insert(CLUSTER_NAME_LABEL_KEY.to_string(), name.to_string());

    Ok(labels)
}

/// Annotations propagated from the cluster's pod template
pub fn cluster_annotations(cluster: &RedisCluster) -> Result<BTreeMap<String, String>> {
    let mut annotations = BTreeMap::new();
    if let Some(template) = &cluster.spec.pod_template {
        for (key, value) in &template.annotations {
            validate_label_key(key)?;
            annotations.insert(key.clone(), value.clone());
        }
    }
    Ok(annotations)
}

/// Validate a label or annotation key (`[prefix/]name`)
fn validate_label_key(key: &str) -> Result<()> {
    let (prefix, name) = match key.split_once('/') {
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, key),
    };

    if let Some(prefix) = prefix {
        let valid_prefix = !prefix.is_empty()
            && prefix.len() <= MAX_LABEL_PREFIX_LEN
            && prefix.split('.').all(is_dns_label);
        if !valid_prefix {
            return Err(Error::ValidationError(format!(
                "invalid prefix in metadata key {key:?}"
            )));
        }
    }

    if name.is_empty() || !is_qualified_name(name) {
        return Err(Error::ValidationError(format!(
            "invalid metadata key {key:?}"
        )));
    }

    Ok(())
}

/// Validate a label value (may be empty)
fn validate_label_value(value: &str) -> Result<()> {
    if value.is_empty() || is_qualified_name(value) {
        Ok(())
    } else {
        Err(Error::ValidationError(format!(
            "invalid label value {value:?}"
        )))
    }
}

/// Alphanumeric at both ends, `-`, `_` or `.` in between, at most 63 characters
fn is_qualified_name(s: &str) -> bool {
    let bytes = s.as_bytes();
    match (bytes.first(), bytes.last()) {
        (Some(first), Some(last)) => {
            s.len() <= MAX_LABEL_NAME_LEN
                && first.is_ascii_alphanumeric()
                && last.is_ascii_alphanumeric()
                && bytes
                    .iter()
                    .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
        }
        _ => false,
    }
}

/// RFC 1123 label: lowercase alphanumeric or `-`, alphanumeric at both ends
fn is_dns_label(s: &str) -> bool {
    let bytes = s.as_bytes();
    match (bytes.first(), bytes.last()) {
        (Some(first), Some(last)) => {
            s.len() <= MAX_LABEL_NAME_LEN
                && (first.is_ascii_lowercase() || first.is_ascii_digit())
                && (last.is_ascii_lowercase() || last.is_ascii_digit())
                && bytes
                    .iter()
                    .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-')
        }
        _ => false,
    }
}
