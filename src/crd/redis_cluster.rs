use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// RedisCluster is the Schema for the redisclusters API
///
/// Only the fields the operator needs to protect the cluster during voluntary
/// disruptions are modelled here.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[kube(
    group = "redis.example.com",
    version = "v1alpha1",
    kind = "RedisCluster",
    plural = "redisclusters",
    shortname = "rdc",
    namespaced,
    printcolumn = r#"{"name":"Primaries", "type":"integer", "jsonPath":".spec.numberOfPrimaries"}"#,
    printcolumn = r#"{"name":"Replication", "type":"integer", "jsonPath":".spec.replicationFactor"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct RedisClusterSpec {
    /// Number of primary (write-leader) nodes, one per shard
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_primaries: Option<i32>,

    /// Number of replicas kept for every primary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_factor: Option<i32>,

    /// Metadata stamped onto every member pod
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_template: Option<PodTemplateMetadata>,
}

/// Extra labels and annotations for the cluster's member pods
#[derive(Serialize, Deserialize, Clone, Debug, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PodTemplateMetadata {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}
