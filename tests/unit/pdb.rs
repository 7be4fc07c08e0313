//! Unit tests for PodDisruptionBudget generation and drift detection

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelectorRequirement, Time};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::ResourceExt;
use redis_cluster_operator::Error;
use redis_cluster_operator::resources::CLUSTER_NAME_LABEL_KEY;
use redis_cluster_operator::resources::pdb::{desired_pdb, needs_update};

use crate::common::{RedisClusterBuilder, create_test_cluster};

fn min_available_of(cluster: &redis_cluster_operator::RedisCluster) -> IntOrString {
    desired_pdb(cluster)
        .unwrap()
        .spec
        .unwrap()
        .min_available
        .unwrap()
}

mod desired_state_tests {
    use super::*;

    #[test]
    fn test_rediscluster_scenario() {
        let cluster = RedisClusterBuilder::new("rediscluster", "default")
            .with_primaries(3)
            .with_replication_factor(1)
            .build();
        let pdb = desired_pdb(&cluster).unwrap();

        assert_eq!(pdb.name_any(), "rediscluster");
        assert_eq!(pdb.namespace(), Some("default".to_string()));

        let spec = pdb.spec.as_ref().unwrap();
        assert_eq!(spec.min_available, Some(IntOrString::Int(5)));
        assert_eq!(spec.max_unavailable, None);

        let selector = spec.selector.as_ref().unwrap();
        assert_eq!(
            selector.match_labels,
            Some(BTreeMap::from([(
                CLUSTER_NAME_LABEL_KEY.to_string(),
                "rediscluster".to_string()
            )]))
        );
        assert_eq!(selector.match_expressions, None);

        let owners = pdb.metadata.owner_references.as_ref().unwrap();
        assert_eq!(owners.len(), 1);
        assert_eq!(owners[0].name, "rediscluster");
    }

    #[test]
    fn test_min_available_three_primaries_one_replica() {
        let cluster = create_test_cluster("rediscluster", "default", 3, 1);
        assert_eq!(min_available_of(&cluster), IntOrString::Int(5));
    }

    #[test]
    fn test_min_available_two_primaries_one_replica() {
        let cluster = create_test_cluster("rediscluster", "default", 2, 1);
        assert_eq!(min_available_of(&cluster), IntOrString::Int(3));
    }

    #[test]
    fn test_min_available_without_replicas() {
        let cluster = create_test_cluster("rediscluster", "default", 3, 0);
        assert_eq!(min_available_of(&cluster), IntOrString::Int(2));
    }

    #[test]
    fn test_min_available_single_node() {
        let cluster = create_test_cluster("rediscluster", "default", 1, 0);
        assert_eq!(min_available_of(&cluster), IntOrString::Int(0));
    }

    #[test]
    fn test_selector_matches_labels() {
        let cluster = RedisClusterBuilder::new("cache", "prod")
            .with_pod_label("team", "platform")
            .with_pod_label("app.kubernetes.io/part-of", "checkout")
            .build();
        let pdb = desired_pdb(&cluster).unwrap();

        let labels = pdb.metadata.labels.clone().unwrap();
        assert_eq!(labels.len(), 3);
        assert_eq!(
            pdb.spec.unwrap().selector.unwrap().match_labels,
            Some(labels)
        );
    }

    #[test]
    fn test_annotations_propagated() {
        let cluster = RedisClusterBuilder::new("cache", "prod")
            .with_pod_annotation("example.com/owner", "team-cache")
            .build();
        let pdb = desired_pdb(&cluster).unwrap();

        assert_eq!(
            pdb.metadata.annotations,
            Some(BTreeMap::from([(
                "example.com/owner".to_string(),
                "team-cache".to_string()
            )]))
        );
    }

    #[test]
    fn test_annotations_empty_by_default() {
        let cluster = create_test_cluster("cache", "prod", 3, 1);
        let pdb = desired_pdb(&cluster).unwrap();
        assert_eq!(pdb.metadata.annotations, Some(BTreeMap::new()));
    }

    #[test]
    fn test_owner_reference() {
        let cluster = create_test_cluster("cache", "prod", 3, 1);
        let pdb = desired_pdb(&cluster).unwrap();

        let owners = pdb.metadata.owner_references.unwrap();
        assert_eq!(owners.len(), 1);
        assert_eq!(owners[0].kind, "RedisCluster");
        assert_eq!(owners[0].api_version, "redis.example.com/v1alpha1");
        assert_eq!(owners[0].name, "cache");
        assert_eq!(owners[0].uid, "test-uid-12345");
        assert_eq!(owners[0].controller, Some(true));
    }

    #[test]
    fn test_deterministic() {
        let cluster = RedisClusterBuilder::new("cache", "prod")
            .with_pod_label("b", "2")
            .with_pod_label("a", "1")
            .with_pod_annotation("note", "x")
            .build();
        assert_eq!(desired_pdb(&cluster).unwrap(), desired_pdb(&cluster).unwrap());
    }

    #[test]
    fn test_missing_primaries() {
        let cluster = RedisClusterBuilder::new("cache", "prod")
            .without_primaries()
            .build();
        assert!(matches!(
            desired_pdb(&cluster),
            Err(Error::MissingObjectKey(".spec.numberOfPrimaries"))
        ));
    }

    #[test]
    fn test_missing_replication_factor() {
        let cluster = RedisClusterBuilder::new("cache", "prod")
            .without_replication_factor()
            .build();
        assert!(matches!(
            desired_pdb(&cluster),
            Err(Error::MissingObjectKey(".spec.replicationFactor"))
        ));
    }

    #[test]
    fn test_zero_primaries_rejected() {
        let cluster = create_test_cluster("cache", "prod", 0, 1);
        assert!(matches!(
            desired_pdb(&cluster),
            Err(Error::ValidationError(_))
        ));
    }

    #[test]
    fn test_negative_replication_factor_rejected() {
        let cluster = create_test_cluster("cache", "prod", 3, -1);
        assert!(matches!(
            desired_pdb(&cluster),
            Err(Error::ValidationError(_))
        ));
    }

    #[test]
    fn test_malformed_identity_propagates() {
        let cluster = RedisClusterBuilder::new("cache", "prod")
            .with_pod_label("not a valid key", "x")
            .build();
        assert!(matches!(
            desired_pdb(&cluster),
            Err(Error::ValidationError(_))
        ));

        let nameless = RedisClusterBuilder::new("cache", "prod").without_name().build();
        assert!(matches!(
            desired_pdb(&nameless),
            Err(Error::MissingObjectKey(".metadata.name"))
        ));
    }
}

mod drift_tests {
    use super::*;

    #[test]
    fn test_desired_is_not_drift() {
        let cluster = create_test_cluster("cache", "prod", 3, 1);
        let live = desired_pdb(&cluster).unwrap();
        assert!(!needs_update(&live, &cluster).unwrap());
    }

    #[test]
    fn test_server_populated_metadata_is_not_drift() {
        let cluster = create_test_cluster("cache", "prod", 3, 1);
        let mut live = desired_pdb(&cluster).unwrap();
        live.metadata.resource_version = Some("12345".to_string());
        live.metadata.uid = Some("pdb-uid".to_string());
        live.metadata.generation = Some(4);
        live.metadata.creation_timestamp = Some(Time("2026-01-01T00:00:00Z".parse().unwrap()));
        live.metadata.finalizers = Some(vec!["example.com/protect".to_string()]);

        assert!(!needs_update(&live, &cluster).unwrap());
    }

    #[test]
    fn test_missing_annotations_equal_empty() {
        // The API server drops empty maps
        let cluster = create_test_cluster("cache", "prod", 3, 1);
        let mut live = desired_pdb(&cluster).unwrap();
        live.metadata.annotations = None;

        assert!(!needs_update(&live, &cluster).unwrap());
    }

    #[test]
    fn test_label_drift() {
        let cluster = create_test_cluster("cache", "prod", 3, 1);
        let mut live = desired_pdb(&cluster).unwrap();
        live.labels_mut()
            .insert("extra".to_string(), "label".to_string());

        assert!(needs_update(&live, &cluster).unwrap());
    }

    #[test]
    fn test_removed_label_drift() {
        let cluster = create_test_cluster("cache", "prod", 3, 1);
        let mut live = desired_pdb(&cluster).unwrap();
        live.metadata.labels = None;

        assert!(needs_update(&live, &cluster).unwrap());
    }

    #[test]
    fn test_annotation_drift() {
        let cluster = create_test_cluster("cache", "prod", 3, 1);
        let mut live = desired_pdb(&cluster).unwrap();
        live.annotations_mut()
            .insert("example.com/edited".to_string(), "by-hand".to_string());

        assert!(needs_update(&live, &cluster).unwrap());
    }

    #[test]
    fn test_min_available_drift() {
        let cluster = create_test_cluster("cache", "prod", 3, 1);
        let mut live = desired_pdb(&cluster).unwrap();
        live.spec.as_mut().unwrap().min_available = Some(IntOrString::Int(4));

        assert!(needs_update(&live, &cluster).unwrap());
    }

    #[test]
    fn test_min_available_as_string_is_drift() {
        let cluster = create_test_cluster("cache", "prod", 3, 1);
        let mut live = desired_pdb(&cluster).unwrap();
        live.spec.as_mut().unwrap().min_available = Some(IntOrString::String("5".to_string()));

        assert!(needs_update(&live, &cluster).unwrap());
    }

    #[test]
    fn test_scale_out_is_drift() {
        let before = create_test_cluster("cache", "prod", 3, 1);
        let live = desired_pdb(&before).unwrap();
        let after = create_test_cluster("cache", "prod", 4, 1);

        assert!(needs_update(&live, &after).unwrap());
    }

    #[test]
    fn test_selector_drift() {
        let cluster = create_test_cluster("cache", "prod", 3, 1);
        let mut live = desired_pdb(&cluster).unwrap();
        live.spec
            .as_mut()
            .unwrap()
            .selector
            .as_mut()
            .unwrap()
            .match_expressions = Some(vec![LabelSelectorRequirement {
            key: "role".to_string(),
            operator: "In".to_string(),
            values: Some(vec!["primary".to_string()]),
        }]);

        assert!(needs_update(&live, &cluster).unwrap());
    }

    #[test]
    fn test_removed_selector_is_drift() {
        let cluster = create_test_cluster("cache", "prod", 3, 1);
        let mut live = desired_pdb(&cluster).unwrap();
        live.spec.as_mut().unwrap().selector = None;

        assert!(needs_update(&live, &cluster).unwrap());
    }

    #[test]
    fn test_max_unavailable_is_drift() {
        let cluster = create_test_cluster("cache", "prod", 3, 1);
        let mut live = desired_pdb(&cluster).unwrap();
        live.spec.as_mut().unwrap().max_unavailable = Some(IntOrString::Int(1));

        assert!(needs_update(&live, &cluster).unwrap());
    }

    #[test]
    fn test_owner_reference_change_is_not_drift() {
        let cluster = create_test_cluster("cache", "prod", 3, 1);
        let mut live = desired_pdb(&cluster).unwrap();
        live.metadata.owner_references = None;

        assert!(!needs_update(&live, &cluster).unwrap());
    }

    #[test]
    fn test_build_error_propagates() {
        let good = create_test_cluster("cache", "prod", 3, 1);
        let live = desired_pdb(&good).unwrap();
        let bad = RedisClusterBuilder::new("cache", "prod")
            .without_replication_factor()
            .build();

        assert!(matches!(
            needs_update(&live, &bad),
            Err(Error::MissingObjectKey(".spec.replicationFactor"))
        ));
    }
}
