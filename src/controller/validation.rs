//! Validation of RedisCluster specs before any derived resource is touched

use crate::controller::error::{Error, Result};
use crate::crd::RedisCluster;

/// Minimum number of primaries
pub const MIN_PRIMARIES: i32 = 1;

/// Maximum number of primaries (Redis Cluster has 16384 hash slots, but
/// anything beyond this is almost certainly a typo)
pub const MAX_PRIMARIES: i32 = 1000;

/// Maximum replicas per primary
pub const MAX_REPLICATION_FACTOR: i32 = 10;

/// Validate the cluster spec
pub fn validate_spec(cluster: &RedisCluster) -> Result<()> {
    validate_primaries(cluster)?;
    validate_replication_factor(cluster)?;
    Ok(())
}

fn validate_primaries(cluster: &RedisCluster) -> Result<()> {
    let primaries = cluster
        .spec
        .number_of_primaries
        .ok_or(Error::MissingObjectKey(".spec.numberOfPrimaries"))?;

    if primaries < MIN_PRIMARIES {
        return Err(Error::ValidationError(format!(
            "numberOfPrimaries {} is below minimum {}",
            primaries, MIN_PRIMARIES
        )));
    }

    if primaries > MAX_PRIMARIES {
        return Err(Error::ValidationError(format!(
            "numberOfPrimaries {} exceeds maximum {}",
            primaries, MAX_PRIMARIES
        )));
    }

    Ok(())
}

fn validate_replication_factor(cluster: &RedisCluster) -> Result<()> {
    let replication_factor = cluster
        .spec
        .replication_factor
        .ok_or(Error::MissingObjectKey(".spec.replicationFactor"))?;

    if replication_factor < 0 {
        return Err(Error::ValidationError(format!(
            "replicationFactor {} must not be negative",
            replication_factor
        )));
    }

    if replication_factor > MAX_REPLICATION_FACTOR {
        return Err(Error::ValidationError(format!(
            "replicationFactor {} exceeds maximum {}",
            replication_factor, MAX_REPLICATION_FACTOR
        )));
    }

    Ok(())
}
