//! Operator configuration read from the environment

use std::time::Duration;

use crate::controller::error::{Error, Result};

/// Default interval between periodic reconciliations of a healthy cluster
pub const DEFAULT_REQUEUE_INTERVAL_SECS: u64 = 300;

/// Default port of the health and metrics server
pub const DEFAULT_HEALTH_PORT: u16 = 8080;

/// Runtime settings for the operator
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperatorConfig {
    /// Restrict watches to one namespace (`WATCH_NAMESPACE`); cluster-wide when unset
    pub watch_namespace: Option<String>,
    /// Requeue interval after a successful reconciliation (`REQUEUE_INTERVAL_SECS`)
    pub requeue_interval: Duration,
    /// Port for `/healthz`, `/readyz` and `/metrics` (`HEALTH_PORT`)
    pub health_port: u16,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            watch_namespace: None,
            requeue_interval: Duration::from_secs(DEFAULT_REQUEUE_INTERVAL_SECS),
            health_port: DEFAULT_HEALTH_PORT,
        }
    }
}

impl OperatorConfig {
    /// Read the configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        let requeue_interval = match get("REQUEUE_INTERVAL_SECS") {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| {
                    Error::InvalidConfig(format!("REQUEUE_INTERVAL_SECS is not a number: {raw}"))
                })?;
                if secs == 0 {
                    return Err(Error::InvalidConfig(
                        "REQUEUE_INTERVAL_SECS must be greater than zero".to_string(),
                    ));
                }
                Duration::from_secs(secs)
            }
            None => defaults.requeue_interval,
        };

        let health_port = match get("HEALTH_PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| {
                Error::InvalidConfig(format!("HEALTH_PORT is not a valid port: {raw}"))
            })?,
            None => defaults.health_port,
        };

        Ok(Self {
            watch_namespace: get("WATCH_NAMESPACE").map(|ns| ns.trim().to_string()),
            requeue_interval,
            health_port,
        })
    }
}
