//! Operator configuration
//!
//! Read once at startup from environment variables; every value has a default.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::retry::RetryPolicy;

/// Name of the PVC created for filesystem storages.
///
/// Shared by every backup in a namespace, matching what scheduled backups use.
pub const DEFAULT_VOLUME_NAME: &str = "cluster1-xb-cron-pvc";

const DEFAULT_METRICS_PORT: u16 = 8080;
const DEFAULT_REQUEUE_SECS: u64 = 5;
const DEFAULT_VOLUME_POLL_ATTEMPTS: u32 = 5;

/// Settings consumed by the backup reconciler
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconcileSettings {
    /// Delay before every re-invocation, successful or not
    pub requeue_after: Duration,
    /// Name of the PVC for filesystem storages
    pub volume_name: String,
    /// Polling of the PVC phase until it is Bound
    pub volume_poll: RetryPolicy,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            requeue_after: Duration::from_secs(DEFAULT_REQUEUE_SECS),
            volume_name: DEFAULT_VOLUME_NAME.to_string(),
            volume_poll: RetryPolicy::linear(DEFAULT_VOLUME_POLL_ATTEMPTS, Duration::from_secs(1)),
        }
    }
}

/// Top-level operator configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperatorConfig {
    pub metrics_port: u16,
    pub reconcile: ReconcileSettings,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            metrics_port: DEFAULT_METRICS_PORT,
            reconcile: ReconcileSettings::default(),
        }
    }
}

impl OperatorConfig {
    /// Build the configuration from `XTRADB_BACKUP_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let metrics_port = parse_var(&lookup, "XTRADB_BACKUP_METRICS_PORT")?
            .unwrap_or(defaults.metrics_port);
        let requeue_after = parse_var::<u64>(&lookup, "XTRADB_BACKUP_REQUEUE_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.reconcile.requeue_after);
        let volume_name = lookup("XTRADB_BACKUP_VOLUME_NAME")
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.reconcile.volume_name);
        let attempts = parse_var::<u32>(&lookup, "XTRADB_BACKUP_VOLUME_POLL_ATTEMPTS")?
            .unwrap_or(defaults.reconcile.volume_poll.max_attempts);
        if attempts == 0 {
            anyhow::bail!("XTRADB_BACKUP_VOLUME_POLL_ATTEMPTS must be at least 1");
        }

        Ok(Self {
            metrics_port,
            reconcile: ReconcileSettings {
                requeue_after,
                volume_name,
                volume_poll: RetryPolicy {
                    max_attempts: attempts,
                    ..defaults.reconcile.volume_poll
                },
            },
        })
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|value| {
            value
                .trim()
                .parse::<T>()
                .with_context(|| format!("parsing {} value `{}`", key, value))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = OperatorConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, OperatorConfig::default());
        assert_eq!(config.reconcile.requeue_after, Duration::from_secs(5));
        assert_eq!(config.reconcile.volume_name, "cluster1-xb-cron-pvc");
        assert_eq!(config.reconcile.volume_poll.total_delay(), Duration::from_secs(10));
    }

    #[test]
    fn test_overrides() {
        let config = OperatorConfig::from_lookup(lookup(&[
            ("XTRADB_BACKUP_METRICS_PORT", "9090"),
            ("XTRADB_BACKUP_REQUEUE_SECS", "30"),
            ("XTRADB_BACKUP_VOLUME_NAME", "backup-pvc"),
            ("XTRADB_BACKUP_VOLUME_POLL_ATTEMPTS", "3"),
        ]))
        .unwrap();

        assert_eq!(config.metrics_port, 9090);
        assert_eq!(config.reconcile.requeue_after, Duration::from_secs(30));
        assert_eq!(config.reconcile.volume_name, "backup-pvc");
        assert_eq!(config.reconcile.volume_poll.max_attempts, 3);
    }

    #[test]
    fn test_invalid_values_are_reported() {
        let err = OperatorConfig::from_lookup(lookup(&[("XTRADB_BACKUP_METRICS_PORT", "http")]))
            .unwrap_err();
        assert!(err.to_string().contains("XTRADB_BACKUP_METRICS_PORT"));

        assert!(OperatorConfig::from_lookup(lookup(&[(
            "XTRADB_BACKUP_VOLUME_POLL_ATTEMPTS",
            "0"
        )]))
        .is_err());
    }
}
