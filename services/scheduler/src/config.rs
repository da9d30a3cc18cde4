//! Configuration for the scheduler service.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use offerloop_plan::ResourceSet;

/// Scheduler service configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Path to the service manifest.
    pub manifest_path: PathBuf,

    /// Time between coordinator passes.
    pub pass_interval: Duration,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Stop once no plan has work left.
    pub exit_when_idle: bool,

    pub cluster: ClusterConfig,
}

/// Shape of the simulated local cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterConfig {
    /// Number of agents.
    pub agents: usize,

    /// Capacity of each agent.
    pub agent_resources: ResourceSet,

    /// Batches an accepted offer stays reserved before its capacity is
    /// offered again.
    pub lease_passes: u32,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            agents: 3,
            agent_resources: ResourceSet::new(4000, 8192, 20480),
            lease_passes: 5,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to its
    /// value if set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let manifest_path = lookup("OFFERLOOP_MANIFEST")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("service.toml"));

        let pass_interval_ms: u64 = parse_var(&lookup, "OFFERLOOP_PASS_INTERVAL_MS", 1000)?;
        if pass_interval_ms == 0 {
            anyhow::bail!("invalid OFFERLOOP_PASS_INTERVAL_MS: must be greater than 0");
        }
        let pass_interval = Duration::from_millis(pass_interval_ms);

        let log_level = lookup("OFFERLOOP_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        let exit_when_idle = lookup("OFFERLOOP_EXIT_WHEN_IDLE")
            .map(|v| v == "1" || v.to_lowercase() == "true")
            .unwrap_or(false);

        let defaults = ClusterConfig::default();
        let cluster = ClusterConfig {
            agents: parse_var(&lookup, "OFFERLOOP_AGENTS", defaults.agents)?,
            agent_resources: ResourceSet::new(
                parse_var(
                    &lookup,
                    "OFFERLOOP_AGENT_CPUS_MILLI",
                    defaults.agent_resources.cpus_milli,
                )?,
                parse_var(
                    &lookup,
                    "OFFERLOOP_AGENT_MEMORY_MB",
                    defaults.agent_resources.memory_mb,
                )?,
                parse_var(&lookup, "OFFERLOOP_AGENT_DISK_MB", defaults.agent_resources.disk_mb)?,
            ),
            lease_passes: parse_var(&lookup, "OFFERLOOP_LEASE_PASSES", defaults.lease_passes)?,
        };

        Ok(Self {
            manifest_path,
            pass_interval,
            log_level,
            exit_when_idle,
            cluster,
        })
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .with_context(|| format!("invalid {key}: {value:?}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.manifest_path, PathBuf::from("service.toml"));
        assert_eq!(config.pass_interval, Duration::from_secs(1));
        assert_eq!(config.log_level, "info");
        assert!(!config.exit_when_idle);
        assert_eq!(config.cluster, ClusterConfig::default());
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("OFFERLOOP_MANIFEST", "/etc/offerloop/hello.toml"),
            ("OFFERLOOP_PASS_INTERVAL_MS", "250"),
            ("OFFERLOOP_EXIT_WHEN_IDLE", "TRUE"),
            ("OFFERLOOP_AGENTS", "5"),
            ("OFFERLOOP_AGENT_CPUS_MILLI", "2000"),
            ("OFFERLOOP_LEASE_PASSES", "1"),
        ])
        .unwrap();

        assert_eq!(config.manifest_path, PathBuf::from("/etc/offerloop/hello.toml"));
        assert_eq!(config.pass_interval, Duration::from_millis(250));
        assert!(config.exit_when_idle);
        assert_eq!(config.cluster.agents, 5);
        assert_eq!(config.cluster.agent_resources.cpus_milli, 2000);
        assert_eq!(config.cluster.agent_resources.memory_mb, 8192);
        assert_eq!(config.cluster.lease_passes, 1);
    }

    #[test]
    fn test_invalid_number_names_the_variable() {
        let err = config(&[("OFFERLOOP_AGENTS", "three")]).unwrap_err();
        assert!(err.to_string().contains("OFFERLOOP_AGENTS"));
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let err = config(&[("OFFERLOOP_PASS_INTERVAL_MS", "0")]).unwrap_err();
        assert!(err.to_string().contains("OFFERLOOP_PASS_INTERVAL_MS"));
    }
}
