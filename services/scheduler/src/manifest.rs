//! Service manifest parsing.
//!
//! A manifest names a service and lists its plans in priority order. Each
//! phase describes `count` instances of one pod type; every instance becomes
//! a step with a matching workload requirement.
//!
//! ```toml
//! name = "hello-world"
//!
//! [[plans]]
//! name = "deploy"
//! strategy = "serial"
//!
//! [[plans.phases]]
//! name = "hello"
//! strategy = "parallel"
//! pod = "hello"
//! count = 2
//! cpus_milli = 500
//! memory_mb = 256
//! tasks = ["server"]
//! ```

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use offerloop_plan::{Phase, Plan, RecoveryType, ResourceSet, Step, Strategy, WorkloadRequirement};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    pub name: String,
    #[serde(default)]
    pub plans: Vec<PlanSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanSpec {
    pub name: String,
    #[serde(default)]
    pub strategy: Strategy,
    #[serde(default)]
    pub phases: Vec<PhaseSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PhaseSpec {
    pub name: String,
    #[serde(default)]
    pub strategy: Strategy,
    pub pod: String,
    pub count: u32,
    #[serde(default)]
    pub cpus_milli: u32,
    #[serde(default)]
    pub memory_mb: u64,
    #[serde(default)]
    pub disk_mb: u64,
    #[serde(default = "default_tasks")]
    pub tasks: Vec<String>,
    #[serde(default)]
    pub recovery: RecoveryType,
}

fn default_tasks() -> Vec<String> {
    vec!["server".to_string()]
}

impl Manifest {
    /// Parses and validates a manifest.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let manifest: Manifest = toml::from_str(contents).context("invalid manifest TOML")?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest: {}", path.display()))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("failed to load manifest: {}", path.display()))
    }

    fn validate(&self) -> Result<()> {
        if self.plans.is_empty() {
            anyhow::bail!("manifest {:?} declares no plans", self.name);
        }

        let mut seen = BTreeSet::new();
        for plan in &self.plans {
            if !seen.insert(plan.name.as_str()) {
                anyhow::bail!("duplicate plan name: {:?}", plan.name);
            }
            for phase in &plan.phases {
                if phase.count == 0 {
                    anyhow::bail!(
                        "phase {:?} of plan {:?} has count 0",
                        phase.name,
                        plan.name
                    );
                }
            }
        }
        Ok(())
    }

    /// Builds one plan per entry, in manifest order.
    pub fn into_plans(self) -> Vec<Plan> {
        self.plans.into_iter().map(PlanSpec::into_plan).collect()
    }
}

impl PlanSpec {
    fn into_plan(self) -> Plan {
        let phases = self.phases.into_iter().map(PhaseSpec::into_phase).collect();
        Plan::new(self.name, self.strategy, phases)
    }
}

impl PhaseSpec {
    fn resources(&self) -> ResourceSet {
        ResourceSet::new(self.cpus_milli, self.memory_mb, self.disk_mb)
    }

    fn into_phase(self) -> Phase {
        let steps = (0..self.count)
            .map(|index| {
                let requirement = WorkloadRequirement::new(self.pod.as_str(), index)
                    .with_tasks(self.tasks.iter().cloned())
                    .with_resources(self.resources())
                    .with_recovery(self.recovery);
                Step::new(requirement.to_string(), Some(requirement))
            })
            .collect();
        Phase::new(self.name, self.strategy, steps)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    const HELLO_WORLD: &str = r#"
name = "hello-world"

[[plans]]
name = "deploy"

[[plans.phases]]
name = "hello"
strategy = "parallel"
pod = "hello"
count = 2
cpus_milli = 500
memory_mb = 256
tasks = ["server"]

[[plans.phases]]
name = "world"
pod = "world"
count = 1
tasks = ["server", "sidecar"]

[[plans]]
name = "recovery"
strategy = "parallel"
"#;

    #[test]
    fn test_parse_and_expand() {
        let manifest = Manifest::from_toml_str(HELLO_WORLD).unwrap();
        assert_eq!(manifest.name, "hello-world");

        let plans = manifest.into_plans();
        let names: Vec<&str> = plans.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["deploy", "recovery"]);

        let deploy = &plans[0];
        assert_eq!(deploy.strategy(), Strategy::Serial);
        assert_eq!(deploy.phases()[0].strategy(), Strategy::Parallel);

        let steps: Vec<&str> = deploy.steps().map(|s| s.name()).collect();
        assert_eq!(
            steps,
            vec!["hello-0:[server]", "hello-1:[server]", "world-0:[server, sidecar]"]
        );

        let hello = deploy.steps().next().unwrap().requirement().unwrap();
        assert_eq!(hello.resources, ResourceSet::new(500, 256, 0));
        assert_eq!(hello.recovery, RecoveryType::None);

        assert!(plans[1].is_complete());
    }

    #[rstest]
    #[case::no_plans(r#"name = "empty""#, "declares no plans")]
    #[case::duplicate(
        "name = \"svc\"\n[[plans]]\nname = \"deploy\"\n[[plans]]\nname = \"deploy\"\n",
        "duplicate plan name"
    )]
    #[case::zero_count(
        "name = \"svc\"\n[[plans]]\nname = \"deploy\"\n[[plans.phases]]\nname = \"p\"\npod = \"hello\"\ncount = 0\n",
        "count 0"
    )]
    #[case::unknown_field("name = \"svc\"\nreplicas = 3\n", "invalid manifest TOML")]
    fn test_invalid_manifest(#[case] contents: &str, #[case] expected: &str) {
        let err = Manifest::from_toml_str(contents).unwrap_err();
        assert!(
            format!("{err:#}").contains(expected),
            "unexpected error: {err:#}"
        );
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("service.toml");
        std::fs::write(&path, HELLO_WORLD).unwrap();

        let manifest = Manifest::load(&path).unwrap();
        assert_eq!(manifest.plans.len(), 2);
    }

    #[test]
    fn test_load_missing_file_names_path() {
        let err = Manifest::load(Path::new("/nonexistent/service.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/service.toml"));
    }
}
