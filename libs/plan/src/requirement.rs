//! Workload requirements and their conflict predicate.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::ResourceSet;

/// How a requirement relates to an existing pod instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryType {
    /// Initial deployment or configuration update.
    #[default]
    None,
    /// Relaunch in place after a task failure.
    Transient,
    /// Replace the instance, discarding its prior placement.
    Permanent,
}

/// Describes one logical pod instance a plan wants to place or update.
///
/// Two requirements conflict when they name the same pod instance, no matter
/// which tasks, resources, or recovery mode each carries. The coordinator
/// uses this to keep two plans from working the same instance at once.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WorkloadRequirement {
    pub pod_type: String,
    pub index: u32,
    pub tasks_to_launch: BTreeSet<String>,
    pub resources: ResourceSet,
    #[serde(default)]
    pub recovery: RecoveryType,
}

impl WorkloadRequirement {
    pub fn new(pod_type: impl Into<String>, index: u32) -> Self {
        Self {
            pod_type: pod_type.into(),
            index,
            tasks_to_launch: BTreeSet::new(),
            resources: ResourceSet::default(),
            recovery: RecoveryType::None,
        }
    }

    pub fn with_tasks<I, S>(mut self, tasks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tasks_to_launch = tasks.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_resources(mut self, resources: ResourceSet) -> Self {
        self.resources = resources;
        self
    }

    pub fn with_recovery(mut self, recovery: RecoveryType) -> Self {
        self.recovery = recovery;
        self
    }

    /// `{pod_type}-{index}`, the identity used for conflict detection.
    pub fn pod_instance_name(&self) -> String {
        format!("{}-{}", self.pod_type, self.index)
    }

    /// Symmetric: true iff both requirements target the same pod instance.
    pub fn conflicts_with(&self, other: &WorkloadRequirement) -> bool {
        self.pod_type == other.pod_type && self.index == other.index
    }

    /// Returns true if this requirement conflicts with any of `others`.
    pub fn conflicts_with_any<'a, I>(&self, others: I) -> bool
    where
        I: IntoIterator<Item = &'a WorkloadRequirement>,
    {
        others.into_iter().any(|other| self.conflicts_with(other))
    }
}

impl std::fmt::Display for WorkloadRequirement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:[", self.pod_instance_name())?;
        for (i, task) in self.tasks_to_launch.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(task)?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::same_instance("hello", 0, "hello", 0, true)]
    #[case::other_index("hello", 0, "hello", 1, false)]
    #[case::other_type("hello", 0, "world", 0, false)]
    fn test_conflicts_with(
        #[case] left_type: &str,
        #[case] left_index: u32,
        #[case] right_type: &str,
        #[case] right_index: u32,
        #[case] expected: bool,
    ) {
        let left = WorkloadRequirement::new(left_type, left_index);
        let right = WorkloadRequirement::new(right_type, right_index);
        assert_eq!(left.conflicts_with(&right), expected);
        assert_eq!(right.conflicts_with(&left), expected);
    }

    #[test]
    fn test_conflict_ignores_tasks_and_recovery() {
        let deploy = WorkloadRequirement::new("hello", 0).with_tasks(["server"]);
        let recover = WorkloadRequirement::new("hello", 0)
            .with_tasks(["server", "sidecar"])
            .with_recovery(RecoveryType::Permanent);
        assert_ne!(deploy, recover);
        assert!(deploy.conflicts_with(&recover));
    }

    #[test]
    fn test_display() {
        let req = WorkloadRequirement::new("hello", 2).with_tasks(["b", "a"]);
        assert_eq!(req.to_string(), "hello-2:[a, b]");
    }
}
