use serde::{Deserialize, Serialize};

/// Scalar resources requested by a workload or granted by an offer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceSet {
    /// CPU in thousandths of a core.
    pub cpus_milli: u32,
    pub memory_mb: u64,
    pub disk_mb: u64,
}

impl ResourceSet {
    pub const fn new(cpus_milli: u32, memory_mb: u64, disk_mb: u64) -> Self {
        Self {
            cpus_milli,
            memory_mb,
            disk_mb,
        }
    }

    /// Returns true if every dimension of `self` fits inside `available`.
    pub fn fits_within(&self, available: &ResourceSet) -> bool {
        self.cpus_milli <= available.cpus_milli
            && self.memory_mb <= available.memory_mb
            && self.disk_mb <= available.disk_mb
    }

    pub fn saturating_sub(&self, other: &ResourceSet) -> ResourceSet {
        ResourceSet {
            cpus_milli: self.cpus_milli.saturating_sub(other.cpus_milli),
            memory_mb: self.memory_mb.saturating_sub(other.memory_mb),
            disk_mb: self.disk_mb.saturating_sub(other.disk_mb),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cpus_milli == 0 && self.memory_mb == 0 && self.disk_mb == 0
    }
}

impl std::fmt::Display for ResourceSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "cpus={}m mem={}MB disk={}MB",
            self.cpus_milli, self.memory_mb, self.disk_mb
        )
    }
}
