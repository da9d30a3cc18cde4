//! Execution status shared by steps, phases, and plans.

use serde::{Deserialize, Serialize};

/// Status of a plan element.
///
/// Steps move through these directly. Phases and plans derive theirs from
/// their children with [`Status::aggregate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// The element failed and needs to be restarted.
    Error,

    /// The element is paused.
    Waiting,

    /// The element has work to do and is waiting for offers.
    Pending,

    /// Offers have been evaluated for the element.
    Prepared,

    /// Tasks were launched and have not reported running yet.
    Starting,

    /// Tasks are running but the element is not done.
    Started,

    /// Some children are done and others are not.
    InProgress,

    /// Nothing left to do.
    Complete,
}

impl Status {
    /// Returns true if work for this element is underway.
    pub fn is_running(&self) -> bool {
        matches!(
            self,
            Self::Prepared | Self::Starting | Self::Started | Self::InProgress
        )
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Derives a parent's status from its children's statuses.
    ///
    /// An empty parent is complete.
    pub fn aggregate<I>(children: I) -> Status
    where
        I: IntoIterator<Item = Status>,
    {
        let mut total = 0usize;
        let mut complete = 0usize;
        let mut running = false;
        let mut waiting = false;
        let mut error = false;

        for status in children {
            total += 1;
            match status {
                Status::Complete => complete += 1,
                Status::Error => error = true,
                Status::Waiting => waiting = true,
                s if s.is_running() => running = true,
                _ => {}
            }
        }

        if total == complete {
            Status::Complete
        } else if error {
            Status::Error
        } else if running || complete > 0 {
            Status::InProgress
        } else if waiting {
            Status::Waiting
        } else {
            Status::Pending
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Status::Error => "ERROR",
            Status::Waiting => "WAITING",
            Status::Pending => "PENDING",
            Status::Prepared => "PREPARED",
            Status::Starting => "STARTING",
            Status::Started => "STARTED",
            Status::InProgress => "IN_PROGRESS",
            Status::Complete => "COMPLETE",
        };
        f.write_str(s)
    }
}
