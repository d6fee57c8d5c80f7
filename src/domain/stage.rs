use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the independently tracked steps of the finalization pipeline.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Payment,
    Receipt,
    Pid,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Payment, Stage::Receipt, Stage::Pid];
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Payment => f.write_str("payment"),
            Stage::Receipt => f.write_str("receipt"),
            Stage::Pid => f.write_str("pid"),
        }
    }
}

/// Progress of a single stage.
///
/// The variant order is the merge order: a status only ever moves to a
/// greater variant. `Skipped` and `Error` sit above `Success` so that an
/// explicit failure report is never overwritten by progress inferred from
/// another stage, which keeps [`StepStatus::merge`] commutative.
#[derive(
    Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    #[default]
    Pending,
    Loading,
    Success,
    Skipped,
    Error,
}

impl StepStatus {
    /// Least upper bound of two observations.
    pub fn merge(self, other: StepStatus) -> StepStatus {
        self.max(other)
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StepStatus::Pending => "pending",
            StepStatus::Loading => "loading",
            StepStatus::Success => "success",
            StepStatus::Skipped => "skipped",
            StepStatus::Error => "error",
        };
        f.write_str(label)
    }
}

/// Per-stage status triple.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
pub struct Steps {
    pub payment: StepStatus,
    pub receipt: StepStatus,
    pub pid: StepStatus,
}

impl Steps {
    pub fn new(payment: StepStatus, receipt: StepStatus, pid: StepStatus) -> Self {
        Self {
            payment,
            receipt,
            pid,
        }
    }

    pub fn get(&self, stage: Stage) -> StepStatus {
        match stage {
            Stage::Payment => self.payment,
            Stage::Receipt => self.receipt,
            Stage::Pid => self.pid,
        }
    }

    /// Raises `stage` to at least `status`.
    pub fn raise(&mut self, stage: Stage, status: StepStatus) {
        let slot = match stage {
            Stage::Payment => &mut self.payment,
            Stage::Receipt => &mut self.receipt,
            Stage::Pid => &mut self.pid,
        };
        *slot = slot.merge(status);
    }

    pub fn any_error(&self) -> bool {
        Stage::ALL
            .iter()
            .any(|stage| self.get(*stage) == StepStatus::Error)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Stage, StepStatus)> + '_ {
        Stage::ALL.into_iter().map(move |stage| (stage, self.get(stage)))
    }
}
