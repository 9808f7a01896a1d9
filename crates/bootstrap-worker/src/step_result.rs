// Step outcomes and the per-run report.

use std::fmt;
use std::time::Duration;

use crate::constants::return_code;
use crate::errors::{ProvisionError, StepFailure};

/// Outcome of one step.
#[derive(Debug)]
pub enum StepResult {
    /// The precondition already held; nothing ran.
    Skipped,
    /// The action ran and succeeded.
    Executed,
    /// A best-effort action failed; the run went on.
    Tolerated { message: String },
    /// The action failed. Always the last result of a run.
    Failed { error: ProvisionError },
}

impl StepResult {
    pub fn is_failed(&self) -> bool {
        matches!(self, StepResult::Failed { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            StepResult::Skipped => "Skipped",
            StepResult::Executed => "Executed",
            StepResult::Tolerated { .. } => "Tolerated",
            StepResult::Failed { .. } => "Failed",
        }
    }
}

impl fmt::Display for StepResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepResult::Tolerated { message } => write!(f, "Tolerated ({message})"),
            StepResult::Failed { error } => write!(f, "Failed ({error})"),
            other => f.write_str(other.label()),
        }
    }
}

#[derive(Debug)]
pub struct StepRecord {
    pub name: String,
    pub result: StepResult,
    pub elapsed: Duration,
}

/// Ordered results of one run.
#[derive(Debug, Default)]
pub struct RunReport {
    records: Vec<StepRecord>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record. Nothing may follow a failure.
    pub(crate) fn push(&mut self, record: StepRecord) {
        debug_assert!(
            !self.records.last().is_some_and(|r| r.result.is_failed()),
            "record pushed after a failed step"
        );
        self.records.push(record);
    }

    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    pub fn succeeded(&self) -> bool {
        !self.records.iter().any(|r| r.result.is_failed())
    }

    pub fn exit_code(&self) -> i32 {
        if self.succeeded() {
            return_code::SUCCESS
        } else {
            return_code::FAILURE
        }
    }

    /// The failed step, if the run stopped on one.
    pub fn failure(&self) -> Option<(&str, &ProvisionError)> {
        self.records.last().and_then(|r| match &r.result {
            StepResult::Failed { error } => Some((r.name.as_str(), error)),
            _ => None,
        })
    }

    /// Consume the report into the run's overall outcome.
    pub fn into_result(mut self) -> Result<Vec<StepRecord>, StepFailure> {
        match self.records.pop() {
            Some(StepRecord {
                name,
                result: StepResult::Failed { error },
                ..
            }) => Err(StepFailure { step: name, error }),
            Some(last) => {
                self.records.push(last);
                Ok(self.records)
            }
            None => Ok(self.records),
        }
    }

    /// Names of the steps with the given result label, in order.
    pub fn names_with(&self, label: &str) -> Vec<&str> {
        self.records
            .iter()
            .filter(|r| r.result.label() == label)
            .map(|r| r.name.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, result: StepResult) -> StepRecord {
        StepRecord {
            name: name.into(),
            result,
            elapsed: Duration::ZERO,
        }
    }

    #[test]
    fn empty_report_succeeds() {
        let report = RunReport::new();
        assert!(report.succeeded());
        assert_eq!(report.exit_code(), 0);
        assert!(report.failure().is_none());
    }

    #[test]
    fn tolerated_does_not_fail_the_run() {
        let mut report = RunReport::new();
        report.push(record("install-boost", StepResult::Skipped));
        report.push(record(
            "link-toolchain-executables",
            StepResult::Tolerated {
                message: "permission denied".into(),
            },
        ));
        assert!(report.succeeded());
        assert_eq!(report.names_with("Tolerated"), vec!["link-toolchain-executables"]);
    }

    #[test]
    fn failure_sets_exit_code_and_names_step() {
        let mut report = RunReport::new();
        report.push(record("install-boost", StepResult::Executed));
        report.push(record(
            "clone-framework",
            StepResult::Failed {
                error: ProvisionError::Cancelled,
            },
        ));

        assert_eq!(report.exit_code(), 1);
        assert_eq!(report.failure().map(|(name, _)| name), Some("clone-framework"));

        let failure = report.into_result().unwrap_err();
        assert_eq!(failure.step, "clone-framework");
    }

    #[test]
    fn display_includes_error() {
        let result = StepResult::Failed {
            error: ProvisionError::Cancelled,
        };
        assert_eq!(result.to_string(), "Failed (cancelled)");
    }
}
