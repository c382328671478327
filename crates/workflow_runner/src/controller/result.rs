//! Execution Result - per-operation outcomes and the run's terminal state

use std::fmt;

use crate::reconcile::{Operation, OperationCategory};

/// Outcome class of one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationStatus {
    /// Created something that did not exist
    Applied,
    /// Overwrote something that already existed
    Updated,
    /// Nothing to do (already in the desired state, or expectedly absent)
    Skipped,
    /// Did not succeed, but the run continues
    Warned,
    /// Failed; counted, the run continues
    Failed,
    /// Failed; the run is aborted
    Fatal,
}

impl OperationStatus {
    pub const ALL: [Self; 6] = [
        Self::Applied,
        Self::Updated,
        Self::Skipped,
        Self::Warned,
        Self::Failed,
        Self::Fatal,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Updated => "updated",
            Self::Skipped => "skipped",
            Self::Warned => "warned",
            Self::Failed => "failed",
            Self::Fatal => "fatal",
        }
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What executing one operation produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationOutcome {
    pub status: OperationStatus,
    pub message: Option<String>,
    /// Remediation shown to the user when the outcome aborts the run
    pub hint: Option<String>,
}

impl OperationOutcome {
    pub fn new(status: OperationStatus) -> Self {
        Self {
            status,
            message: None,
            hint: None,
        }
    }

    pub fn with_message(status: OperationStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: Some(message.into()),
            hint: None,
        }
    }

    pub fn fatal(message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            status: OperationStatus::Fatal,
            message: Some(message.into()),
            hint: Some(hint.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRecord {
    /// 1-based position in the plan
    pub step: usize,
    pub operation: Operation,
    pub status: OperationStatus,
    pub message: Option<String>,
}

/// Lifecycle of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Pending,
    Running,
    /// Every operation applied, updated or skipped
    Succeeded,
    /// Completed, but some operations warned or failed
    PartiallyWarned,
    /// A fatal outcome stopped the run; later operations were not attempted
    Aborted {
        step: usize,
        reason: String,
        hint: Option<String>,
    },
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::PartiallyWarned | Self::Aborted { .. }
        )
    }
}

/// Label counts; the counts of one batch sum to the number of label
/// operations in it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LabelTally {
    pub created: usize,
    pub updated: usize,
    pub removed: usize,
    pub not_found: usize,
    pub failed: usize,
}

impl LabelTally {
    pub fn total(&self) -> usize {
        self.created + self.updated + self.removed + self.not_found + self.failed
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub records: Vec<OperationRecord>,
    pub status: RunStatus,
    /// Number of operations in the executed plan
    pub total_steps: usize,
}

impl ExecutionResult {
    pub fn new(total_steps: usize) -> Self {
        Self {
            records: Vec::new(),
            status: RunStatus::Pending,
            total_steps,
        }
    }

    pub(crate) fn start(&mut self) {
        self.status = RunStatus::Running;
    }

    pub(crate) fn record(&mut self, record: OperationRecord) {
        self.records.push(record);
    }

    pub(crate) fn abort(&mut self, step: usize, reason: String, hint: Option<String>) {
        self.status = RunStatus::Aborted { step, reason, hint };
    }

    /// Moves a running result to its terminal state.
    pub(crate) fn finish(&mut self) {
        if self.status != RunStatus::Running {
            return;
        }

        let degraded = self.records.iter().any(|r| {
            matches!(r.status, OperationStatus::Warned | OperationStatus::Failed)
        });
        self.status = if degraded {
            RunStatus::PartiallyWarned
        } else {
            RunStatus::Succeeded
        };
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self.status, RunStatus::Aborted { .. })
    }

    /// True when the run deleted labels rather than setting them up.
    pub fn is_label_cleanup(&self) -> bool {
        self.records
            .iter()
            .any(|r| matches!(r.operation, Operation::DeleteLabel(_)))
    }

    pub fn count_in(&self, category: OperationCategory, status: OperationStatus) -> usize {
        self.records
            .iter()
            .filter(|r| r.status == status && r.operation.category() == category)
            .count()
    }

    /// Operations of `category` that were attempted.
    pub fn attempted(&self, category: OperationCategory) -> usize {
        self.records
            .iter()
            .filter(|r| r.operation.category() == category)
            .count()
    }

    pub fn label_tally(&self) -> LabelTally {
        let mut tally = LabelTally::default();
        for record in &self.records {
            match (&record.operation, record.status) {
                (Operation::UpsertLabel(_), OperationStatus::Applied) => tally.created += 1,
                (Operation::UpsertLabel(_), OperationStatus::Updated) => tally.updated += 1,
                (Operation::DeleteLabel(_), OperationStatus::Applied) => tally.removed += 1,
                (Operation::DeleteLabel(_), OperationStatus::Skipped) => tally.not_found += 1,
                (Operation::UpsertLabel(_) | Operation::DeleteLabel(_), _) => tally.failed += 1,
                _ => {}
            }
        }
        tally
    }
}
