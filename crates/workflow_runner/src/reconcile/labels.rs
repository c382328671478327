//! Label Synchronizer - upsert and delete of the label catalogue
//!
//! Every catalogue entry is handled on its own, in catalogue order. A failing
//! label is reported and the batch continues.

use ghwf_workflow_catalogue::{LabelCatalogue, LabelSpec};

use crate::control_plane::{ControlPlane, ControlPlaneError};
use crate::reconcile::Operation;

/// Result of creating-or-updating one label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
    /// The label exists but could not be updated
    Conflict(String),
    Error(String),
}

/// Result of deleting one label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Removed,
    NotFound,
    Failed(String),
}

/// One `UpsertLabel` per catalogue entry.
pub fn plan_label_setup(catalogue: &LabelCatalogue) -> Vec<Operation> {
    catalogue
        .iter()
        .cloned()
        .map(Operation::UpsertLabel)
        .collect()
}

/// One `DeleteLabel` per catalogue entry.
pub fn plan_label_cleanup(catalogue: &LabelCatalogue) -> Vec<Operation> {
    catalogue
        .iter()
        .cloned()
        .map(Operation::DeleteLabel)
        .collect()
}

/// Attempts a create; on any create failure attempts an update with the
/// same description and color.
pub async fn upsert_label<C: ControlPlane + ?Sized>(
    control_plane: &C,
    label: &LabelSpec,
) -> UpsertOutcome {
    let create_err = match control_plane.create_label(label).await {
        Ok(()) => return UpsertOutcome::Created,
        Err(e) => e,
    };

    match control_plane.update_label(label).await {
        Ok(()) => UpsertOutcome::Updated,
        Err(update_err) => match create_err {
            ControlPlaneError::Conflict(_) => UpsertOutcome::Conflict(update_err.to_string()),
            _ => UpsertOutcome::Error(format!("{}; {}", create_err, update_err)),
        },
    }
}

pub async fn delete_label<C: ControlPlane + ?Sized>(
    control_plane: &C,
    label: &LabelSpec,
) -> DeleteOutcome {
    match control_plane.delete_label(&label.name).await {
        Ok(()) => DeleteOutcome::Removed,
        Err(ControlPlaneError::NotFound(_)) => DeleteOutcome::NotFound,
        Err(e) => DeleteOutcome::Failed(e.to_string()),
    }
}
