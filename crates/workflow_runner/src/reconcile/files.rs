//! File Synchronizer - legacy removal and template copies

use ghwf_workflow_catalogue::{FileKind, FileSpec};
use thiserror::Error;

use crate::reconcile::{BranchSubstitution, Operation};
use crate::state::ObservedState;

#[derive(Debug, Error)]
pub enum PlanningError {
    #[error("Template file not found: {name} ({path})")]
    MissingSource { name: String, path: String },
}

/// Fails on the first spec whose source does not exist.
pub fn check_sources(specs: &[FileSpec]) -> Result<(), PlanningError> {
    for spec in specs {
        if !spec.source.is_file() {
            return Err(PlanningError::MissingSource {
                name: spec.name.clone(),
                path: spec.source.display().to_string(),
            });
        }
    }
    Ok(())
}

/// `RemoveFile` for every legacy workflow that the new version does not
/// install again, in name order.
pub fn plan_legacy_removals(observed: &ObservedState, specs: &[FileSpec]) -> Vec<Operation> {
    observed
        .legacy_files_present
        .iter()
        .filter(|name| !specs.iter().any(|s| &s.name == *name))
        .map(|name| Operation::RemoveFile {
            name: name.clone(),
            kind: FileKind::Workflow,
        })
        .collect()
}

/// One `CopyFile` per spec, unconditionally. Copies overwrite whatever is
/// installed; there is no content diff.
pub fn plan_copies(specs: &[FileSpec], branch: &str) -> Vec<Operation> {
    specs
        .iter()
        .map(|spec| Operation::CopyFile {
            spec: spec.clone(),
            substitution: spec
                .placeholder
                .as_ref()
                .map(|pattern| BranchSubstitution::new(pattern.clone(), branch)),
        })
        .collect()
}
