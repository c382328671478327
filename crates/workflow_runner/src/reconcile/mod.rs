//! Reconcile Module - turns observed and desired state into a plan
//!
//! [`plan`] does not change anything. Its only side effect is checking that
//! every template it is about to copy exists.

mod files;
mod labels;
mod operations;

pub use files::{check_sources, plan_copies, plan_legacy_removals, PlanningError};
pub use labels::{
    delete_label, plan_label_cleanup, plan_label_setup, upsert_label, DeleteOutcome,
    UpsertOutcome,
};
pub use operations::{BranchSubstitution, Operation, OperationCategory, Plan};

use ghwf_workflow_catalogue::{COLLABORATOR_HANDLE, SAMPLE_ISSUE_BODY, SAMPLE_ISSUE_TITLE, SECRET_NAME};

use crate::state::{DesiredState, ObservedState};

/// Computes the ordered plan that converges `observed` to `desired`.
///
/// Blocks are emitted in a fixed order, each gated by its toggle:
///
/// 1. `EnsureAppInstalled`
/// 2. workflow files (legacy removals, then copies)
/// 3. agent files
/// 4. labels
/// 5. `AddCollaborator`
/// 6. `PromptSecret`
/// 7. `CreateSampleIssue`
///
/// A missing template fails the whole call; no partial plan is returned.
pub fn plan(observed: &ObservedState, desired: &DesiredState) -> Result<Plan, PlanningError> {
    let toggles = &desired.toggles;
    let branch = desired.target_branch(observed);
    let mut plan = Plan::new();

    if toggles.copy_files {
        check_sources(&desired.file_specs)?;
    }
    if toggles.copy_agents {
        check_sources(&desired.agent_specs)?;
    }

    if toggles.install_app {
        plan.push(Operation::EnsureAppInstalled);
    }

    if toggles.copy_files {
        plan.extend(plan_legacy_removals(observed, &desired.file_specs));
        plan.extend(plan_copies(&desired.file_specs, branch));
    }

    if toggles.copy_agents {
        plan.extend(plan_copies(&desired.agent_specs, branch));
    }

    if toggles.setup_labels {
        plan.extend(plan_label_setup(&desired.label_catalogue));
    }

    if toggles.add_collaborator {
        plan.push(Operation::AddCollaborator {
            handle: COLLABORATOR_HANDLE.to_string(),
        });
    }

    if toggles.configure_secret {
        plan.push(Operation::PromptSecret {
            name: SECRET_NAME.to_string(),
        });
    }

    if toggles.create_sample_issue {
        plan.push(Operation::CreateSampleIssue {
            title: SAMPLE_ISSUE_TITLE.to_string(),
            body: SAMPLE_ISSUE_BODY.to_string(),
        });
    }

    tracing::debug!(operations = plan.len(), "computed plan");
    Ok(plan)
}
