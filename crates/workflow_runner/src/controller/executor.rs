//! Operation Executor - applies a plan one operation at a time
//!
//! Each operation is classified into an [`OperationStatus`]. A `Fatal` status
//! stops the run; operations after it are never attempted and nothing that
//! already happened is rolled back.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ghwf_workflow_catalogue::{FileKind, FileSpec, APP_SLUG, SECRET_CONSOLE_URL};

use crate::control_plane::{ControlPlane, InstallationStatus};
use crate::controller::result::{
    ExecutionResult, OperationOutcome, OperationRecord, OperationStatus,
};
use crate::interaction::UserInteraction;
use crate::reconcile::{
    delete_label, upsert_label, BranchSubstitution, DeleteOutcome, Operation, Plan,
    UpsertOutcome,
};
use crate::SetupUI;

/// Pause before re-checking the app installation after the user confirmed it.
pub const DEFAULT_VERIFY_DELAY: Duration = Duration::from_secs(2);

const INSTALL_CONFIRM_PROMPT: &str = "Have you completed the Claude GitHub App installation?";

/// Everything an operation may touch while it runs.
pub struct ExecutionContext<'a, C: ?Sized, I: ?Sized, U: ?Sized> {
    /// Working tree the file operations are relative to
    pub root: PathBuf,
    pub control_plane: &'a C,
    pub interaction: &'a mut I,
    pub ui: &'a mut U,
    pub verify_delay: Duration,
}

impl<'a, C, I, U> ExecutionContext<'a, C, I, U>
where
    C: ControlPlane + ?Sized,
    I: UserInteraction + ?Sized,
    U: SetupUI + ?Sized,
{
    pub fn new(
        root: impl Into<PathBuf>,
        control_plane: &'a C,
        interaction: &'a mut I,
        ui: &'a mut U,
    ) -> Self {
        Self {
            root: root.into(),
            control_plane,
            interaction,
            ui,
            verify_delay: DEFAULT_VERIFY_DELAY,
        }
    }

    pub fn with_verify_delay(mut self, delay: Duration) -> Self {
        self.verify_delay = delay;
        self
    }
}

/// Runs `plan` strictly in order and returns the accumulated result.
pub async fn execute<C, I, U>(plan: &Plan, ctx: &mut ExecutionContext<'_, C, I, U>) -> ExecutionResult
where
    C: ControlPlane + ?Sized,
    I: UserInteraction + ?Sized,
    U: SetupUI + ?Sized,
{
    let total = plan.len();
    let mut result = ExecutionResult::new(total);
    result.start();

    for (index, operation) in plan.iter().enumerate() {
        let step = index + 1;
        ctx.ui.on_step_start(step, total, operation);
        tracing::debug!(step, total, operation = %operation, "executing");

        let outcome = execute_operation(operation, ctx).await;
        tracing::debug!(step, status = %outcome.status, message = ?outcome.message, "executed");

        let record = OperationRecord {
            step,
            operation: operation.clone(),
            status: outcome.status,
            message: outcome.message.clone(),
        };
        ctx.ui.on_step_finished(&record);
        result.record(record);

        if outcome.status == OperationStatus::Fatal {
            let reason = outcome
                .message
                .unwrap_or_else(|| format!("{} failed", operation));
            tracing::warn!(step, reason = %reason, "run aborted");
            result.abort(step, reason, outcome.hint);
            break;
        }
    }

    result.finish();
    ctx.ui.on_finished(&result);
    result
}

/// Executes a single operation and classifies what happened.
pub async fn execute_operation<C, I, U>(
    operation: &Operation,
    ctx: &mut ExecutionContext<'_, C, I, U>,
) -> OperationOutcome
where
    C: ControlPlane + ?Sized,
    I: UserInteraction + ?Sized,
    U: SetupUI + ?Sized,
{
    match operation {
        Operation::EnsureAppInstalled => ensure_app_installed(ctx).await,

        Operation::CopyFile { spec, substitution } => {
            copy_file(&ctx.root, spec, substitution.as_ref()).await
        }

        Operation::RemoveFile { name, kind } => remove_file(&ctx.root, name, *kind).await,

        Operation::UpsertLabel(label) => match upsert_label(ctx.control_plane, label).await {
            UpsertOutcome::Created => OperationOutcome::new(OperationStatus::Applied),
            UpsertOutcome::Updated => OperationOutcome::new(OperationStatus::Updated),
            UpsertOutcome::Conflict(msg) | UpsertOutcome::Error(msg) => {
                OperationOutcome::with_message(OperationStatus::Failed, msg)
            }
        },

        Operation::DeleteLabel(label) => match delete_label(ctx.control_plane, label).await {
            DeleteOutcome::Removed => OperationOutcome::new(OperationStatus::Applied),
            DeleteOutcome::NotFound => {
                OperationOutcome::with_message(OperationStatus::Skipped, "not found")
            }
            DeleteOutcome::Failed(msg) => {
                OperationOutcome::with_message(OperationStatus::Failed, msg)
            }
        },

        Operation::AddCollaborator { handle } => {
            match ctx.control_plane.add_collaborator(handle).await {
                Ok(()) => OperationOutcome::new(OperationStatus::Applied),
                Err(e) => OperationOutcome::with_message(
                    OperationStatus::Warned,
                    format!("could not add {} (may already be a collaborator): {}", handle, e),
                ),
            }
        }

        Operation::PromptSecret { name } => {
            ctx.ui.on_notice(&format!("Set the {} secret for this repository:", name));
            ctx.ui.on_notice(&format!("  gh secret set {}", name));
            ctx.ui.on_notice(&format!("Get an API key at {}", SECRET_CONSOLE_URL));
            ctx.interaction
                .acknowledge(&format!("Press Enter once {} is set", name));
            OperationOutcome::new(OperationStatus::Applied)
        }

        Operation::CreateSampleIssue { title, body } => {
            match ctx.control_plane.create_issue(title, body).await {
                Ok(url) => OperationOutcome::with_message(OperationStatus::Applied, url),
                Err(e) => OperationOutcome::fatal(
                    format!("Failed to create sample issue: {}", e),
                    "Create the issue manually with: gh issue create",
                ),
            }
        }
    }
}

// ============================================================================
// Operation Implementations
// ============================================================================

async fn ensure_app_installed<C, I, U>(ctx: &mut ExecutionContext<'_, C, I, U>) -> OperationOutcome
where
    C: ControlPlane + ?Sized,
    I: UserInteraction + ?Sized,
    U: SetupUI + ?Sized,
{
    let repo = match ctx.control_plane.repo_info().await {
        Ok(repo) => repo,
        Err(e) => {
            return OperationOutcome::with_message(
                OperationStatus::Warned,
                format!("could not check app installation: {}", e),
            )
        }
    };

    match ctx.control_plane.installation_status(&repo, APP_SLUG).await {
        InstallationStatus::Installed => {
            return OperationOutcome::with_message(OperationStatus::Skipped, "already installed")
        }
        InstallationStatus::Inconclusive => {
            return OperationOutcome::with_message(
                OperationStatus::Warned,
                "could not determine app installation status",
            )
        }
        InstallationStatus::Absent => {}
    }

    let url = repo.app_install_url(APP_SLUG);
    ctx.ui.on_notice("The Claude GitHub App is not installed on this repository.");
    ctx.ui.on_notice(&format!("Install it here: {}", url));
    if !ctx.interaction.open_url(&url) {
        ctx.ui.on_notice("Could not open a browser; open the URL above manually.");
    }

    if !ctx.interaction.confirm(INSTALL_CONFIRM_PROMPT, false) {
        return OperationOutcome::fatal(
            "GitHub App installation was not confirmed",
            format!("Install the app and run init again: {}", url),
        );
    }

    if !ctx.verify_delay.is_zero() {
        tokio::time::sleep(ctx.verify_delay).await;
    }

    match ctx.control_plane.installation_status(&repo, APP_SLUG).await {
        InstallationStatus::Installed => OperationOutcome::new(OperationStatus::Applied),
        _ => OperationOutcome::with_message(
            OperationStatus::Warned,
            "installation could not be verified yet",
        ),
    }
}

async fn copy_file(
    root: &Path,
    spec: &FileSpec,
    substitution: Option<&BranchSubstitution>,
) -> OperationOutcome {
    let content = match tokio::fs::read_to_string(&spec.source).await {
        Ok(content) => content,
        Err(e) => {
            return OperationOutcome::fatal(
                format!("Failed to read template {}: {}", spec.source.display(), e),
                "Check the templates directory (--templates or GHWF_TEMPLATES_DIR)",
            )
        }
    };

    let content = match substitution {
        Some(sub) => sub.apply(&content),
        None => content,
    };

    let target = spec.target(root);
    let existed = target.is_file();

    if let Some(parent) = target.parent() {
        if let Err(e) = tokio::fs::create_dir_all(parent).await {
            return OperationOutcome::fatal(
                format!("Failed to create {}: {}", parent.display(), e),
                "Check write permissions in the working tree",
            );
        }
    }

    if let Err(e) = tokio::fs::write(&target, content).await {
        return OperationOutcome::fatal(
            format!("Failed to write {}: {}", target.display(), e),
            "Check write permissions in the working tree",
        );
    }

    if existed {
        OperationOutcome::new(OperationStatus::Updated)
    } else {
        OperationOutcome::new(OperationStatus::Applied)
    }
}

async fn remove_file(root: &Path, name: &str, kind: FileKind) -> OperationOutcome {
    let target = root.join(kind.target_dir()).join(name);

    match tokio::fs::remove_file(&target).await {
        Ok(()) => OperationOutcome::new(OperationStatus::Applied),
        Err(e) => OperationOutcome::fatal(
            format!("Failed to remove {}: {}", target.display(), e),
            "Remove the file manually and run init again",
        ),
    }
}
