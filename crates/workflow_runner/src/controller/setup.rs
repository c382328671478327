//! SetupController - drives `init` and `labels` runs
//!
//! An `init` run is a single reconcile pass:
//! 1. Pre-flight checks
//! 2. Inspect the repository (ObservedState)
//! 3. Choose the mode and toggles (DesiredState)
//! 4. Plan
//! 5. Preview (dry run) or execute

use std::path::PathBuf;
use std::time::Duration;

use ghwf_workflow_catalogue::{
    CatalogueVersion, LabelCatalogue, LabelSpec, TemplateSet, COLLABORATOR_HANDLE, SECRET_NAME,
};

use crate::control_plane::ControlPlane;
use crate::controller::executor::{execute, ExecutionContext, DEFAULT_VERIFY_DELAY};
use crate::controller::result::ExecutionResult;
use crate::interaction::UserInteraction;
use crate::preflight::run_preflight;
use crate::reconcile::{plan, plan_label_cleanup, plan_label_setup, Plan};
use crate::state::{compute_desired, ObservedState, SetupMode, Toggles};
use crate::vcs::VersionControl;
use crate::{SetupUI, WorkflowError};

/// Options of one `init` run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitOptions {
    /// Accept the default toggles without asking
    pub yes: bool,
    /// Compute and show the plan, change nothing
    pub dry_run: bool,
    /// Base branch written into workflow files instead of the current one
    pub branch: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOutcome {
    DryRun(Plan),
    Executed(ExecutionResult),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelsAction {
    Setup,
    List,
    Clean,
}

/// One catalogue label and whether the repository has it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelListing {
    pub spec: LabelSpec,
    pub present: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelsOutcome {
    Listed(Vec<LabelListing>),
    Executed(ExecutionResult),
}

pub struct SetupController<'a, C: ?Sized, V: ?Sized, I: ?Sized, U: ?Sized> {
    root: PathBuf,
    control_plane: &'a C,
    vcs: &'a V,
    interaction: &'a mut I,
    ui: &'a mut U,
    templates: TemplateSet,
    verify_delay: Duration,
}

impl<'a, C, V, I, U> SetupController<'a, C, V, I, U>
where
    C: ControlPlane + ?Sized,
    V: VersionControl + ?Sized,
    I: UserInteraction + ?Sized,
    U: SetupUI + ?Sized,
{
    pub fn new(
        root: impl Into<PathBuf>,
        control_plane: &'a C,
        vcs: &'a V,
        interaction: &'a mut I,
        ui: &'a mut U,
        templates: TemplateSet,
    ) -> Self {
        Self {
            root: root.into(),
            control_plane,
            vcs,
            interaction,
            ui,
            templates,
            verify_delay: DEFAULT_VERIFY_DELAY,
        }
    }

    pub fn with_verify_delay(mut self, delay: Duration) -> Self {
        self.verify_delay = delay;
        self
    }

    /// Runs `init`.
    ///
    /// Pre-flight and planning errors are returned before anything changes.
    /// Once execution starts, failures are reported in the result.
    pub async fn init(&mut self, options: &InitOptions) -> Result<InitOutcome, WorkflowError> {
        let repo = run_preflight(self.control_plane, true).await?;
        self.ui.on_preflight_passed(&repo);

        let observed = ObservedState::inspect(&self.root, self.control_plane, self.vcs).await;
        let mode = SetupMode::for_observed(&observed);
        self.ui.on_mode(mode, &observed);

        let user_toggles = match mode {
            SetupMode::Fresh if !options.yes => Some(self.ask_toggles(&observed)),
            SetupMode::Fresh => None,
            SetupMode::Update => {
                self.ui.on_notice(
                    "Existing installation found: only workflow and agent files are refreshed.",
                );
                if observed.detected_version == Some(CatalogueVersion::V1) {
                    self.ui.on_notice(
                        "Labels are not migrated. Run `ghwf labels --setup` to create the new \
                         labels and `ghwf labels --clean --legacy` to remove the old ones.",
                    );
                }
                None
            }
        };

        let desired = compute_desired(
            mode,
            &self.templates,
            user_toggles,
            || observed.has_secret,
            options.branch.clone(),
        )?;
        tracing::debug!(?mode, toggles = ?desired.toggles, "desired state computed");

        let plan = plan(&observed, &desired)?;

        if options.dry_run {
            self.ui.on_dry_run(&plan);
            return Ok(InitOutcome::DryRun(plan));
        }

        Ok(InitOutcome::Executed(self.execute(&plan).await))
    }

    /// Runs `labels` against the catalogue of `version`.
    pub async fn labels(
        &mut self,
        action: LabelsAction,
        version: CatalogueVersion,
    ) -> Result<LabelsOutcome, WorkflowError> {
        let catalogue = LabelCatalogue::for_version(version);

        match action {
            LabelsAction::List => {
                run_preflight(self.control_plane, false).await?;
                let existing = self.control_plane.list_labels().await?;
                let listing = catalogue
                    .iter()
                    .map(|spec| LabelListing {
                        present: existing.contains(&spec.name),
                        spec: spec.clone(),
                    })
                    .collect();
                Ok(LabelsOutcome::Listed(listing))
            }
            LabelsAction::Setup | LabelsAction::Clean => {
                let repo = run_preflight(self.control_plane, true).await?;
                self.ui.on_preflight_passed(&repo);

                let plan = Plan::from(match action {
                    LabelsAction::Setup => plan_label_setup(&catalogue),
                    _ => plan_label_cleanup(&catalogue),
                });
                Ok(LabelsOutcome::Executed(self.execute(&plan).await))
            }
        }
    }

    async fn execute(&mut self, plan: &Plan) -> ExecutionResult {
        let mut ctx = ExecutionContext::new(
            self.root.clone(),
            self.control_plane,
            &mut *self.interaction,
            &mut *self.ui,
        )
        .with_verify_delay(self.verify_delay);

        execute(plan, &mut ctx).await
    }

    fn ask_toggles(&mut self, observed: &ObservedState) -> Toggles {
        let defaults = Toggles::fresh_defaults();
        let interaction = &mut *self.interaction;

        let install_app =
            interaction.confirm("Install the Claude GitHub App?", defaults.install_app);
        let copy_files = interaction.confirm("Copy workflow files?", defaults.copy_files);
        let copy_agents = interaction.confirm("Copy agent definitions?", defaults.copy_agents);
        let setup_labels = interaction.confirm("Create workflow labels?", defaults.setup_labels);
        let add_collaborator = interaction.confirm(
            &format!("Add {} as collaborator?", COLLABORATOR_HANDLE),
            defaults.add_collaborator,
        );
        // already configured, nothing to ask
        let configure_secret = !observed.has_secret
            && interaction.confirm(
                &format!("Configure the {} secret?", SECRET_NAME),
                defaults.configure_secret,
            );
        let create_sample_issue =
            interaction.confirm("Create a sample issue?", defaults.create_sample_issue);

        Toggles {
            install_app,
            copy_files,
            copy_agents,
            setup_labels,
            add_collaborator,
            configure_secret,
            create_sample_issue,
        }
    }
}
