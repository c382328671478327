//! Desired State - the configuration a run converges to
//!
//! Computed from the setup mode, the user's toggles and the templates of the
//! latest catalogue version.

use ghwf_workflow_catalogue::{
    CatalogueError, CatalogueVersion, FileSpec, LabelCatalogue, TemplateSet,
};

use crate::state::ObservedState;

/// How a run treats the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupMode {
    /// Nothing is installed yet
    Fresh,
    /// Some version is installed; only files are refreshed
    Update,
}

impl SetupMode {
    pub fn for_observed(observed: &ObservedState) -> Self {
        if observed.is_installed() {
            Self::Update
        } else {
            Self::Fresh
        }
    }
}

/// Which blocks of the plan are enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Toggles {
    pub install_app: bool,
    pub copy_files: bool,
    pub copy_agents: bool,
    pub setup_labels: bool,
    pub add_collaborator: bool,
    pub configure_secret: bool,
    pub create_sample_issue: bool,
}

impl Toggles {
    /// Fresh-mode defaults: everything except the sample issue.
    pub fn fresh_defaults() -> Self {
        Self {
            install_app: true,
            copy_files: true,
            copy_agents: true,
            setup_labels: true,
            add_collaborator: true,
            configure_secret: true,
            create_sample_issue: false,
        }
    }

    /// Update mode: files and agents only.
    pub fn update_only() -> Self {
        Self {
            install_app: false,
            copy_files: true,
            copy_agents: true,
            setup_labels: false,
            add_collaborator: false,
            configure_secret: false,
            create_sample_issue: false,
        }
    }
}

impl Default for Toggles {
    fn default() -> Self {
        Self::fresh_defaults()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredState {
    pub version: CatalogueVersion,
    /// Workflow files, in install order
    pub file_specs: Vec<FileSpec>,
    /// Agent definitions, in install order
    pub agent_specs: Vec<FileSpec>,
    pub label_catalogue: LabelCatalogue,
    pub toggles: Toggles,
    /// Takes precedence over the observed branch for placeholder substitution
    pub branch_override: Option<String>,
}

impl DesiredState {
    /// Branch written into files that carry a placeholder.
    pub fn target_branch<'a>(&'a self, observed: &'a ObservedState) -> &'a str {
        self.branch_override
            .as_deref()
            .unwrap_or(&observed.current_branch)
    }
}

/// Computes the desired state for one run.
///
/// * Fresh mode uses `user_toggles` (or [`Toggles::fresh_defaults`]) and
///   turns `configure_secret` off when `secret_probe` reports an existing
///   secret.
/// * Update mode ignores `user_toggles` and never calls `secret_probe`;
///   it only refreshes files and agents.
///
/// The version is always [`CatalogueVersion::LATEST`].
pub fn compute_desired(
    mode: SetupMode,
    templates: &TemplateSet,
    user_toggles: Option<Toggles>,
    secret_probe: impl FnOnce() -> bool,
    branch_override: Option<String>,
) -> Result<DesiredState, CatalogueError> {
    let version = CatalogueVersion::LATEST;

    let toggles = match mode {
        SetupMode::Fresh => {
            let mut toggles = user_toggles.unwrap_or_else(Toggles::fresh_defaults);
            if toggles.configure_secret && secret_probe() {
                toggles.configure_secret = false;
            }
            toggles
        }
        SetupMode::Update => Toggles::update_only(),
    };

    Ok(DesiredState {
        version,
        file_specs: templates.workflow_specs(version),
        agent_specs: templates.agent_specs()?,
        label_catalogue: LabelCatalogue::for_version(version),
        toggles,
        branch_override,
    })
}
