//! Observed State - what currently exists in the target repository
//!
//! Captured fresh on every invocation from the working tree and the control
//! plane. Never cached.

use std::collections::BTreeSet;
use std::path::Path;

use ghwf_workflow_catalogue::{
    legacy_workflow_files, CatalogueVersion, AGENTS_DIR, SECRET_NAME, WORKFLOWS_DIR,
};

use crate::control_plane::ControlPlane;
use crate::vcs::VersionControl;

/// Branch assumed when the working tree cannot tell us.
pub const FALLBACK_BRANCH: &str = "main";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedState {
    /// Current-version workflow files present in the workflows directory
    pub installed_files: BTreeSet<String>,
    /// Legacy workflow files present in the workflows directory
    pub legacy_files_present: BTreeSet<String>,
    /// Agent definitions present in the agents directory
    pub installed_agents: BTreeSet<String>,
    /// `None` when nothing is installed
    pub detected_version: Option<CatalogueVersion>,
    /// Label names on the remote
    pub labels: BTreeSet<String>,
    pub has_secret: bool,
    pub current_branch: String,
}

impl Default for ObservedState {
    fn default() -> Self {
        Self {
            installed_files: BTreeSet::new(),
            legacy_files_present: BTreeSet::new(),
            installed_agents: BTreeSet::new(),
            detected_version: None,
            labels: BTreeSet::new(),
            has_secret: false,
            current_branch: FALLBACK_BRANCH.to_string(),
        }
    }
}

impl ObservedState {
    /// Builds a snapshot of `root` and the remote.
    ///
    /// Control-plane read failures are treated as "absent": a failed label
    /// listing yields no labels, a failed secret listing yields no secret.
    /// This cannot tell a transient failure apart from real absence.
    pub async fn inspect<C, V>(root: &Path, control_plane: &C, vcs: &V) -> Self
    where
        C: ControlPlane + ?Sized,
        V: VersionControl + ?Sized,
    {
        let mut state = Self::scan_files(root);

        match control_plane.list_labels().await {
            Ok(labels) => state.labels = labels.into_iter().collect(),
            Err(e) => tracing::warn!(error = %e, "could not list labels, treating as none"),
        }

        match control_plane.secret_names().await {
            Ok(names) => state.has_secret = names.iter().any(|n| n == SECRET_NAME),
            Err(e) => tracing::warn!(error = %e, "could not list secrets, treating as missing"),
        }

        state.current_branch = vcs
            .current_branch(root)
            .await
            .unwrap_or_else(|| FALLBACK_BRANCH.to_string());

        tracing::debug!(
            version = ?state.detected_version,
            files = state.installed_files.len(),
            legacy = state.legacy_files_present.len(),
            labels = state.labels.len(),
            branch = %state.current_branch,
            "inspected repository"
        );

        state
    }

    /// The filesystem half of [`ObservedState::inspect`].
    ///
    /// A missing workflows directory is not an error; it means nothing is
    /// installed.
    pub fn scan_files(root: &Path) -> Self {
        let workflow_names = list_file_names(&root.join(WORKFLOWS_DIR));
        let current = CatalogueVersion::LATEST.workflow_files();
        let legacy = legacy_workflow_files();

        let installed_files: BTreeSet<String> = workflow_names
            .iter()
            .filter(|n| current.contains(&n.as_str()))
            .cloned()
            .collect();
        let legacy_files_present: BTreeSet<String> = workflow_names
            .iter()
            .filter(|n| legacy.contains(&n.as_str()))
            .cloned()
            .collect();
        let installed_agents = list_file_names(&root.join(AGENTS_DIR))
            .into_iter()
            .filter(|n| n.ends_with(".md"))
            .collect();

        let detected_version = if !legacy_files_present.is_empty() {
            Some(CatalogueVersion::V1)
        } else if !installed_files.is_empty() {
            Some(CatalogueVersion::V2)
        } else {
            None
        };

        Self {
            installed_files,
            legacy_files_present,
            installed_agents,
            detected_version,
            ..Self::default()
        }
    }

    /// True when any version of the workflow is installed.
    pub fn is_installed(&self) -> bool {
        self.detected_version.is_some()
    }
}

/// Like [`read_file_names`], but a read error is logged and yields nothing.
fn list_file_names(dir: &Path) -> BTreeSet<String> {
    read_file_names(dir).unwrap_or_else(|e| {
        tracing::warn!(dir = %dir.display(), error = %e, "could not read directory, treating as empty");
        BTreeSet::new()
    })
}

/// File names directly inside `dir`. Only a missing directory counts as empty.
fn read_file_names(dir: &Path) -> std::io::Result<BTreeSet<String>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeSet::new()),
        Err(e) => return Err(e),
    };

    Ok(entries
        .filter_map(Result::ok)
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|e| e.file_name().to_str().map(str::to_string))
        .collect())
}
