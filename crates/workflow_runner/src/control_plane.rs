//! Control Plane - narrow interface to the remote repository
//!
//! Everything the engine reads from or changes on GitHub goes through
//! [`ControlPlane`]. The real implementation shells out to the `gh` CLI
//! (see [`crate::gh`]); tests use the in-memory mock from `test_utils`.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use ghwf_workflow_catalogue::LabelSpec;

use crate::preflight::PreflightError;

#[derive(Debug, Error)]
pub enum ControlPlaneError {
    #[error("Failed to execute gh: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse gh output: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    Conflict(String),

    #[error("gh command failed: {0}")]
    CommandFailed(String),
}

/// Repository metadata as returned by `GET /repos/{owner}/{repo}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepoInfo {
    pub full_name: String,
    pub id: u64,
    pub owner: RepoOwner,
    #[serde(default)]
    pub permissions: Option<RepoPermissions>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepoOwner {
    pub id: u64,
    #[serde(default)]
    pub login: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct RepoPermissions {
    #[serde(default)]
    pub admin: bool,
    #[serde(default)]
    pub maintain: bool,
    #[serde(default)]
    pub push: bool,
}

impl RepoInfo {
    /// URL that installs the GitHub App on this repository.
    pub fn app_install_url(&self, app_slug: &str) -> String {
        format!(
            "https://github.com/apps/{}/installations/new/permissions?target_id={}&repository_ids[]={}",
            app_slug, self.owner.id, self.id
        )
    }
}

/// Whether the GitHub App is installed on the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallationStatus {
    Installed,
    Absent,
    /// The query failed for a reason other than "not installed"
    Inconclusive,
}

/// Remote operations the engine needs.
///
/// Methods take `&self`; implementations that record state use interior
/// mutability.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Checks that the transport is available and authenticated.
    async fn check_access(&self) -> Result<(), PreflightError>;

    async fn repo_info(&self) -> Result<RepoInfo, ControlPlaneError>;

    async fn list_labels(&self) -> Result<Vec<String>, ControlPlaneError>;

    /// Creates a label. An existing label yields [`ControlPlaneError::Conflict`].
    async fn create_label(&self, label: &LabelSpec) -> Result<(), ControlPlaneError>;

    /// Overwrites description and color of an existing label.
    async fn update_label(&self, label: &LabelSpec) -> Result<(), ControlPlaneError>;

    /// Deletes a label. A missing label yields [`ControlPlaneError::NotFound`].
    async fn delete_label(&self, name: &str) -> Result<(), ControlPlaneError>;

    async fn secret_names(&self) -> Result<Vec<String>, ControlPlaneError>;

    async fn installation_status(&self, repo: &RepoInfo, app_slug: &str) -> InstallationStatus;

    async fn add_collaborator(&self, handle: &str) -> Result<(), ControlPlaneError>;

    /// Creates an issue and returns its URL.
    async fn create_issue(&self, title: &str, body: &str) -> Result<String, ControlPlaneError>;
}
