//! Pre-flight checks run before anything is inspected or changed.

use thiserror::Error;

use crate::control_plane::{ControlPlane, ControlPlaneError, RepoInfo};

/// Machine-readable reason a pre-flight check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreflightKind {
    GithubCliMissing,
    GithubAuthMissing,
    NotARepo,
    RepoAccessFailed,
    NoRepoAccess,
    PermissionCheckFailed,
}

impl PreflightKind {
    /// What the user should do about it.
    pub fn hint(self) -> &'static str {
        match self {
            Self::GithubCliMissing => "Install GitHub CLI: https://cli.github.com/",
            Self::GithubAuthMissing => "Authenticate GitHub CLI: gh auth login",
            Self::NotARepo => "Run this command inside a GitHub repository checkout",
            Self::RepoAccessFailed => "Check your network connection and run: gh repo view",
            Self::NoRepoAccess => "Ensure you have repository admin access",
            Self::PermissionCheckFailed => "Verify your access with: gh api repos/{owner}/{repo}",
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PreflightError {
    pub kind: PreflightKind,
    pub message: String,
}

impl PreflightError {
    pub fn new(kind: PreflightKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn hint(&self) -> &'static str {
        self.kind.hint()
    }
}

/// Verifies transport, repository and (optionally) admin/maintain permission.
pub async fn run_preflight<C: ControlPlane + ?Sized>(
    control_plane: &C,
    require_admin: bool,
) -> Result<RepoInfo, PreflightError> {
    control_plane.check_access().await?;

    let repo = control_plane.repo_info().await.map_err(|e| match e {
        ControlPlaneError::NotFound(_) => PreflightError::new(
            PreflightKind::NotARepo,
            "Not in a GitHub repository or repository not found",
        ),
        other => PreflightError::new(
            PreflightKind::RepoAccessFailed,
            format!("Failed to access repository information: {}", other),
        ),
    })?;

    if require_admin {
        let permissions = repo.permissions.ok_or_else(|| {
            PreflightError::new(
                PreflightKind::PermissionCheckFailed,
                "Unable to verify repository permissions",
            )
        })?;

        if !permissions.admin && !permissions.maintain {
            return Err(PreflightError::new(
                PreflightKind::NoRepoAccess,
                "Repository admin access required for setup",
            ));
        }
    }

    tracing::debug!(repo = %repo.full_name, "pre-flight checks passed");
    Ok(repo)
}
