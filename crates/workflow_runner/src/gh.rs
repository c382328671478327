//! GhCli - [`ControlPlane`] backed by the GitHub CLI

use std::process::{Output, Stdio};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;

use ghwf_workflow_catalogue::LabelSpec;

use crate::control_plane::{ControlPlane, ControlPlaneError, InstallationStatus, RepoInfo};
use crate::preflight::{PreflightError, PreflightKind};

#[derive(Debug, Deserialize)]
struct NamedEntry {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Installation {
    #[serde(default)]
    app_slug: String,
}

/// Talks to GitHub by running `gh` in the current directory.
pub struct GhCli {
    pub bin: String,
}

impl GhCli {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }

    async fn output(&self, args: &[&str]) -> Result<Output, std::io::Error> {
        tracing::trace!(bin = %self.bin, ?args, "running gh");
        Command::new(&self.bin)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
    }

    /// Runs gh and returns stdout, mapping a failed exit to `CommandFailed`.
    async fn run(&self, args: &[&str]) -> Result<String, ControlPlaneError> {
        let output = self.output(args).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(classify_failure(stderr));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// A 401 or 403 from the installation endpoint: the token cannot see the
/// installation, which for a user token means the app is not installed.
fn is_access_denied(stderr: &str) -> bool {
    let lower = stderr.to_lowercase();
    lower.contains("http 401") || lower.contains("http 403")
}

fn classify_failure(stderr: String) -> ControlPlaneError {
    let lower = stderr.to_lowercase();
    if lower.contains("already exists") {
        ControlPlaneError::Conflict(stderr)
    } else if lower.contains("not found") || lower.contains("http 404") {
        ControlPlaneError::NotFound(stderr)
    } else {
        ControlPlaneError::CommandFailed(stderr)
    }
}

#[async_trait]
impl ControlPlane for GhCli {
    async fn check_access(&self) -> Result<(), PreflightError> {
        match self.output(&["--version"]).await {
            Ok(out) if out.status.success() => {}
            _ => {
                return Err(PreflightError::new(
                    PreflightKind::GithubCliMissing,
                    "GitHub CLI (gh) is not installed or not in PATH",
                ))
            }
        }

        match self.output(&["auth", "status"]).await {
            Ok(out) if out.status.success() => Ok(()),
            _ => Err(PreflightError::new(
                PreflightKind::GithubAuthMissing,
                "GitHub CLI is not authenticated. Run: gh auth login",
            )),
        }
    }

    async fn repo_info(&self) -> Result<RepoInfo, ControlPlaneError> {
        let stdout = self.run(&["api", "repos/{owner}/{repo}"]).await?;
        Ok(serde_json::from_str(&stdout)?)
    }

    async fn list_labels(&self) -> Result<Vec<String>, ControlPlaneError> {
        let stdout = self
            .run(&["label", "list", "--json", "name", "--limit", "1000"])
            .await?;
        let labels: Vec<NamedEntry> = serde_json::from_str(&stdout)?;
        Ok(labels.into_iter().map(|l| l.name).collect())
    }

    async fn create_label(&self, label: &LabelSpec) -> Result<(), ControlPlaneError> {
        self.run(&[
            "label",
            "create",
            &label.name,
            "--description",
            &label.description,
            "--color",
            &label.color,
        ])
        .await?;
        Ok(())
    }

    async fn update_label(&self, label: &LabelSpec) -> Result<(), ControlPlaneError> {
        self.run(&[
            "label",
            "edit",
            &label.name,
            "--description",
            &label.description,
            "--color",
            &label.color,
        ])
        .await?;
        Ok(())
    }

    async fn delete_label(&self, name: &str) -> Result<(), ControlPlaneError> {
        self.run(&["label", "delete", name, "--yes"]).await?;
        Ok(())
    }

    async fn secret_names(&self) -> Result<Vec<String>, ControlPlaneError> {
        let stdout = self.run(&["secret", "list", "--json", "name"]).await?;
        let secrets: Vec<NamedEntry> = serde_json::from_str(&stdout)?;
        Ok(secrets.into_iter().map(|s| s.name).collect())
    }

    async fn installation_status(&self, repo: &RepoInfo, app_slug: &str) -> InstallationStatus {
        let path = format!("repos/{}/installation", repo.full_name);
        match self.run(&["api", &path]).await {
            Ok(stdout) => match serde_json::from_str::<Installation>(&stdout) {
                Ok(installation) if installation.app_slug == app_slug => InstallationStatus::Installed,
                Ok(_) => InstallationStatus::Absent,
                Err(_) => InstallationStatus::Inconclusive,
            },
            Err(ControlPlaneError::NotFound(_)) => InstallationStatus::Absent,
            Err(ControlPlaneError::CommandFailed(stderr)) if is_access_denied(&stderr) => {
                tracing::debug!(%stderr, "installation not visible, treating as absent");
                InstallationStatus::Absent
            }
            Err(e) => {
                tracing::debug!(error = %e, "installation query failed");
                InstallationStatus::Inconclusive
            }
        }
    }

    async fn add_collaborator(&self, handle: &str) -> Result<(), ControlPlaneError> {
        let path = format!("repos/{{owner}}/{{repo}}/collaborators/{}", handle);
        self.run(&["api", "--method", "PUT", &path]).await?;
        Ok(())
    }

    async fn create_issue(&self, title: &str, body: &str) -> Result<String, ControlPlaneError> {
        let stdout = self
            .run(&["issue", "create", "--title", title, "--body", body])
            .await?;
        Ok(stdout.trim().to_string())
    }
}
