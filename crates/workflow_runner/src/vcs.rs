use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

/// Source of the checked-out branch name.
#[async_trait]
pub trait VersionControl: Send + Sync {
    /// Current branch, or `None` if it cannot be determined.
    async fn current_branch(&self, root: &Path) -> Option<String>;
}

/// Reads the branch with `git rev-parse --abbrev-ref HEAD`.
pub struct GitCli;

#[async_trait]
impl VersionControl for GitCli {
    async fn current_branch(&self, root: &Path) -> Option<String> {
        let output = Command::new("git")
            .arg("-C")
            .arg(root)
            .args(["rev-parse", "--abbrev-ref", "HEAD"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .ok()?;

        if !output.status.success() {
            return None;
        }

        let branch = String::from_utf8_lossy(&output.stdout).trim().to_string();
        // detached HEAD
        if branch.is_empty() || branch == "HEAD" {
            return None;
        }
        Some(branch)
    }
}
