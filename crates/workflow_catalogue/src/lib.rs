//! Versioned catalogue of everything the workflow installs into a repository:
//! label alphabets, workflow/agent file sets and the fixed remote identities.

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod files;
mod labels;

pub use files::{
    legacy_workflow_files, FileKind, FileSpec, TemplateSet, AGENTS_DIR, BRANCH_PLACEHOLDER,
    TEMPLATES_DIR_ENV, WORKFLOWS_DIR,
};
pub use labels::{LabelCatalogue, LabelCategory, LabelSpec};

/// Collaborator invited so it can act on issues and pull requests.
pub const COLLABORATOR_HANDLE: &str = "claude-dev-truefrontier";

/// Repository secret the stage workflows read.
pub const SECRET_NAME: &str = "ANTHROPIC_API_KEY";

/// Where users obtain a value for [`SECRET_NAME`].
pub const SECRET_CONSOLE_URL: &str = "https://console.anthropic.com/";

/// Slug of the GitHub App the workflows invoke.
pub const APP_SLUG: &str = "claude";

pub const SAMPLE_ISSUE_TITLE: &str = "Sample: Hello World Function";

pub const SAMPLE_ISSUE_BODY: &str = "## Sample Feature Request

This is a test issue to demonstrate the GitHub Claude Workflow system.

### Requirements
- Create a simple \"Hello World\" function
- Add basic tests
- Document the function

**To start the workflow, comment:** `@claude-dev-truefrontier`";

#[derive(Debug, Error)]
pub enum CatalogueError {
    #[error("Failed to scan templates: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("Template file name is not valid UTF-8: {0}")]
    InvalidFileName(String),
}

/// Version of the installed configuration.
///
/// Exactly one version is the desired target of any run; migrations always
/// go to [`CatalogueVersion::LATEST`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogueVersion {
    /// triage / spec / architect / develop
    V1,
    /// specify / plan / develop
    V2,
}

impl CatalogueVersion {
    pub const LATEST: Self = Self::V2;

    /// Workflow stages whose labels make up this version's alphabet.
    pub fn stages(self) -> &'static [&'static str] {
        match self {
            Self::V1 => &["triage", "spec", "architect", "develop"],
            Self::V2 => &["specify", "plan", "develop"],
        }
    }

    /// Workflow file names installed by this version.
    pub fn workflow_files(self) -> &'static [&'static str] {
        match self {
            Self::V1 => &[
                "orchestrator.yml",
                "stage-triage.yml",
                "stage-spec.yml",
                "stage-architect.yml",
                "stage-develop.yml",
            ],
            Self::V2 => &[
                "orchestrator.yml",
                "stage-specify.yml",
                "stage-plan.yml",
                "stage-tasks.yml",
                "stage-develop.yml",
            ],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::V1 => "v1",
            Self::V2 => "v2",
        }
    }
}

impl std::fmt::Display for CatalogueVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
