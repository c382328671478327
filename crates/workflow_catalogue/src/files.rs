use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::{CatalogueError, CatalogueVersion};

/// Installed workflow files, relative to the repository root.
pub const WORKFLOWS_DIR: &str = ".github/workflows";

/// Installed agent definitions, relative to the repository root.
pub const AGENTS_DIR: &str = ".claude/agents";

/// Literal text replaced by the repository's branch when copying workflows.
pub const BRANCH_PLACEHOLDER: &str = "base_branch: \"main\"";

/// Overrides the template directory.
pub const TEMPLATES_DIR_ENV: &str = "GHWF_TEMPLATES_DIR";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Workflow,
    Agent,
}

impl FileKind {
    /// Install location relative to the repository root.
    pub fn target_dir(self) -> &'static str {
        match self {
            Self::Workflow => WORKFLOWS_DIR,
            Self::Agent => AGENTS_DIR,
        }
    }
}

/// A file the workflow installs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSpec {
    /// File name inside the target directory
    pub name: String,
    pub kind: FileKind,
    /// Template the file is copied from
    pub source: PathBuf,
    /// Text to substitute with the branch name, if any
    pub placeholder: Option<String>,
}

impl FileSpec {
    pub fn target(&self, root: &Path) -> PathBuf {
        root.join(self.kind.target_dir()).join(&self.name)
    }
}

/// Workflow file names that only ever belonged to an older version.
///
/// Disjoint from [`CatalogueVersion::LATEST`]'s file set by construction.
pub fn legacy_workflow_files() -> Vec<&'static str> {
    let current = CatalogueVersion::LATEST.workflow_files();
    CatalogueVersion::V1
        .workflow_files()
        .iter()
        .copied()
        .filter(|name| !current.contains(name))
        .collect()
}

/// A directory of templates laid out as `workflows/*.yml` and `agents/*.md`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSet {
    root: PathBuf,
}

impl TemplateSet {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Templates shipped alongside this repository.
    pub fn bundled() -> Self {
        Self::new(Path::new(env!("CARGO_MANIFEST_DIR")).join("../../templates"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn workflows_dir(&self) -> PathBuf {
        self.root.join("workflows")
    }

    pub fn agents_dir(&self) -> PathBuf {
        self.root.join("agents")
    }

    /// File specs for the given version's workflows.
    ///
    /// Sources are not checked here; a missing template surfaces when the
    /// plan is built.
    pub fn workflow_specs(&self, version: CatalogueVersion) -> Vec<FileSpec> {
        let dir = self.workflows_dir();
        version
            .workflow_files()
            .iter()
            .map(|name| FileSpec {
                name: name.to_string(),
                kind: FileKind::Workflow,
                source: dir.join(name),
                placeholder: Some(BRANCH_PLACEHOLDER.to_string()),
            })
            .collect()
    }

    /// One spec per `*.md` file directly under `agents/`, sorted by name.
    ///
    /// A missing `agents/` directory yields no specs.
    pub fn agent_specs(&self) -> Result<Vec<FileSpec>, CatalogueError> {
        let dir = self.agents_dir();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut specs = Vec::new();
        for entry in WalkDir::new(&dir).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }

            let name = entry
                .file_name()
                .to_str()
                .ok_or_else(|| CatalogueError::InvalidFileName(path.display().to_string()))?
                .to_string();

            specs.push(FileSpec {
                name,
                kind: FileKind::Agent,
                source: path.to_path_buf(),
                placeholder: None,
            });
        }

        Ok(specs)
    }
}
