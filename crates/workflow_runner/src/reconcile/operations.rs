//! Operations - the steps a plan is made of
//!
//! Operations are the output of [`crate::reconcile::plan`] and describe what
//! the executor has to do to move the repository to the desired state.

use std::fmt;

use ghwf_workflow_catalogue::{FileKind, FileSpec, LabelSpec};

/// Literal text replacement applied while copying a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchSubstitution {
    /// Exact, case-sensitive text to look for
    pub pattern: String,
    /// Branch written in place of the pattern's quoted value
    pub branch: String,
}

impl BranchSubstitution {
    pub fn new(pattern: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            branch: branch.into(),
        }
    }

    /// The pattern with its quoted value swapped for the branch. A pattern
    /// without a quoted value is replaced by the bare branch name.
    pub fn replacement(&self) -> String {
        match (self.pattern.find('"'), self.pattern.rfind('"')) {
            (Some(open), Some(close)) if open < close => format!(
                "{}{}{}",
                &self.pattern[..=open],
                self.branch,
                &self.pattern[close..]
            ),
            _ => self.branch.clone(),
        }
    }

    /// Replaces every occurrence of the pattern. Content without the pattern
    /// is returned unchanged.
    pub fn apply(&self, content: &str) -> String {
        content.replace(&self.pattern, &self.replacement())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Make sure the GitHub App is installed (may ask the user)
    EnsureAppInstalled,

    /// Copy a template over its target, optionally substituting the branch
    CopyFile {
        spec: FileSpec,
        substitution: Option<BranchSubstitution>,
    },

    /// Remove a file left behind by an older version
    RemoveFile { name: String, kind: FileKind },

    /// Create the label, or update it if it already exists
    UpsertLabel(LabelSpec),

    /// Delete the label; a missing label is expected
    DeleteLabel(LabelSpec),

    AddCollaborator { handle: String },

    /// Tell the user how to set the secret and wait for them
    PromptSecret { name: String },

    CreateSampleIssue { title: String, body: String },
}

/// Coarse grouping used for step summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OperationCategory {
    App,
    Files,
    Agents,
    Labels,
    Collaborator,
    Secret,
    SampleIssue,
}

impl OperationCategory {
    pub const ALL: [Self; 7] = [
        Self::App,
        Self::Files,
        Self::Agents,
        Self::Labels,
        Self::Collaborator,
        Self::Secret,
        Self::SampleIssue,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Self::App => "GitHub App",
            Self::Files => "Workflow files",
            Self::Agents => "Agent files",
            Self::Labels => "Labels",
            Self::Collaborator => "Collaborator",
            Self::Secret => "Secret",
            Self::SampleIssue => "Sample issue",
        }
    }
}

impl Operation {
    pub fn category(&self) -> OperationCategory {
        match self {
            Self::EnsureAppInstalled => OperationCategory::App,
            Self::CopyFile { spec, .. } => match spec.kind {
                FileKind::Workflow => OperationCategory::Files,
                FileKind::Agent => OperationCategory::Agents,
            },
            Self::RemoveFile { kind, .. } => match kind {
                FileKind::Workflow => OperationCategory::Files,
                FileKind::Agent => OperationCategory::Agents,
            },
            Self::UpsertLabel(_) | Self::DeleteLabel(_) => OperationCategory::Labels,
            Self::AddCollaborator { .. } => OperationCategory::Collaborator,
            Self::PromptSecret { .. } => OperationCategory::Secret,
            Self::CreateSampleIssue { .. } => OperationCategory::SampleIssue,
        }
    }

    /// Identifier of the thing the operation acts on.
    pub fn target(&self) -> &str {
        match self {
            Self::EnsureAppInstalled => ghwf_workflow_catalogue::APP_SLUG,
            Self::CopyFile { spec, .. } => &spec.name,
            Self::RemoveFile { name, .. } => name,
            Self::UpsertLabel(label) | Self::DeleteLabel(label) => &label.name,
            Self::AddCollaborator { handle } => handle,
            Self::PromptSecret { name } => name,
            Self::CreateSampleIssue { title, .. } => title,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EnsureAppInstalled => write!(
                f,
                "Check GitHub App '{}' installation",
                ghwf_workflow_catalogue::APP_SLUG
            ),
            Self::CopyFile { spec, substitution } => {
                write!(f, "Copy {} -> {}/{}", spec.name, spec.kind.target_dir(), spec.name)?;
                if let Some(sub) = substitution {
                    write!(f, " (base branch: {})", sub.branch)?;
                }
                Ok(())
            }
            Self::RemoveFile { name, kind } => {
                write!(f, "Remove legacy {}/{}", kind.target_dir(), name)
            }
            Self::UpsertLabel(label) => write!(f, "Create or update label: {}", label.name),
            Self::DeleteLabel(label) => write!(f, "Delete label: {}", label.name),
            Self::AddCollaborator { handle } => write!(f, "Add collaborator: {}", handle),
            Self::PromptSecret { name } => write!(f, "Configure secret: {}", name),
            Self::CreateSampleIssue { title, .. } => write!(f, "Create sample issue: {}", title),
        }
    }
}

/// Ordered list of operations produced by the planner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    operations: Vec<Operation>,
}

impl Plan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, operation: Operation) {
        self.operations.push(operation);
    }

    pub fn extend(&mut self, operations: impl IntoIterator<Item = Operation>) {
        self.operations.extend(operations);
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Operation> {
        self.operations.iter()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn count_in(&self, category: OperationCategory) -> usize {
        self.operations
            .iter()
            .filter(|op| op.category() == category)
            .count()
    }

    /// Human-readable preview, one line per operation.
    pub fn preview(&self) -> Vec<String> {
        self.operations.iter().map(ToString::to_string).collect()
    }
}

impl From<Vec<Operation>> for Plan {
    fn from(operations: Vec<Operation>) -> Self {
        Self { operations }
    }
}

impl IntoIterator for Plan {
    type Item = Operation;
    type IntoIter = std::vec::IntoIter<Operation>;

    fn into_iter(self) -> Self::IntoIter {
        self.operations.into_iter()
    }
}

impl<'a> IntoIterator for &'a Plan {
    type Item = &'a Operation;
    type IntoIter = std::slice::Iter<'a, Operation>;

    fn into_iter(self) -> Self::IntoIter {
        self.operations.iter()
    }
}
