use thiserror::Error;

pub mod control_plane;
pub mod controller;
pub mod gh;
pub mod interaction;
pub mod preflight;
pub mod reconcile;
pub mod state;
pub mod validate;
pub mod vcs;

pub use control_plane::{ControlPlane, ControlPlaneError, InstallationStatus, RepoInfo};
pub use controller::{
    execute, ExecutionContext, ExecutionResult, InitOptions, InitOutcome, LabelListing,
    LabelTally, LabelsAction, LabelsOutcome, OperationRecord, OperationStatus, RunStatus,
    SetupController,
};
pub use gh::GhCli;
pub use interaction::{NonInteractive, UserInteraction};
pub use preflight::{run_preflight, PreflightError, PreflightKind};
pub use reconcile::{plan, Operation, OperationCategory, Plan, PlanningError};
pub use state::{compute_desired, DesiredState, ObservedState, SetupMode, Toggles};
pub use validate::{validate, InvalidFile, ValidationReport};
pub use vcs::{GitCli, VersionControl};

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Pre-flight check failed: {0}")]
    Preflight(#[from] PreflightError),

    #[error("Planning failed: {0}")]
    Planning(#[from] PlanningError),

    #[error("Template error: {0}")]
    Catalogue(#[from] ghwf_workflow_catalogue::CatalogueError),

    #[error(transparent)]
    ControlPlane(#[from] ControlPlaneError),
}

impl WorkflowError {
    /// Remediation shown next to the error, if there is one.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Preflight(e) => Some(e.hint()),
            Self::Planning(_) | Self::Catalogue(_) => {
                Some("Check the templates directory (--templates or GHWF_TEMPLATES_DIR)")
            }
            Self::ControlPlane(_) => None,
        }
    }
}

// ============================================================================
// SetupUI Trait - user-facing progress, separate from tracing diagnostics
// ============================================================================

pub trait SetupUI {
    fn on_preflight_passed(&mut self, repo: &RepoInfo);

    /// Called once the repository has been inspected
    fn on_mode(&mut self, mode: SetupMode, observed: &ObservedState);

    fn on_step_start(&mut self, step: usize, total: usize, operation: &Operation);

    fn on_step_finished(&mut self, record: &OperationRecord);

    /// Informational text (instructions, URLs)
    fn on_notice(&mut self, message: &str);

    /// Called instead of execution when nothing may change
    fn on_dry_run(&mut self, plan: &Plan);

    fn on_finished(&mut self, result: &ExecutionResult);
}

// ============================================================================
// HeadlessUI - println!-based output
// ============================================================================

pub struct HeadlessUI;

impl SetupUI for HeadlessUI {
    fn on_preflight_passed(&mut self, repo: &RepoInfo) {
        println!("Repository: {}", repo.full_name);
    }

    fn on_mode(&mut self, mode: SetupMode, observed: &ObservedState) {
        match (mode, observed.detected_version) {
            (SetupMode::Update, Some(version)) => {
                println!("Detected installation: {} (updating)", version)
            }
            _ => println!("No installation detected (fresh setup)"),
        }
        println!("Base branch: {}", observed.current_branch);
    }

    fn on_step_start(&mut self, step: usize, total: usize, operation: &Operation) {
        println!("\nStep {}/{}: {}", step, total, operation);
    }

    fn on_step_finished(&mut self, record: &OperationRecord) {
        match &record.message {
            Some(msg) => println!("  {}: {}", record.status, msg),
            None => println!("  {}", record.status),
        }
    }

    fn on_notice(&mut self, message: &str) {
        println!("  {}", message);
    }

    fn on_dry_run(&mut self, plan: &Plan) {
        println!("\nDry run, {} operation(s) would be executed:", plan.len());
        for (i, line) in plan.preview().iter().enumerate() {
            println!("  {:>2}. {}", i + 1, line);
        }
    }

    fn on_finished(&mut self, result: &ExecutionResult) {
        println!();
        for line in summary_lines(result) {
            println!("{}", line);
        }
        if let RunStatus::Aborted { hint: Some(hint), .. } = &result.status {
            eprintln!("Hint: {}", hint);
        }
    }
}

/// Human-readable summary of a finished run.
pub fn summary_lines(result: &ExecutionResult) -> Vec<String> {
    let mut lines = vec!["Summary:".to_string()];

    for category in OperationCategory::ALL {
        let attempted = result.attempted(category);
        if attempted == 0 {
            continue;
        }
        let counts: Vec<String> = OperationStatus::ALL
            .iter()
            .filter_map(|&status| match result.count_in(category, status) {
                0 => None,
                n => Some(format!("{} {}", n, status)),
            })
            .collect();
        lines.push(format!("  {}: {}", category.title(), counts.join(", ")));
    }

    let cleanup = result.is_label_cleanup();
    if result.attempted(OperationCategory::Labels) > 0 {
        let tally = result.label_tally();
        if cleanup {
            lines.push(format!(
                "  Labels removed: {}, not found: {}, failed: {}",
                tally.removed, tally.not_found, tally.failed
            ));
        } else {
            lines.push(format!(
                "  Labels created: {}, updated: {}, failed: {}",
                tally.created, tally.updated, tally.failed
            ));
        }
    }

    let run = if cleanup { "Cleanup" } else { "Setup" };
    lines.push(match &result.status {
        RunStatus::Succeeded => format!("{} completed successfully.", run),
        RunStatus::PartiallyWarned => format!("{} completed with warnings.", run),
        RunStatus::Aborted { step, reason, .. } => {
            format!("Aborted at step {}/{}: {}", step, result.total_steps, reason)
        }
        RunStatus::Pending | RunStatus::Running => format!("{} did not finish.", run),
    });

    lines
}

// ============================================================================
// Test Utilities - exported for integration tests
// ============================================================================

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils {
    use super::*;
    use std::collections::{BTreeMap, HashSet, VecDeque};
    use std::path::Path;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use ghwf_workflow_catalogue::LabelSpec;

    use crate::control_plane::{RepoOwner, RepoPermissions};

    /// acme/widgets with admin permission.
    pub fn mock_repo() -> RepoInfo {
        RepoInfo {
            full_name: "acme/widgets".to_string(),
            id: 42,
            owner: RepoOwner { id: 7, login: "acme".to_string() },
            permissions: Some(RepoPermissions { admin: true, maintain: false, push: true }),
        }
    }

    /// In-memory control plane. Labels map name to (description, color).
    pub struct MockControlPlane {
        labels: Mutex<BTreeMap<String, (String, String)>>,
        secrets: Vec<String>,
        repo: Option<RepoInfo>,
        access_error: Option<PreflightKind>,
        failing_reads: bool,
        failing_labels: HashSet<String>,
        failing_collaborator: bool,
        failing_issue: bool,
        installation: Mutex<VecDeque<InstallationStatus>>,
        collaborators: Mutex<Vec<String>>,
        issues: Mutex<Vec<String>>,
        calls: Mutex<Vec<String>>,
    }

    impl Default for MockControlPlane {
        fn default() -> Self {
            Self {
                labels: Mutex::new(BTreeMap::new()),
                secrets: Vec::new(),
                repo: Some(mock_repo()),
                access_error: None,
                failing_reads: false,
                failing_labels: HashSet::new(),
                failing_collaborator: false,
                failing_issue: false,
                installation: Mutex::new(VecDeque::new()),
                collaborators: Mutex::new(Vec::new()),
                issues: Mutex::new(Vec::new()),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl MockControlPlane {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_label(self, name: &str, color: &str) -> Self {
            self.labels
                .lock()
                .unwrap()
                .insert(name.to_string(), (String::new(), color.to_string()));
            self
        }

        pub fn with_labels<'a>(self, names: impl IntoIterator<Item = &'a str>) -> Self {
            names.into_iter().fold(self, |cp, name| cp.with_label(name, "000000"))
        }

        pub fn with_secret(mut self, name: &str) -> Self {
            self.secrets.push(name.to_string());
            self
        }

        pub fn with_repo(mut self, repo: RepoInfo) -> Self {
            self.repo = Some(repo);
            self
        }

        pub fn without_repo(mut self) -> Self {
            self.repo = None;
            self
        }

        pub fn with_access_error(mut self, kind: PreflightKind) -> Self {
            self.access_error = Some(kind);
            self
        }

        /// Label and secret listings fail.
        pub fn failing_reads(mut self) -> Self {
            self.failing_reads = true;
            self
        }

        /// Every write to this label fails. Creating it while it exists
        /// still reports a conflict first.
        pub fn failing_label(mut self, name: &str) -> Self {
            self.failing_labels.insert(name.to_string());
            self
        }

        pub fn failing_collaborator(mut self) -> Self {
            self.failing_collaborator = true;
            self
        }

        pub fn failing_issue(mut self) -> Self {
            self.failing_issue = true;
            self
        }

        /// Installation statuses returned in order; the last one repeats.
        /// Without any, the app counts as installed.
        pub fn with_installation(
            self,
            statuses: impl IntoIterator<Item = InstallationStatus>,
        ) -> Self {
            self.installation.lock().unwrap().extend(statuses);
            self
        }

        pub fn label_color(&self, name: &str) -> Option<String> {
            self.labels
                .lock()
                .unwrap()
                .get(name)
                .map(|(_, color)| color.clone())
        }

        pub fn label_names(&self) -> Vec<String> {
            self.labels.lock().unwrap().keys().cloned().collect()
        }

        pub fn collaborators(&self) -> Vec<String> {
            self.collaborators.lock().unwrap().clone()
        }

        pub fn issues(&self) -> Vec<String> {
            self.issues.lock().unwrap().clone()
        }

        /// Every attempted write, successful or not, as `kind:target`.
        pub fn mutating_calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, kind: &str, target: &str) {
            self.calls.lock().unwrap().push(format!("{}:{}", kind, target));
        }
    }

    #[async_trait]
    impl ControlPlane for MockControlPlane {
        async fn check_access(&self) -> Result<(), PreflightError> {
            match self.access_error {
                Some(kind) => Err(PreflightError::new(kind, "mock access failure")),
                None => Ok(()),
            }
        }

        async fn repo_info(&self) -> Result<RepoInfo, ControlPlaneError> {
            self.repo
                .clone()
                .ok_or_else(|| ControlPlaneError::NotFound("repository".to_string()))
        }

        async fn list_labels(&self) -> Result<Vec<String>, ControlPlaneError> {
            if self.failing_reads {
                return Err(ControlPlaneError::CommandFailed("label list".to_string()));
            }
            Ok(self.label_names())
        }

        async fn create_label(&self, label: &LabelSpec) -> Result<(), ControlPlaneError> {
            self.record("create_label", &label.name);
            let mut labels = self.labels.lock().unwrap();
            if labels.contains_key(&label.name) {
                return Err(ControlPlaneError::Conflict(label.name.clone()));
            }
            if self.failing_labels.contains(&label.name) {
                return Err(ControlPlaneError::CommandFailed(label.name.clone()));
            }
            labels.insert(
                label.name.clone(),
                (label.description.clone(), label.color.clone()),
            );
            Ok(())
        }

        async fn update_label(&self, label: &LabelSpec) -> Result<(), ControlPlaneError> {
            self.record("update_label", &label.name);
            if self.failing_labels.contains(&label.name) {
                return Err(ControlPlaneError::CommandFailed(label.name.clone()));
            }
            match self.labels.lock().unwrap().get_mut(&label.name) {
                Some(entry) => {
                    *entry = (label.description.clone(), label.color.clone());
                    Ok(())
                }
                None => Err(ControlPlaneError::NotFound(label.name.clone())),
            }
        }

        async fn delete_label(&self, name: &str) -> Result<(), ControlPlaneError> {
            self.record("delete_label", name);
            if self.failing_labels.contains(name) {
                return Err(ControlPlaneError::CommandFailed(name.to_string()));
            }
            match self.labels.lock().unwrap().remove(name) {
                Some(_) => Ok(()),
                None => Err(ControlPlaneError::NotFound(name.to_string())),
            }
        }

        async fn secret_names(&self) -> Result<Vec<String>, ControlPlaneError> {
            if self.failing_reads {
                return Err(ControlPlaneError::CommandFailed("secret list".to_string()));
            }
            Ok(self.secrets.clone())
        }

        async fn installation_status(&self, _repo: &RepoInfo, _app_slug: &str) -> InstallationStatus {
            let mut queue = self.installation.lock().unwrap();
            match queue.len() {
                0 => InstallationStatus::Installed,
                1 => queue[0],
                _ => queue.pop_front().unwrap_or(InstallationStatus::Installed),
            }
        }

        async fn add_collaborator(&self, handle: &str) -> Result<(), ControlPlaneError> {
            self.record("add_collaborator", handle);
            if self.failing_collaborator {
                return Err(ControlPlaneError::CommandFailed("HTTP 422".to_string()));
            }
            self.collaborators.lock().unwrap().push(handle.to_string());
            Ok(())
        }

        async fn create_issue(&self, title: &str, _body: &str) -> Result<String, ControlPlaneError> {
            self.record("create_issue", title);
            if self.failing_issue {
                return Err(ControlPlaneError::CommandFailed("issue create".to_string()));
            }
            let mut issues = self.issues.lock().unwrap();
            issues.push(title.to_string());
            Ok(format!("https://github.com/acme/widgets/issues/{}", issues.len()))
        }
    }

    /// Version control reporting a fixed branch.
    pub struct MockVcs {
        branch: Option<String>,
    }

    impl MockVcs {
        pub fn on_branch(branch: &str) -> Self {
            Self { branch: Some(branch.to_string()) }
        }

        pub fn detached() -> Self {
            Self { branch: None }
        }
    }

    #[async_trait]
    impl VersionControl for MockVcs {
        async fn current_branch(&self, _root: &Path) -> Option<String> {
            self.branch.clone()
        }
    }

    /// Scripted answers; once they run out every question gets its default.
    #[derive(Default)]
    pub struct MockInteraction {
        answers: VecDeque<bool>,
        prompts: Vec<String>,
        urls: Vec<String>,
        acknowledged: usize,
    }

    impl MockInteraction {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn answering(mut self, answers: impl IntoIterator<Item = bool>) -> Self {
            self.answers.extend(answers);
            self
        }

        pub fn prompts(&self) -> &[String] {
            &self.prompts
        }

        pub fn opened_urls(&self) -> &[String] {
            &self.urls
        }

        pub fn acknowledgements(&self) -> usize {
            self.acknowledged
        }
    }

    impl UserInteraction for MockInteraction {
        fn confirm(&mut self, prompt: &str, default: bool) -> bool {
            self.prompts.push(prompt.to_string());
            self.answers.pop_front().unwrap_or(default)
        }

        fn open_url(&mut self, url: &str) -> bool {
            self.urls.push(url.to_string());
            true
        }

        fn acknowledge(&mut self, _prompt: &str) {
            self.acknowledged += 1;
        }
    }

    /// Mock UI - records every event
    #[derive(Default)]
    pub struct MockUI {
        pub events: Vec<String>,
    }

    impl MockUI {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn events(&self) -> &[String] {
            &self.events
        }
    }

    impl SetupUI for MockUI {
        fn on_preflight_passed(&mut self, repo: &RepoInfo) {
            self.events.push(format!("preflight:{}", repo.full_name));
        }
        fn on_mode(&mut self, mode: SetupMode, observed: &ObservedState) {
            self.events.push(format!("mode:{:?}:{}", mode, observed.current_branch));
        }
        fn on_step_start(&mut self, step: usize, total: usize, operation: &Operation) {
            self.events.push(format!("step:{}/{}:{}", step, total, operation));
        }
        fn on_step_finished(&mut self, record: &OperationRecord) {
            self.events.push(format!("done:{}:{}", record.step, record.status));
        }
        fn on_notice(&mut self, message: &str) {
            self.events.push(format!("notice:{}", message));
        }
        fn on_dry_run(&mut self, plan: &Plan) {
            self.events.push(format!("dry_run:{}", plan.len()));
        }
        fn on_finished(&mut self, result: &ExecutionResult) {
            self.events.push(format!("finished:{:?}", result.status));
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockControlPlane, MockInteraction, MockUI};
    use ghwf_workflow_catalogue::{LabelCatalogue, CatalogueVersion};

    #[tokio::test]
    async fn test_summary_for_label_setup() {
        let cp = MockControlPlane::new().with_label("needs:plan", "000000");
        let mut interaction = MockInteraction::new();
        let mut ui = MockUI::new();
        let mut ctx = ExecutionContext::new("/nonexistent", &cp, &mut interaction, &mut ui);
        let plan = Plan::from(reconcile::plan_label_setup(&LabelCatalogue::for_version(
            CatalogueVersion::V2,
        )));

        let result = execute(&plan, &mut ctx).await;
        let lines = summary_lines(&result);

        assert!(lines.contains(&"  Labels: 11 applied, 1 updated".to_string()));
        assert!(lines.contains(&"  Labels created: 11, updated: 1, failed: 0".to_string()));
        assert_eq!(lines.last().unwrap(), "Setup completed successfully.");
    }

    #[tokio::test]
    async fn test_summary_for_failed_label_cleanup() {
        let catalogue = LabelCatalogue::for_version(CatalogueVersion::V2);
        let cp = catalogue
            .iter()
            .fold(MockControlPlane::new(), |cp, label| cp.failing_label(&label.name));
        let mut interaction = MockInteraction::new();
        let mut ui = MockUI::new();
        let mut ctx = ExecutionContext::new("/nonexistent", &cp, &mut interaction, &mut ui);
        let plan = Plan::from(reconcile::plan_label_cleanup(&catalogue));

        let result = execute(&plan, &mut ctx).await;
        let lines = summary_lines(&result);

        assert!(lines.contains(&"  Labels removed: 0, not found: 0, failed: 12".to_string()));
        assert!(!lines.iter().any(|l| l.contains("created")));
        assert_eq!(lines.last().unwrap(), "Cleanup completed with warnings.");
    }

    #[test]
    fn test_summary_for_abort() {
        let mut result = ExecutionResult::new(3);
        result.status = RunStatus::Aborted {
            step: 1,
            reason: "GitHub App installation was not confirmed".to_string(),
            hint: None,
        };

        let lines = summary_lines(&result);

        assert_eq!(
            lines.last().unwrap(),
            "Aborted at step 1/3: GitHub App installation was not confirmed"
        );
    }

    #[test]
    fn test_preflight_error_hint() {
        let err = WorkflowError::from(PreflightError::new(PreflightKind::NoRepoAccess, "no"));
        assert_eq!(err.hint(), Some("Ensure you have repository admin access"));
        assert_eq!(err.to_string(), "Pre-flight check failed: no");
    }
}
