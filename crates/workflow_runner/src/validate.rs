//! Validator - read-only diff of the observed repository against the
//! latest desired state

use std::path::Path;

use ghwf_workflow_catalogue::{CatalogueError, TemplateSet, SECRET_NAME};
use serde_yaml::Value;

use crate::control_plane::ControlPlane;
use crate::preflight::{run_preflight, PreflightError};
use crate::state::{compute_desired, ObservedState, SetupMode};
use crate::vcs::VersionControl;

/// Top-level keys every workflow file must define.
const REQUIRED_KEYS: [&str; 3] = ["name", "on", "jobs"];

/// A workflow file that exists but does not look right.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidFile {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct ValidationReport {
    /// Set when pre-flight failed; nothing else is checked then
    pub preflight_error: Option<PreflightError>,
    /// Set when the templates could not be read; nothing else is checked then
    pub template_error: Option<CatalogueError>,
    pub present_files: Vec<String>,
    pub missing_files: Vec<String>,
    pub invalid_files: Vec<InvalidFile>,
    /// Files of an older version that `init` would remove
    pub legacy_files: Vec<String>,
    pub present_agents: Vec<String>,
    pub missing_agents: Vec<String>,
    pub existing_labels: Vec<String>,
    pub missing_labels: Vec<String>,
    pub total_labels: usize,
    pub secret_configured: bool,
}

impl ValidationReport {
    /// Missing or invalid files, unreadable templates and a failed pre-flight
    /// fail validation. Legacy files, missing labels and a missing secret are
    /// warnings only.
    pub fn passed(&self) -> bool {
        self.preflight_error.is_none()
            && self.template_error.is_none()
            && self.missing_files.is_empty()
            && self.invalid_files.is_empty()
            && self.missing_agents.is_empty()
    }

    pub fn warnings(&self) -> usize {
        self.legacy_files.len()
            + self.missing_labels.len()
            + usize::from(!self.secret_configured)
    }
}

/// Inspects `root` and the remote and compares them with what an update
/// run would install. Never changes anything.
pub async fn validate<C, V>(
    root: &Path,
    control_plane: &C,
    vcs: &V,
    templates: &TemplateSet,
) -> ValidationReport
where
    C: ControlPlane + ?Sized,
    V: VersionControl + ?Sized,
{
    let mut report = ValidationReport::default();

    if let Err(e) = run_preflight(control_plane, false).await {
        report.preflight_error = Some(e);
        return report;
    }

    let desired = match compute_desired(SetupMode::Update, templates, None, || false, None) {
        Ok(desired) => desired,
        Err(e) => {
            report.template_error = Some(e);
            return report;
        }
    };
    let observed = ObservedState::inspect(root, control_plane, vcs).await;

    for spec in &desired.file_specs {
        if !observed.installed_files.contains(&spec.name) {
            report.missing_files.push(spec.name.clone());
            continue;
        }

        let reason = match std::fs::read_to_string(spec.target(root)) {
            Ok(content) => check_workflow(&spec.name, &content),
            Err(e) => Some(format!("unreadable: {}", e)),
        };
        match reason {
            Some(reason) => report.invalid_files.push(InvalidFile {
                name: spec.name.clone(),
                reason,
            }),
            None => report.present_files.push(spec.name.clone()),
        }
    }
    report.legacy_files = observed.legacy_files_present.iter().cloned().collect();

    for spec in &desired.agent_specs {
        if observed.installed_agents.contains(&spec.name) {
            report.present_agents.push(spec.name.clone());
        } else {
            report.missing_agents.push(spec.name.clone());
        }
    }

    report.total_labels = desired.label_catalogue.len();
    for label in &desired.label_catalogue {
        if observed.labels.contains(&label.name) {
            report.existing_labels.push(label.name.clone());
        } else {
            report.missing_labels.push(label.name.clone());
        }
    }

    report.secret_configured = observed.has_secret;

    report
}

/// Returns why a workflow file is invalid, or `None` if it looks fine.
fn check_workflow(name: &str, content: &str) -> Option<String> {
    let document: Value = match serde_yaml::from_str(content) {
        Ok(document) => document,
        Err(e) => return Some(format!("invalid YAML: {}", e)),
    };
    let Some(mapping) = document.as_mapping() else {
        return Some("top level is not a mapping".to_string());
    };

    let missing: Vec<&str> = REQUIRED_KEYS
        .iter()
        .copied()
        .filter(|&key| {
            // YAML 1.1 readers turn a bare `on` key into `true`
            !(mapping.contains_key(key) || (key == "on" && mapping.contains_key(Value::Bool(true))))
        })
        .collect();
    if !missing.is_empty() {
        return Some(format!("missing {}", missing.join(", ")));
    }

    if name.starts_with("stage-") && !content.contains(SECRET_NAME) {
        return Some(format!("does not reference {}", SECRET_NAME));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preflight::PreflightKind;
    use crate::test_utils::{MockControlPlane, MockVcs};
    use ghwf_workflow_catalogue::{CatalogueVersion, WORKFLOWS_DIR};
    use tempfile::TempDir;

    fn install_bundled(root: &Path) {
        let templates = TemplateSet::bundled();
        for spec in templates
            .workflow_specs(CatalogueVersion::LATEST)
            .into_iter()
            .chain(templates.agent_specs().unwrap())
        {
            let target = spec.target(root);
            std::fs::create_dir_all(target.parent().unwrap()).unwrap();
            std::fs::copy(&spec.source, &target).unwrap();
        }
    }

    async fn run(root: &Path, cp: &MockControlPlane, templates: &TemplateSet) -> ValidationReport {
        validate(root, cp, &MockVcs::on_branch("main"), templates).await
    }

    #[test]
    fn test_check_workflow() {
        assert_eq!(check_workflow("orchestrator.yml", "name: x\non: push\njobs: {}\n"), None);
        assert!(check_workflow("orchestrator.yml", "name: x\njobs: {}\n")
            .unwrap()
            .contains("on"));
        assert!(check_workflow("stage-plan.yml", "name: x\non: push\njobs: {}\n")
            .unwrap()
            .contains(SECRET_NAME));
        assert!(check_workflow("orchestrator.yml", "- name\n- on\n- jobs\n")
            .unwrap()
            .contains("mapping"));
    }

    #[test]
    fn test_check_workflow_rejects_broken_yaml() {
        let content = format!("name: x\non: [push\njobs:\n\t- {}: : :\n", SECRET_NAME);
        let reason = check_workflow("stage-plan.yml", &content).unwrap();
        assert!(reason.starts_with("invalid YAML"), "{}", reason);
    }

    #[test]
    fn test_check_workflow_ignores_nested_keys() {
        let content = "name: x\nworkflow:\n  on: push\n  jobs: {}\n";
        assert_eq!(check_workflow("orchestrator.yml", content).unwrap(), "missing on, jobs");
    }

    #[test]
    fn test_bundled_workflows_are_valid() {
        for spec in TemplateSet::bundled().workflow_specs(CatalogueVersion::LATEST) {
            let content = std::fs::read_to_string(&spec.source).unwrap();
            assert_eq!(check_workflow(&spec.name, &content), None, "{}", spec.name);
        }
    }

    #[tokio::test]
    async fn test_complete_installation_passes() {
        let repo = TempDir::new().unwrap();
        install_bundled(repo.path());
        let cp = MockControlPlane::new().with_secret(SECRET_NAME);

        let report = run(repo.path(), &cp, &TemplateSet::bundled()).await;

        assert!(report.passed(), "{:?}", report);
        assert_eq!(report.present_files.len(), 5);
        assert_eq!(report.missing_labels.len(), 12);
        assert_eq!(report.warnings(), 12);
        assert!(cp.mutating_calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_and_invalid_files_fail() {
        let repo = TempDir::new().unwrap();
        install_bundled(repo.path());
        let workflows = repo.path().join(WORKFLOWS_DIR);
        std::fs::remove_file(workflows.join("stage-plan.yml")).unwrap();
        std::fs::write(workflows.join("orchestrator.yml"), "name: broken\n").unwrap();
        std::fs::write(workflows.join("stage-develop.yml"), "name: x\non: [push\n").unwrap();
        let cp = MockControlPlane::new();

        let report = run(repo.path(), &cp, &TemplateSet::bundled()).await;

        assert!(!report.passed());
        assert_eq!(report.missing_files, vec!["stage-plan.yml".to_string()]);
        let invalid: Vec<&str> = report.invalid_files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(invalid, vec!["orchestrator.yml", "stage-develop.yml"]);
        assert!(!report.secret_configured);
    }

    #[tokio::test]
    async fn test_legacy_files_are_warnings() {
        let repo = TempDir::new().unwrap();
        install_bundled(repo.path());
        std::fs::write(repo.path().join(WORKFLOWS_DIR).join("stage-triage.yml"), "name: v1\n")
            .unwrap();
        let cp = MockControlPlane::new().with_secret(SECRET_NAME);

        let report = run(repo.path(), &cp, &TemplateSet::bundled()).await;

        assert!(report.passed());
        assert_eq!(report.legacy_files, vec!["stage-triage.yml".to_string()]);
        assert_eq!(report.warnings(), 13);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_unreadable_templates_fail() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let repo = TempDir::new().unwrap();
        install_bundled(repo.path());
        let templates = TempDir::new().unwrap();
        let agents = templates.path().join("agents");
        std::fs::create_dir_all(&agents).unwrap();
        std::fs::write(agents.join(OsStr::from_bytes(b"plan-\xff.md")), "").unwrap();
        let cp = MockControlPlane::new().with_secret(SECRET_NAME);

        let report = run(repo.path(), &cp, &TemplateSet::new(templates.path())).await;

        assert!(matches!(report.template_error, Some(CatalogueError::InvalidFileName(_))));
        assert!(!report.passed());
    }

    #[tokio::test]
    async fn test_preflight_failure_fails() {
        let repo = TempDir::new().unwrap();
        let cp = MockControlPlane::new().with_access_error(PreflightKind::GithubCliMissing);

        let report = run(repo.path(), &cp, &TemplateSet::bundled()).await;

        assert!(!report.passed());
        assert_eq!(
            report.preflight_error.map(|e| e.kind),
            Some(PreflightKind::GithubCliMissing)
        );
        assert!(report.missing_files.is_empty());
    }
}
