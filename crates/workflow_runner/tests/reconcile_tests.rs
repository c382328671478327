//! End-to-end tests for inspect -> plan -> execute against in-memory fakes

use std::fs;
use std::path::Path;
use std::time::Duration;

use ghwf_workflow_catalogue::{
    CatalogueVersion, FileKind, FileSpec, LabelCatalogue, LabelCategory, LabelSpec, TemplateSet,
    AGENTS_DIR, BRANCH_PLACEHOLDER, WORKFLOWS_DIR,
};
use ghwf_workflow_runner::{
    compute_desired, execute, plan,
    test_utils::{MockControlPlane, MockInteraction, MockUI, MockVcs},
    ExecutionContext, InitOptions, InitOutcome, ObservedState, Operation, OperationCategory,
    OperationStatus, Plan, RunStatus, SetupController, SetupMode, Toggles, WorkflowError,
};
use tempfile::TempDir;

fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|e| e.file_name().to_string_lossy().to_string())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

async fn run_init(
    root: &Path,
    cp: &MockControlPlane,
    vcs: &MockVcs,
    templates: TemplateSet,
    options: InitOptions,
) -> Result<InitOutcome, WorkflowError> {
    let mut interaction = MockInteraction::new();
    let mut ui = MockUI::new();
    let mut controller = SetupController::new(root, cp, vcs, &mut interaction, &mut ui, templates)
        .with_verify_delay(Duration::ZERO);
    controller.init(&options).await
}

fn executed(outcome: InitOutcome) -> ghwf_workflow_runner::ExecutionResult {
    match outcome {
        InitOutcome::Executed(result) => result,
        InitOutcome::DryRun(_) => panic!("expected an executed run"),
    }
}

fn yes() -> InitOptions {
    InitOptions { yes: true, ..InitOptions::default() }
}

// ============================================================================
// Idempotence
// ============================================================================

#[tokio::test]
async fn test_fresh_init_then_rerun_converges() {
    let repo = TempDir::new().unwrap();
    let cp = MockControlPlane::new();
    let vcs = MockVcs::on_branch("main");

    let first = executed(run_init(repo.path(), &cp, &vcs, TemplateSet::bundled(), yes()).await.unwrap());
    assert_eq!(first.status, RunStatus::Succeeded);
    let files_after_first = file_names(&repo.path().join(WORKFLOWS_DIR));
    let agents_after_first = file_names(&repo.path().join(AGENTS_DIR));
    let labels_after_first = cp.label_names();

    // second run sees an installation and only refreshes files
    let second = executed(run_init(repo.path(), &cp, &vcs, TemplateSet::bundled(), yes()).await.unwrap());
    assert_eq!(second.status, RunStatus::Succeeded);
    assert!(second
        .records
        .iter()
        .all(|r| matches!(r.operation, Operation::CopyFile { .. })
            && r.status == OperationStatus::Updated));

    assert_eq!(file_names(&repo.path().join(WORKFLOWS_DIR)), files_after_first);
    assert_eq!(file_names(&repo.path().join(AGENTS_DIR)), agents_after_first);
    assert_eq!(cp.label_names(), labels_after_first);
    assert_eq!(files_after_first.len(), 5);
    assert_eq!(labels_after_first.len(), 12);
    assert_eq!(cp.collaborators().len(), 1);
}

#[tokio::test]
async fn test_same_fresh_plan_twice_changes_nothing_the_second_time() {
    let repo = TempDir::new().unwrap();
    let cp = MockControlPlane::new();
    let observed = ObservedState::default();
    let desired = compute_desired(
        SetupMode::Fresh,
        &TemplateSet::bundled(),
        Some(Toggles { install_app: false, configure_secret: false, ..Toggles::fresh_defaults() }),
        || false,
        None,
    )
    .unwrap();
    let plan = plan(&observed, &desired).unwrap();

    let mut snapshots = Vec::new();
    for _ in 0..2 {
        let mut interaction = MockInteraction::new();
        let mut ui = MockUI::new();
        let mut ctx = ExecutionContext::new(repo.path(), &cp, &mut interaction, &mut ui);
        let result = execute(&plan, &mut ctx).await;
        assert!(!result.is_aborted());

        let contents: Vec<String> = desired
            .file_specs
            .iter()
            .map(|spec| fs::read_to_string(spec.target(repo.path())).unwrap())
            .collect();
        let colors: Vec<Option<String>> =
            desired.label_catalogue.iter().map(|l| cp.label_color(&l.name)).collect();
        snapshots.push((contents, colors, result.label_tally()));
    }

    assert_eq!(snapshots[0].0, snapshots[1].0);
    assert_eq!(snapshots[0].1, snapshots[1].1);
    assert_eq!(snapshots[0].2.created, 12);
    assert_eq!(snapshots[1].2.updated, 12);
    assert_eq!(snapshots[1].2.created, 0);
}

// ============================================================================
// Migration
// ============================================================================

#[tokio::test]
async fn test_migration_removes_legacy_and_copies_new() {
    let repo = TempDir::new().unwrap();
    let templates = TempDir::new().unwrap();
    let workflows = repo.path().join(WORKFLOWS_DIR);
    fs::create_dir_all(&workflows).unwrap();
    for legacy in ["stage-triage.yml", "stage-spec.yml", "stage-architect.yml"] {
        fs::write(workflows.join(legacy), "name: legacy\n").unwrap();
    }

    let file_specs: Vec<FileSpec> = ["d.yml", "e.yml", "f.yml", "g.yml"]
        .iter()
        .map(|name| {
            let source = templates.path().join(name);
            fs::write(&source, "name: new\non: push\njobs: {}\n").unwrap();
            FileSpec {
                name: name.to_string(),
                kind: FileKind::Workflow,
                source,
                placeholder: Some(BRANCH_PLACEHOLDER.to_string()),
            }
        })
        .collect();

    let cp = MockControlPlane::new();
    let vcs = MockVcs::on_branch("main");
    let observed = ObservedState::inspect(repo.path(), &cp, &vcs).await;
    assert_eq!(observed.detected_version, Some(CatalogueVersion::V1));

    let mut desired = compute_desired(
        SetupMode::Update,
        &TemplateSet::new(templates.path()),
        None,
        || false,
        None,
    )
    .unwrap();
    desired.file_specs = file_specs;

    let plan = plan(&observed, &desired).unwrap();
    let removes = plan.iter().filter(|op| matches!(op, Operation::RemoveFile { .. })).count();
    let copies = plan.iter().filter(|op| matches!(op, Operation::CopyFile { .. })).count();
    assert_eq!(removes, 3);
    assert_eq!(copies, 4);

    let mut interaction = MockInteraction::new();
    let mut ui = MockUI::new();
    let mut ctx = ExecutionContext::new(repo.path(), &cp, &mut interaction, &mut ui);
    let result = execute(&plan, &mut ctx).await;

    assert_eq!(result.status, RunStatus::Succeeded);
    let after = ObservedState::scan_files(repo.path());
    assert!(after.legacy_files_present.is_empty());
    assert_eq!(
        file_names(&workflows),
        vec!["d.yml", "e.yml", "f.yml", "g.yml"]
    );
}

#[tokio::test]
async fn test_init_upgrades_v1_installation() {
    let repo = TempDir::new().unwrap();
    let workflows = repo.path().join(WORKFLOWS_DIR);
    fs::create_dir_all(&workflows).unwrap();
    for name in CatalogueVersion::V1.workflow_files() {
        fs::write(workflows.join(name), "name: v1\n").unwrap();
    }
    let cp = MockControlPlane::new();
    let vcs = MockVcs::on_branch("main");

    let result = executed(run_init(repo.path(), &cp, &vcs, TemplateSet::bundled(), yes()).await.unwrap());

    assert_eq!(result.status, RunStatus::Succeeded);
    let after = ObservedState::scan_files(repo.path());
    assert!(after.legacy_files_present.is_empty());
    assert_eq!(after.detected_version, Some(CatalogueVersion::V2));
    assert_eq!(after.installed_files.len(), 5);
    // update mode leaves the remote alone
    assert!(cp.mutating_calls().is_empty());
}

// ============================================================================
// Branch substitution
// ============================================================================

#[tokio::test]
async fn test_workflows_use_current_branch() {
    let repo = TempDir::new().unwrap();
    let cp = MockControlPlane::new();
    let vcs = MockVcs::on_branch("release/2.0");

    executed(run_init(repo.path(), &cp, &vcs, TemplateSet::bundled(), yes()).await.unwrap());

    for spec in TemplateSet::bundled().workflow_specs(CatalogueVersion::LATEST) {
        let content = fs::read_to_string(spec.target(repo.path())).unwrap();
        assert!(content.contains("base_branch: \"release/2.0\""), "{}", spec.name);
        assert_eq!(content.matches(BRANCH_PLACEHOLDER).count(), 0, "{}", spec.name);
    }
}

#[tokio::test]
async fn test_branch_option_overrides_detected_branch() {
    let repo = TempDir::new().unwrap();
    let cp = MockControlPlane::new();
    let vcs = MockVcs::on_branch("feature/x");
    let options = InitOptions { branch: Some("trunk".to_string()), ..yes() };

    executed(run_init(repo.path(), &cp, &vcs, TemplateSet::bundled(), options).await.unwrap());

    let orchestrator =
        fs::read_to_string(repo.path().join(WORKFLOWS_DIR).join("orchestrator.yml")).unwrap();
    assert!(orchestrator.contains("base_branch: \"trunk\""));
    assert!(!orchestrator.contains("feature/x"));
}

// ============================================================================
// Labels
// ============================================================================

#[tokio::test]
async fn test_upsert_existing_label_updates_color() {
    let cp = MockControlPlane::new().with_label("needs:plan", "abcdef");
    let mut interaction = MockInteraction::new();
    let mut ui = MockUI::new();
    let mut ctx = ExecutionContext::new("/nonexistent", &cp, &mut interaction, &mut ui);
    let plan = Plan::from(vec![Operation::UpsertLabel(LabelSpec::new(
        "needs:plan",
        "AI is creating the implementation plan for this issue",
        "123456",
        LabelCategory::Needs,
    ))]);

    let result = execute(&plan, &mut ctx).await;

    assert_eq!(result.records[0].status, OperationStatus::Updated);
    assert_eq!(cp.label_color("needs:plan").as_deref(), Some("123456"));
}

#[tokio::test]
async fn test_label_counts_sum_to_catalogue_size() {
    let catalogue = LabelCatalogue::for_version(CatalogueVersion::V1);
    let cp = MockControlPlane::new()
        .with_labels(["needs:triage", "review:spec"])
        .failing_label("error:develop")
        .failing_label("needs:triage");
    let mut interaction = MockInteraction::new();
    let mut ui = MockUI::new();
    let mut ctx = ExecutionContext::new("/nonexistent", &cp, &mut interaction, &mut ui);

    let setup = execute(
        &Plan::from(ghwf_workflow_runner::reconcile::plan_label_setup(&catalogue)),
        &mut ctx,
    )
    .await;
    let tally = setup.label_tally();
    assert_eq!(tally.created + tally.updated + tally.failed, catalogue.len());
    assert_eq!(tally.failed, 2);
    assert_eq!(setup.status, RunStatus::PartiallyWarned);

    let clean = execute(
        &Plan::from(ghwf_workflow_runner::reconcile::plan_label_cleanup(&catalogue)),
        &mut ctx,
    )
    .await;
    let tally = clean.label_tally();
    assert_eq!(tally.removed + tally.not_found + tally.failed, catalogue.len());
    assert_eq!(tally.removed, 14);
}

// ============================================================================
// Fatal short-circuit and dry run
// ============================================================================

fn templates_without(missing: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    let workflows = dir.path().join("workflows");
    fs::create_dir_all(&workflows).unwrap();
    for spec in TemplateSet::bundled().workflow_specs(CatalogueVersion::LATEST) {
        if spec.name != missing {
            fs::copy(&spec.source, workflows.join(&spec.name)).unwrap();
        }
    }
    dir
}

#[tokio::test]
async fn test_missing_template_aborts_before_any_change() {
    let repo = TempDir::new().unwrap();
    let templates = templates_without("stage-plan.yml");
    let cp = MockControlPlane::new();
    let vcs = MockVcs::on_branch("main");

    let err = run_init(
        repo.path(),
        &cp,
        &vcs,
        TemplateSet::new(templates.path()),
        yes(),
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        WorkflowError::Planning(ghwf_workflow_runner::PlanningError::MissingSource { ref name, .. })
            if name == "stage-plan.yml"
    ));
    assert!(cp.mutating_calls().is_empty());
    assert!(cp.collaborators().is_empty());
    assert!(!repo.path().join(".github").exists());
}

#[tokio::test]
async fn test_dry_run_is_pure() {
    let repo = TempDir::new().unwrap();
    let cp = MockControlPlane::new().with_label("needs:plan", "abcdef");
    let vcs = MockVcs::on_branch("main");
    let options = InitOptions { dry_run: true, ..yes() };

    let outcome = run_init(repo.path(), &cp, &vcs, TemplateSet::bundled(), options)
        .await
        .unwrap();

    let InitOutcome::DryRun(plan) = outcome else {
        panic!("expected a dry run");
    };
    assert!(!plan.is_empty());
    assert!(cp.mutating_calls().is_empty());
    assert_eq!(cp.label_color("needs:plan").as_deref(), Some("abcdef"));
    assert!(file_names(repo.path()).is_empty());
}

#[tokio::test]
async fn test_declined_app_install_stops_later_steps() {
    let repo = TempDir::new().unwrap();
    let cp = MockControlPlane::new()
        .with_installation([ghwf_workflow_runner::InstallationStatus::Absent]);
    let vcs = MockVcs::on_branch("main");
    // every toggle on, then "no" to the installation question
    let mut interaction =
        MockInteraction::new().answering([true, true, true, true, true, true, true, false]);
    let mut ui = MockUI::new();
    let mut controller = SetupController::new(
        repo.path(),
        &cp,
        &vcs,
        &mut interaction,
        &mut ui,
        TemplateSet::bundled(),
    )
    .with_verify_delay(Duration::ZERO);

    let result = executed(controller.init(&InitOptions::default()).await.unwrap());

    assert!(matches!(result.status, RunStatus::Aborted { step: 1, .. }));
    assert_eq!(result.records.len(), 1);
    assert!(cp.mutating_calls().is_empty());
    assert!(!repo.path().join(WORKFLOWS_DIR).exists());
}

// ============================================================================
// Update-mode toggle forcing
// ============================================================================

#[test]
fn test_update_mode_forces_toggles() {
    let inputs = [
        None,
        Some(Toggles::fresh_defaults()),
        Some(Toggles {
            install_app: true,
            copy_files: false,
            copy_agents: false,
            setup_labels: true,
            add_collaborator: true,
            configure_secret: true,
            create_sample_issue: true,
        }),
    ];

    for input in inputs {
        let desired =
            compute_desired(SetupMode::Update, &TemplateSet::bundled(), input, || true, None)
                .unwrap();
        assert_eq!(desired.toggles, Toggles::update_only());
    }
}

#[tokio::test]
async fn test_update_mode_asks_nothing() {
    let repo = TempDir::new().unwrap();
    let workflows = repo.path().join(WORKFLOWS_DIR);
    fs::create_dir_all(&workflows).unwrap();
    fs::write(workflows.join("orchestrator.yml"), "name: old\n").unwrap();
    let cp = MockControlPlane::new();
    let vcs = MockVcs::on_branch("main");
    let mut interaction = MockInteraction::new().answering([true; 7]);
    let mut ui = MockUI::new();
    let mut controller = SetupController::new(
        repo.path(),
        &cp,
        &vcs,
        &mut interaction,
        &mut ui,
        TemplateSet::bundled(),
    );

    let result = executed(controller.init(&InitOptions::default()).await.unwrap());

    assert!(result.records.iter().all(|r| {
        matches!(
            r.operation.category(),
            OperationCategory::Files | OperationCategory::Agents
        )
    }));
    assert!(interaction.prompts().is_empty());
}
