use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, CommandFactory, Parser, Subcommand};
use ghwf_config::Config;
use ghwf_workflow_catalogue::{CatalogueVersion, LabelCategory, TemplateSet, TEMPLATES_DIR_ENV};
use ghwf_workflow_runner::{
    validate, GhCli, GitCli, HeadlessUI, InitOptions, InitOutcome, LabelListing,
    LabelsAction, LabelsOutcome, NonInteractive, SetupController, UserInteraction,
    ValidationReport, WorkflowError,
};
use tracing_subscriber::EnvFilter;

mod terminal;

use terminal::TerminalInteraction;

/// Logging filter variable (EnvFilter syntax)
const LOG_ENV: &str = "GHWF_LOG";

#[derive(Parser)]
#[command(name = "ghwf", version, about = "Set up and upgrade AI issue workflows in a GitHub repository")]
struct Cli {
    /// Template directory (overrides GHWF_TEMPLATES_DIR and .ghwf.toml)
    #[arg(long, global = true)]
    templates: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Install or upgrade the workflow setup in the current repository
    Init {
        /// Accept the default choices without asking
        #[arg(long, short = 'y')]
        yes: bool,
        /// Show what would be done without changing anything
        #[arg(long)]
        dry_run: bool,
        /// Base branch for the workflows (default: current branch)
        #[arg(long)]
        branch: Option<String>,
    },
    /// Check the installation without changing anything
    Validate,
    /// Manage workflow labels
    Labels(LabelsArgs),
}

#[derive(Args)]
struct LabelsArgs {
    /// Create or update all labels
    #[arg(long, conflicts_with_all = ["list", "clean"])]
    setup: bool,
    /// Show which labels exist (default)
    #[arg(long, conflicts_with = "clean")]
    list: bool,
    /// Delete all labels
    #[arg(long)]
    clean: bool,
    /// Use the label set of the previous workflow version
    #[arg(long)]
    legacy: bool,
}

impl LabelsArgs {
    fn action(&self) -> LabelsAction {
        if self.setup {
            LabelsAction::Setup
        } else if self.clean {
            LabelsAction::Clean
        } else {
            LabelsAction::List
        }
    }

    fn version(&self) -> CatalogueVersion {
        if self.legacy {
            CatalogueVersion::V1
        } else {
            CatalogueVersion::LATEST
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();
}

/// `--templates`, then the environment, then `.ghwf.toml`, then the bundled set.
fn resolve_templates(flag: Option<PathBuf>, config: &Config) -> TemplateSet {
    flag.or_else(|| std::env::var_os(TEMPLATES_DIR_ENV).map(PathBuf::from))
        .or_else(|| config.templates.dir.clone())
        .map(TemplateSet::new)
        .unwrap_or_else(TemplateSet::bundled)
}

fn interaction() -> Box<dyn UserInteraction> {
    if std::io::stdin().is_terminal() {
        Box::new(TerminalInteraction::new())
    } else {
        Box::new(NonInteractive)
    }
}

fn report_error(e: &WorkflowError) {
    eprintln!("Error: {}", e);
    if let Some(hint) = e.hint() {
        eprintln!("Hint: {}", hint);
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<ExitCode> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version end up here as well
            let failed = e.use_stderr();
            e.print()?;
            return Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS });
        }
    };

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    init_logging();

    let root = PathBuf::from(".");
    let config = Config::load_from_dir(&root)?;
    let templates = resolve_templates(cli.templates, &config);
    tracing::debug!(templates = %templates.root().display(), gh = %config.gh.bin, "resolved configuration");

    let gh = GhCli::new(config.gh.bin.clone());
    let git = GitCli;
    let mut interaction = interaction();
    let mut ui = HeadlessUI;

    match command {
        Commands::Init { yes, dry_run, branch } => {
            let mut controller =
                SetupController::new(&root, &gh, &git, &mut *interaction, &mut ui, templates);
            let options = InitOptions { yes, dry_run, branch };

            match controller.init(&options).await {
                Ok(InitOutcome::DryRun(_)) => Ok(ExitCode::SUCCESS),
                Ok(InitOutcome::Executed(result)) if result.is_aborted() => Ok(ExitCode::FAILURE),
                Ok(InitOutcome::Executed(_)) => Ok(ExitCode::SUCCESS),
                Err(e) => {
                    report_error(&e);
                    Ok(ExitCode::FAILURE)
                }
            }
        }

        Commands::Validate => {
            let report = validate(&root, &gh, &git, &templates).await;
            print_report(&report);
            Ok(if report.passed() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }

        Commands::Labels(args) => {
            let version = args.version();
            let mut controller =
                SetupController::new(&root, &gh, &git, &mut *interaction, &mut ui, templates);

            match controller.labels(args.action(), version).await {
                Ok(LabelsOutcome::Listed(listing)) => {
                    print_listing(version, &listing);
                    Ok(ExitCode::SUCCESS)
                }
                Ok(LabelsOutcome::Executed(result)) if result.is_aborted() => Ok(ExitCode::FAILURE),
                Ok(LabelsOutcome::Executed(_)) => Ok(ExitCode::SUCCESS),
                Err(e) => {
                    report_error(&e);
                    Ok(ExitCode::FAILURE)
                }
            }
        }
    }
}

fn print_listing(version: CatalogueVersion, listing: &[LabelListing]) {
    let present = listing.iter().filter(|l| l.present).count();
    println!("Workflow labels ({}): {}/{} present", version, present, listing.len());

    for category in LabelCategory::ALL {
        println!("\n{}", category.title());
        for entry in listing.iter().filter(|l| l.spec.category == category) {
            println!(
                "  [{}] {:<26} #{}  {}",
                if entry.present { "x" } else { " " },
                entry.spec.name,
                entry.spec.color,
                entry.spec.description
            );
        }
    }
}

fn print_report(report: &ValidationReport) {
    if let Some(e) = &report.preflight_error {
        eprintln!("Error: {}", e);
        eprintln!("Hint: {}", e.hint());
        println!("\nValidation failed.");
        return;
    }
    if let Some(e) = &report.template_error {
        eprintln!("Error: Template error: {}", e);
        eprintln!("Hint: Check the templates directory (--templates or GHWF_TEMPLATES_DIR)");
        println!("\nValidation failed.");
        return;
    }

    println!("Workflow files:");
    for name in &report.present_files {
        println!("  ok       {}", name);
    }
    for name in &report.missing_files {
        println!("  missing  {}", name);
    }
    for invalid in &report.invalid_files {
        println!("  invalid  {} ({})", invalid.name, invalid.reason);
    }
    for name in &report.legacy_files {
        println!("  legacy   {} (removed by: ghwf init)", name);
    }

    if !report.present_agents.is_empty() || !report.missing_agents.is_empty() {
        println!("\nAgent files:");
        for name in &report.present_agents {
            println!("  ok       {}", name);
        }
        for name in &report.missing_agents {
            println!("  missing  {}", name);
        }
    }

    println!(
        "\nLabels: {}/{} present",
        report.existing_labels.len(),
        report.total_labels
    );
    for name in &report.missing_labels {
        println!("  missing  {}", name);
    }
    if !report.missing_labels.is_empty() {
        println!("  Run: ghwf labels --setup");
    }

    println!(
        "\nSecret: {}",
        if report.secret_configured { "configured" } else { "not configured (warning)" }
    );

    if report.passed() {
        println!("\nValidation passed with {} warning(s).", report.warnings());
    } else {
        println!("\nValidation failed. Run: ghwf init");
    }
}

