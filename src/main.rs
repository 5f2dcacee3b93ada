//! gh-pr-triage CLI
//!
//! Command line tool (and GitHub Action entry point) keeping pull request
//! status labels in sync

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};

use gh_pr_triage::{
    config::resolve_label_table,
    context::{pull_request_from_env, pull_request_from_event_file, repository_from_env},
    logging::configure_logging,
    mapping::default_status_labels,
    sync::{TriageOutcome, TriageResult, TriageSyncer},
    Error, Result, StatusLabelMap, TriageConfig,
};

/// gh-pr-triage CLI
///
/// Keeps pull request status labels in sync with review and merge state
#[derive(Parser)]
#[command(
    name = "gh-pr-triage",
    version,
    about = "Keeps pull request status labels in sync with review and merge state",
    long_about = "Classifies a pull request from its reviews, pending review requests and \
    mergeability, then adds and removes the matching status labels. Labels outside the \
    status table are never touched."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// GitHub access token
    #[arg(short = 't', long, global = true)]
    access_token: Option<String>,

    /// Target repository (owner/repo format)
    #[arg(short = 'r', long, global = true)]
    repository: Option<String>,

    /// Pull request number (read from the event payload if omitted)
    #[arg(short = 'p', long, global = true)]
    pull_request: Option<u64>,

    /// Event payload file (defaults to GITHUB_EVENT_PATH)
    #[arg(long, global = true)]
    event_path: Option<PathBuf>,

    /// Status label table path (JSON/YAML)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Dry run mode (don't make actual changes)
    #[arg(long, global = true)]
    dry_run: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Triage a pull request and update its labels
    Sync,

    /// Show the label changes without applying them
    Preview,

    /// Output the default status label table
    Init {
        /// Output format
        #[arg(long, default_value = "yaml", value_parser = ["json", "yaml"])]
        format: String,

        /// Output file path
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },

    /// Display the status label table in effect
    Table,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = configure_logging(cli.verbose) {
        eprintln!("{} {}", "!".yellow(), e);
    }

    match cli.command {
        Some(Commands::Init { ref format, ref output }) => run_init(format, output.as_deref()),
        Some(Commands::Table) => {
            let labels = load_label_table(cli.config.as_deref())?;
            display_label_table(&labels);
            Ok(())
        }
        Some(Commands::Preview) => {
            let config = build_config(&cli, true)?;
            run_triage(config, cli.verbose).await
        }
        Some(Commands::Sync) | None => {
            let config = build_config(&cli, cli.dry_run)?;
            run_triage(config, cli.verbose).await
        }
    }
}

/// Assemble and validate the run configuration
fn build_config(cli: &Cli, dry_run: bool) -> Result<TriageConfig> {
    let config = TriageConfig {
        access_token: get_access_token(cli.access_token.clone())?,
        repository: require_repository(cli.repository.clone())?,
        pull_request: resolve_pull_request(cli.pull_request, cli.event_path.as_deref())?,
        dry_run,
        labels: Some(load_label_table(cli.config.as_deref())?),
    };

    config.validate()?;
    Ok(config)
}

/// Execute triage
async fn run_triage(config: TriageConfig, verbose: bool) -> Result<()> {
    if verbose {
        println!(
            "{} Triaging repository: {}",
            "•".blue(),
            config.repository.cyan()
        );

        if config.dry_run {
            println!(
                "{} Running in dry-run mode (no changes will be made)",
                "!".yellow()
            );
        }
    }

    let syncer = TriageSyncer::from_config(&config)?;
    let result = match syncer.triage(config.pull_request).await? {
        TriageOutcome::Skipped(reason) => {
            println!("{} Nothing to do: {}", "✓".green(), reason);
            return Ok(());
        }
        TriageOutcome::Synced(result) => result,
    };

    display_triage_result(&result, verbose);

    if !result.is_success() {
        eprintln!("\n{} Errors occurred:", "✗".red());
        for error in &result.errors {
            eprintln!("  {}", error.red());
        }
        std::process::exit(1);
    }

    Ok(())
}

/// Execute init command
fn run_init(format: &str, output: Option<&Path>) -> Result<()> {
    let labels: std::collections::BTreeMap<_, _> = default_status_labels().into_iter().collect();

    let content = match format {
        "json" => serde_json::to_string_pretty(&labels)?,
        "yaml" => serde_yaml::to_string(&labels)?,
        _ => return Err(Error::config_validation("Unsupported format")),
    };

    if let Some(output_path) = output {
        std::fs::write(output_path, content)?;
        println!(
            "{} Default status label table written to: {}",
            "✓".green(),
            output_path.display().to_string().cyan()
        );
    } else {
        println!("{}", content);
    }

    Ok(())
}

/// Display a status label table
fn display_label_table(labels: &StatusLabelMap) {
    println!(
        "{:<20} {:<30} {:<8}",
        "Status".cyan(),
        "Label".cyan(),
        "Color".cyan()
    );
    println!("{}", "─".repeat(60));

    for (status, label) in labels.iter() {
        println!(
            "{:<20} {:<30} {:<8}",
            status.as_str(),
            label.name,
            label.color.as_deref().unwrap_or("(none)")
        );
    }

    if labels.is_empty() {
        println!("{}", "(no status is mapped to a label)".dimmed());
    }
}

/// Display triage results
fn display_triage_result(result: &TriageResult, verbose: bool) {
    let statuses = result
        .statuses
        .iter()
        .map(|status| status.as_str())
        .collect::<Vec<_>>();

    println!(
        "\n{} Pull request #{}: {}",
        "•".blue(),
        result.pull_request,
        if statuses.is_empty() {
            "no status".dimmed().to_string()
        } else {
            statuses.join(", ").cyan().to_string()
        }
    );

    if !result.has_changes() {
        println!("{} No label changes required", "✓".green());
        return;
    }

    let (added, removed) = listed_changes(result);
    if result.dry_run {
        println!("{} Label preview (dry-run mode):", "📋".blue());
    } else if added.is_empty() && removed.is_empty() {
        println!("{} No labels could be updated", "✗".red());
    } else {
        println!("{} Labels updated:", "✓".green());
    }

    for name in &added {
        println!("  {} {}", "+".green(), name.green());
    }
    for name in &removed {
        println!("  {} {}", "-".red(), name.red());
    }

    if verbose && !result.created.is_empty() {
        println!("\n{} Created repository labels:", "📋".blue());
        for name in &result.created {
            println!("  {}", name.cyan());
        }
    }
}

/// Label names to list: the plan for a dry run, what was applied otherwise
fn listed_changes(result: &TriageResult) -> (Vec<String>, Vec<String>) {
    if result.dry_run {
        (result.plan.names_to_add(), result.plan.names_to_remove())
    } else {
        (result.added.clone(), result.removed.clone())
    }
}

/// Require a repository argument
fn require_repository(repo: Option<String>) -> Result<String> {
    repo.or_else(repository_from_env).ok_or_else(|| {
        Error::config_validation(
            "Repository is required. Use -r/--repository or set GITHUB_REPOSITORY",
        )
    })
}

/// Get access token
fn get_access_token(arg_token: Option<String>) -> Result<String> {
    arg_token
        .or_else(|| std::env::var("GITHUB_TOKEN").ok())
        .or_else(|| std::env::var("INPUT_GITHUB_TOKEN").ok())
        .filter(|token| !token.trim().is_empty())
        .ok_or_else(|| Error::config_validation(
            "GitHub access token is required. Set via --access-token, GITHUB_TOKEN or INPUT_GITHUB_TOKEN"
        ))
}

/// Resolve the pull request to triage
fn resolve_pull_request(arg: Option<u64>, event_path: Option<&Path>) -> Result<Option<u64>> {
    match (arg, event_path) {
        (Some(number), _) => Ok(Some(number)),
        (None, Some(path)) => pull_request_from_event_file(path),
        (None, None) => pull_request_from_env(),
    }
}

/// Load the status label table
fn load_label_table(config_path: Option<&Path>) -> Result<StatusLabelMap> {
    let cwd = std::env::current_dir()?;
    resolve_label_table(config_path, &cwd)
}
