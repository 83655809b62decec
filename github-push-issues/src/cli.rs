///
/// This module implements the CLI interface for github-push-issues: argument
/// parsing, settings resolution, credential acquisition and the final report.
///
/// All template walking, parsing and reference resolution lives in the
/// [`github-push-issues-core`] crate; this module only wires it to the GitHub
/// client (or the dry-run tracker) and to the terminal.
///
/// ## Order of operations
/// 1. Resolve settings from flags and the optional config file.
/// 2. Classify the template root; unsupported archive locators fail here,
///    before any prompt or network access.
/// 3. Acquire credentials (skipped with `--dry-run`).
/// 4. Open the walker (fetching remote archives) and push.
///
/// [`github-push-issues-core`]: ../../github-push-issues-core/
use crate::auth::Credentials;
use crate::dry_run::DryRunTracker;
use crate::github::GitHubTracker;
use crate::load_config::{load_config, FileConfig, Settings};
use anyhow::{Context, Result};
use clap::Parser;
use github_push_issues_core::contract::Tracker;
use github_push_issues_core::entry::MilestoneState;
use github_push_issues_core::push::{push, PushReport};
use github_push_issues_core::walker::{open_walker, TemplateRoot};
use std::io::Write;
use std::path::PathBuf;

const AFTER_HELP: &str = "\
The template directory structure is:

  .
  |-- milestone-1
  |   |-- README.md
  |   |-- issue-1.1.md
  |   ...
  |-- milestone-2
  |   |-- README.md
  |   ...

Each README.md becomes a milestone and every other *.md file in the same
directory becomes an issue attached to it. Files start with a title line
(optionally with Atx-style # markers), then a blank line, then the body.
Bodies may reference entries created earlier in the run:

  See #${milestone.milestone-1/README.md.number} and
  ${issue.milestone-1/issue-1.1.md.title}.

The template root may also be a .tar.gz or .zip archive, local or at an
http(s) URL.";

/// CLI for github-push-issues: create GitHub milestones and issues from templates.
#[derive(Parser, Debug)]
#[clap(
    name = "github-push-issues",
    version,
    about = "Create GitHub issues based on local templates",
    after_help = AFTER_HELP
)]
pub struct Cli {
    /// Repository to create entries in, as user/repo
    pub repository: Option<String>,

    /// Template directory, archive file, or archive URL (.tar.gz or .zip)
    pub template_root: Option<String>,

    /// Root URL of the GitHub API
    #[clap(long)]
    pub root_url: Option<String>,

    /// GitHub username (prompted for when absent)
    #[clap(short, long)]
    pub username: Option<String>,

    /// Path to a YAML config file
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Leading path segments to strip from archive members
    #[clap(long)]
    pub strip_components: Option<usize>,

    /// Label to add to every issue (repeatable)
    #[clap(long = "label")]
    pub labels: Vec<String>,

    /// User to assign every issue to
    #[clap(long)]
    pub assignee: Option<String>,

    /// State for created milestones (open or closed)
    #[clap(long)]
    pub milestone_state: Option<MilestoneState>,

    /// Due date for created milestones (YYYY-MM-DD or RFC 3339)
    #[clap(long)]
    pub due_on: Option<String>,

    /// Walk and resolve templates without contacting GitHub
    #[clap(long)]
    pub dry_run: bool,
}

/// Async CLI entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("github-push-issues starting");

    let file_config = match &cli.config {
        Some(path) => load_config(path)?,
        None => FileConfig::default(),
    };
    let settings = Settings::resolve(&cli, file_config)?;
    let root = TemplateRoot::parse(&settings.template_root)?;

    let tracker: Box<dyn Tracker> = if settings.dry_run {
        tracing::info!("Dry run: nothing will be created on GitHub");
        Box::new(DryRunTracker::new())
    } else {
        let credentials = Credentials::acquire(settings.username.clone())?;
        Box::new(GitHubTracker::new(
            &settings.root_url,
            &settings.repository,
            &credentials,
        )?)
    };

    let mut walker = open_walker(&root, settings.strip_components).await?;
    match push(walker.as_mut(), tracker.as_ref(), &settings.options).await {
        Ok(report) => {
            tracing::info!(command = "push", "Push complete");
            print_report(&report, settings.dry_run)?;
            Ok(())
        }
        Err(e) => {
            tracing::error!(command = "push", error = %e, "Push failed");
            Err(e).context(
                "push aborted; entries created before the failure remain on the tracker",
            )
        }
    }
}

fn print_report(report: &PushReport, dry_run: bool) -> Result<()> {
    let mut out = std::io::stdout().lock();
    let verb = if dry_run { "Would create" } else { "Created" };
    for group in &report.groups {
        if let Some(milestone) = &group.milestone {
            writeln!(
                out,
                "milestone #{} {} ({})",
                milestone.number, milestone.title, milestone.path
            )?;
        }
        for issue in &group.issues {
            writeln!(out, "  issue #{} {} ({})", issue.number, issue.title, issue.path)?;
        }
    }
    writeln!(
        out,
        "{verb} {} milestone(s) and {} issue(s).",
        report.milestones_created(),
        report.issues_created()
    )?;
    Ok(())
}
