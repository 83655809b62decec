/// `load_config` module: loads the optional YAML config file and merges it
/// with command-line flags into the [`Settings`] a run uses.
///
/// Flags always win over file values; file values win over built-in
/// defaults. Secrets never live in the file: the password is prompted for
/// (or taken from the environment) by [`crate::auth`].
///
/// Accepted YAML:
///
/// ```yaml
/// root_url: https://api.github.com
/// username: wking
/// repository: wking/github-push-issues
/// template_root: https://example.com/templates/v1.tar.gz
/// strip_components: 1
/// milestone:
///   state: open
///   due_on: 2015-06-01
/// issue:
///   assignee: wking
///   labels: [checklist]
/// ```
use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use github_push_issues_core::entry::MilestoneState;
use github_push_issues_core::push::PushOptions;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{error, info};

use crate::cli::Cli;

pub const DEFAULT_ROOT_URL: &str = "https://api.github.com";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub root_url: Option<String>,
    pub username: Option<String>,
    pub repository: Option<String>,
    pub template_root: Option<String>,
    pub strip_components: Option<usize>,
    #[serde(default)]
    pub milestone: MilestoneSection,
    #[serde(default)]
    pub issue: IssueSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MilestoneSection {
    pub state: Option<MilestoneState>,
    pub due_on: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IssueSection {
    pub assignee: Option<String>,
    pub labels: Option<Vec<String>>,
}

/// Loads a static YAML config file (no secrets).
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<FileConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = fs::read_to_string(path_ref).map_err(|e| {
        error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
        anyhow::anyhow!("Failed to read config file {:?}: {}", path_ref, e)
    })?;

    let config: FileConfig = serde_yaml::from_str(&config_content).map_err(|e| {
        error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
        anyhow::anyhow!("Failed to parse config YAML {:?}: {e}", path_ref)
    })?;

    info!(config_path = ?path_ref, "Parsed config YAML successfully");
    Ok(config)
}

/// Everything a run needs, fully resolved before any network access.
#[derive(Debug, Clone)]
pub struct Settings {
    pub root_url: String,
    pub username: Option<String>,
    pub repository: String,
    pub template_root: String,
    pub strip_components: usize,
    pub options: PushOptions,
    pub dry_run: bool,
}

impl Settings {
    pub fn resolve(cli: &Cli, file: FileConfig) -> Result<Self> {
        let repository = match cli.repository.clone().or(file.repository) {
            Some(repository) => repository,
            None => bail!("no repository given (pass user/repo or set `repository` in the config)"),
        };
        if repository.split('/').count() != 2 || repository.split('/').any(str::is_empty) {
            bail!("repository must look like user/repo, got {repository:?}");
        }

        let template_root = match cli.template_root.clone().or(file.template_root) {
            Some(root) => root,
            None => bail!("no template root given (pass a path or URL, or set `template_root` in the config)"),
        };

        let due_on = match cli.due_on.clone().or(file.milestone.due_on) {
            Some(raw) => Some(parse_due_on(&raw)?),
            None => None,
        };
        let labels = if cli.labels.is_empty() {
            file.issue.labels
        } else {
            Some(cli.labels.clone())
        };

        let settings = Settings {
            root_url: cli
                .root_url
                .clone()
                .or(file.root_url)
                .unwrap_or_else(|| DEFAULT_ROOT_URL.to_string()),
            username: cli.username.clone().or(file.username),
            repository,
            template_root,
            strip_components: cli.strip_components.or(file.strip_components).unwrap_or(0),
            options: PushOptions {
                milestone_state: cli
                    .milestone_state
                    .or(file.milestone.state)
                    .unwrap_or_default(),
                due_on,
                assignee: cli.assignee.clone().or(file.issue.assignee),
                labels,
            },
            dry_run: cli.dry_run,
        };
        info!(
            root_url = %settings.root_url,
            repository = %settings.repository,
            template_root = %settings.template_root,
            dry_run = settings.dry_run,
            "Resolved settings"
        );
        Ok(settings)
    }
}

/// Accepts `YYYY-MM-DD` (midnight UTC) or a full RFC 3339 timestamp.
pub fn parse_due_on(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("invalid due date {raw:?} (expected YYYY-MM-DD or RFC 3339)"))
}
