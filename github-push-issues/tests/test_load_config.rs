use clap::Parser;
use github_push_issues::auth::{Credentials, PASSWORD_ENV};
use github_push_issues::load_config::{load_config, FileConfig, Settings, DEFAULT_ROOT_URL};
use github_push_issues::Cli;
use github_push_issues_core::entry::MilestoneState;
use serial_test::serial;
use std::env;
use std::fs::write;
use tempfile::NamedTempFile;

fn cli(args: &[&str]) -> Cli {
    Cli::parse_from(std::iter::once("github-push-issues").chain(args.iter().copied()))
}

fn config_file(yaml: &str) -> NamedTempFile {
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), yaml).unwrap();
    config_file
}

/// A full config file populates every section.
#[test]
fn test_load_config_success_all_sections() {
    let config_file = config_file(
        r#"
root_url: https://github.example.com/api/v3
username: wking
repository: wking/github-push-issues
template_root: https://example.com/templates/v1.tar.gz
strip_components: 1
milestone:
  state: closed
  due_on: "2015-06-01"
issue:
  assignee: wking
  labels: [checklist, help wanted]
"#,
    );

    let config = load_config(config_file.path()).expect("Config should load");

    assert_eq!(config.root_url.as_deref(), Some("https://github.example.com/api/v3"));
    assert_eq!(config.username.as_deref(), Some("wking"));
    assert_eq!(config.repository.as_deref(), Some("wking/github-push-issues"));
    assert_eq!(config.strip_components, Some(1));
    assert_eq!(config.milestone.state, Some(MilestoneState::Closed));
    assert_eq!(config.milestone.due_on.as_deref(), Some("2015-06-01"));
    assert_eq!(config.issue.assignee.as_deref(), Some("wking"));
    assert_eq!(
        config.issue.labels,
        Some(vec!["checklist".to_string(), "help wanted".to_string()])
    );
}

/// Sections are optional.
#[test]
fn test_load_config_minimal() {
    let config_file = config_file("repository: wking/test\n");
    let config = load_config(config_file.path()).expect("Config should load");
    assert_eq!(config.repository.as_deref(), Some("wking/test"));
    assert!(config.milestone.state.is_none());
    assert!(config.issue.labels.is_none());
}

#[test]
fn test_load_config_rejects_unknown_fields() {
    let config_file = config_file("repository: wking/test\npassword: hunter2\n");
    let err = load_config(config_file.path()).unwrap_err();
    assert!(err.to_string().contains("YAML"), "got: {err}");
}

#[test]
fn test_load_config_errors_for_invalid_file() {
    let config_file = config_file("not-yaml: [:::");
    let err = load_config(config_file.path()).unwrap_err();
    let msg = err.to_string();
    assert!(
        msg.contains("parse") || msg.contains("YAML"),
        "Parse error expected, got: {msg}"
    );
}

#[test]
fn test_load_config_errors_for_missing_file() {
    let err = load_config("/nonexistent/github-push-issues.yaml").unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}

#[test]
fn test_settings_flags_override_file() {
    let file: FileConfig = serde_yaml::from_str(
        r#"
root_url: https://github.example.com/api/v3
repository: wking/from-file
template_root: ./file-templates
milestone:
  state: closed
issue:
  assignee: file-user
  labels: [from-file]
"#,
    )
    .unwrap();
    let cli = cli(&[
        "--label",
        "a",
        "--label",
        "b",
        "--milestone-state",
        "open",
        "--due-on",
        "2015-06-01",
        "wking/from-flags",
    ]);

    let settings = Settings::resolve(&cli, file).expect("settings should resolve");

    assert_eq!(settings.root_url, "https://github.example.com/api/v3");
    assert_eq!(settings.repository, "wking/from-flags");
    assert_eq!(settings.template_root, "./file-templates");
    assert_eq!(settings.options.milestone_state, MilestoneState::Open);
    assert_eq!(settings.options.assignee.as_deref(), Some("file-user"));
    assert_eq!(
        settings.options.labels,
        Some(vec!["a".to_string(), "b".to_string()])
    );
    assert_eq!(
        settings.options.due_on.map(|d| d.to_rfc3339()),
        Some("2015-06-01T00:00:00+00:00".to_string())
    );
    assert!(!settings.dry_run);
}

#[test]
fn test_settings_defaults() {
    let settings = Settings::resolve(&cli(&["wking/test", "templates"]), FileConfig::default())
        .expect("settings should resolve");
    assert_eq!(settings.root_url, DEFAULT_ROOT_URL);
    assert_eq!(settings.strip_components, 0);
    assert_eq!(settings.options.milestone_state, MilestoneState::Open);
    assert!(settings.options.labels.is_none());
    assert!(settings.username.is_none());
}

#[test]
fn test_settings_require_repository_and_root() {
    let err = Settings::resolve(&cli(&[]), FileConfig::default()).unwrap_err();
    assert!(err.to_string().contains("no repository"));

    let err = Settings::resolve(&cli(&["wking/test"]), FileConfig::default()).unwrap_err();
    assert!(err.to_string().contains("no template root"));

    for bad in ["wking", "wking/", "/test", "a/b/c"] {
        let err = Settings::resolve(&cli(&[bad, "templates"]), FileConfig::default()).unwrap_err();
        assert!(err.to_string().contains("user/repo"), "{bad}: {err}");
    }
}

#[test]
fn test_settings_reject_bad_due_date() {
    let err = Settings::resolve(
        &cli(&["--due-on", "soon", "wking/test", "templates"]),
        FileConfig::default(),
    )
    .unwrap_err();
    assert!(err.to_string().contains("invalid due date"));
}

#[test]
#[serial]
fn test_password_taken_from_environment() {
    env::set_var(PASSWORD_ENV, "secret");
    let credentials = Credentials::acquire(Some("wking".to_string()));
    env::remove_var(PASSWORD_ENV);

    let credentials = credentials.expect("credentials should not prompt");
    assert_eq!(credentials.username(), "wking");
    assert_eq!(credentials.basic_auth_header(), "Basic d2tpbmc6c2VjcmV0");
}
