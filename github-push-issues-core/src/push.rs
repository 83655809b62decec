//! Push orchestration: walk → parse → resolve → create → record.
//!
//! For every directory group, in walker order:
//!   1. `README.md`, if present, becomes the group's milestone.
//!   2. Every other `*.md` file, in name order, becomes an issue attached to
//!      that milestone (or to none when the group has no `README.md`).
//!   3. Anything else is ignored.
//!
//! Each body is resolved against the entries created so far, immediately
//! before its own creation request. The run is strictly sequential and stops
//! at the first error; entries already created stay on the tracker.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::contract::Tracker;
use crate::entry::{Collection, Issue, Milestone, MilestoneState};
use crate::error::PushError;
use crate::reference::ReferenceContext;
use crate::template::{parse_template, ParsedTemplate};
use crate::walker::{TemplateEntry, TemplateWalker};

/// File that describes a group's milestone.
pub const MILESTONE_FILE: &str = "README.md";

const TEMPLATE_SUFFIX: &str = ".md";

/// Attributes applied to every entry created in a run.
#[derive(Debug, Clone, Default)]
pub struct PushOptions {
    pub milestone_state: MilestoneState,
    pub due_on: Option<DateTime<Utc>>,
    pub assignee: Option<String>,
    pub labels: Option<Vec<String>>,
}

#[derive(Debug, Default)]
pub struct PushReport {
    pub groups: Vec<GroupReport>,
}

impl PushReport {
    pub fn milestones_created(&self) -> usize {
        self.groups.iter().filter(|g| g.milestone.is_some()).count()
    }

    pub fn issues_created(&self) -> usize {
        self.groups.iter().map(|g| g.issues.len()).sum()
    }
}

#[derive(Debug)]
pub struct GroupReport {
    pub directory: String,
    pub milestone: Option<CreatedReport>,
    pub issues: Vec<CreatedReport>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedReport {
    pub path: String,
    pub title: String,
    pub number: u64,
}

/// Create every milestone and issue the walker yields.
pub async fn push<W, T>(
    walker: &mut W,
    tracker: &T,
    options: &PushOptions,
) -> Result<PushReport, PushError>
where
    W: TemplateWalker + ?Sized,
    T: Tracker + ?Sized,
{
    info!("[PUSH] Starting push");
    let mut context = ReferenceContext::new();
    let mut report = PushReport::default();

    while let Some(group) = walker.next_group()? {
        debug!(directory = %group.directory(), files = group.len(), "[PUSH] Processing group");
        let mut group_report = GroupReport {
            directory: group.directory().to_string(),
            milestone: None,
            issues: Vec::new(),
        };

        let mut milestone_number = None;
        if let Some(entry) = group.get(MILESTONE_FILE) {
            let path = entry.path().to_string();
            let parsed = read_template(entry)?;
            let mut milestone = Milestone::new(parsed.title.clone());
            milestone.body = resolve_body(&context, &path, &parsed)?;
            milestone.state = options.milestone_state;
            milestone.due_on = options.due_on;

            let response = tracker
                .create(Collection::Milestones, milestone.creation_payload())
                .await?;
            let number = milestone.record_creation_result(&response)?;
            info!(path = %path, number, title = %milestone.title, "[PUSH] Created milestone");

            group_report.milestone = Some(CreatedReport {
                path: path.clone(),
                title: milestone.title.clone(),
                number,
            });
            context.insert_milestone(&path, milestone)?;
            milestone_number = Some(number);
        }

        for name in group.file_names() {
            if name == MILESTONE_FILE || !name.ends_with(TEMPLATE_SUFFIX) {
                continue;
            }
            let Some(entry) = group.get(name) else {
                continue;
            };
            let path = entry.path().to_string();
            let parsed = read_template(entry)?;
            let mut issue = Issue::new(parsed.title.clone());
            issue.body = resolve_body(&context, &path, &parsed)?;
            issue.milestone = milestone_number;
            issue.assignee = options.assignee.clone();
            issue.labels = options.labels.clone();

            let response = tracker
                .create(Collection::Issues, issue.creation_payload())
                .await?;
            let number = issue.record_creation_result(&response)?;
            info!(path = %path, number, title = %issue.title, "[PUSH] Created issue");

            group_report.issues.push(CreatedReport {
                path: path.clone(),
                title: issue.title.clone(),
                number,
            });
            context.insert_issue(&path, issue)?;
        }

        if group_report.milestone.is_some() || !group_report.issues.is_empty() {
            report.groups.push(group_report);
        } else {
            debug!(directory = %group.directory(), "[PUSH] No templates in group");
        }
    }

    info!(
        milestones = report.milestones_created(),
        issues = report.issues_created(),
        "[PUSH] Push complete"
    );
    Ok(report)
}

/// Parse one template; the reader is closed before this returns.
fn read_template(entry: &TemplateEntry) -> Result<ParsedTemplate, PushError> {
    let template_error = |source| PushError::Template {
        path: entry.path().to_string(),
        source,
    };
    let parsed = {
        let reader = entry.open()?;
        parse_template(reader).map_err(template_error)?
    };
    if parsed.title.is_empty() {
        warn!(path = %entry.path(), "[PUSH] Template has an empty title");
    }
    Ok(parsed)
}

fn resolve_body(
    context: &ReferenceContext,
    path: &str,
    parsed: &ParsedTemplate,
) -> Result<Option<String>, PushError> {
    let body = context
        .resolve(&parsed.raw_body)
        .map_err(|source| PushError::Resolve {
            path: path.to_string(),
            source,
        })?;
    Ok(if body.is_empty() { None } else { Some(body) })
}
