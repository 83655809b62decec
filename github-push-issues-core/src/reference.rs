//! Reference context and the `${namespace.path.attribute}` placeholder language.
//!
//! Template bodies may refer to entries created earlier in the same run:
//!
//! ```text
//! See also #${milestone.joel/README.md.number} and ${issue.joel/source-control.md.title}.
//! ```
//!
//! `namespace` is `milestone` or `issue`, `attribute` is `number` or `title`,
//! and the path is everything between the first and last `.` inside the
//! braces. `$${` escapes a literal `${`.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::entry::{Issue, Milestone};
use crate::error::{PushError, ResolveError};

/// Already-created entries, keyed by template path.
///
/// Append-only: an entry is recorded once, after creation, and never replaced.
#[derive(Debug, Default)]
pub struct ReferenceContext {
    milestones: BTreeMap<String, Milestone>,
    issues: BTreeMap<String, Issue>,
}

impl ReferenceContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_milestone(&mut self, path: &str, milestone: Milestone) -> Result<(), PushError> {
        check_insert(path, milestone.number(), self.milestones.contains_key(path))?;
        self.milestones.insert(path.to_string(), milestone);
        Ok(())
    }

    pub fn insert_issue(&mut self, path: &str, issue: Issue) -> Result<(), PushError> {
        check_insert(path, issue.number(), self.issues.contains_key(path))?;
        self.issues.insert(path.to_string(), issue);
        Ok(())
    }

    /// Substitute every placeholder in `raw_body` against the current context.
    pub fn resolve(&self, raw_body: &str) -> Result<String, ResolveError> {
        let mut error = None;
        let resolved = placeholder_regex().replace_all(raw_body, |caps: &Captures| {
            let Some(inner) = caps.get(1) else {
                return "${".to_string();
            };
            match self.lookup(inner.as_str()) {
                Ok(value) => value,
                Err(e) => {
                    error.get_or_insert(e);
                    String::new()
                }
            }
        });
        match error {
            Some(e) => Err(e),
            None => Ok(resolved.into_owned()),
        }
    }

    fn lookup(&self, placeholder: &str) -> Result<String, ResolveError> {
        let (namespace, rest) = placeholder
            .split_once('.')
            .ok_or_else(|| ResolveError::Malformed(placeholder.to_string()))?;
        let (path, attribute) = rest
            .rsplit_once('.')
            .filter(|(path, _)| !path.is_empty())
            .ok_or_else(|| ResolveError::Malformed(placeholder.to_string()))?;

        let unknown = || ResolveError::UnknownReference {
            namespace: namespace.to_string(),
            path: path.to_string(),
        };
        let (number, title) = match namespace {
            "milestone" => {
                let m = self.milestones.get(path).ok_or_else(unknown)?;
                (m.number(), m.title.as_str())
            }
            "issue" => {
                let i = self.issues.get(path).ok_or_else(unknown)?;
                (i.number(), i.title.as_str())
            }
            other => {
                return Err(ResolveError::UnknownNamespace {
                    namespace: other.to_string(),
                    placeholder: placeholder.to_string(),
                })
            }
        };

        match attribute {
            // Recorded entries always carry a number.
            "number" => number.map(|n| n.to_string()).ok_or_else(unknown),
            "title" => Ok(title.to_string()),
            other => Err(ResolveError::UnknownAttribute {
                attribute: other.to_string(),
                placeholder: placeholder.to_string(),
            }),
        }
    }
}

fn check_insert(path: &str, number: Option<u64>, exists: bool) -> Result<(), PushError> {
    if number.is_none() {
        return Err(PushError::EntryState(format!(
            "cannot record {path} before it has been created"
        )));
    }
    if exists {
        return Err(PushError::EntryState(format!("{path} was already recorded")));
    }
    Ok(())
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\$\{|\$\{([^}]*)\}").expect("placeholder regex is valid"))
}
