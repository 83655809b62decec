//! Entry model: milestones and issues, their creation payloads, and the
//! remote number recorded once the tracker has created them.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::error::PushError;

/// Milestone state as understood by the tracker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MilestoneState {
    #[default]
    Open,
    Closed,
}

impl MilestoneState {
    pub fn as_str(&self) -> &'static str {
        match self {
            MilestoneState::Open => "open",
            MilestoneState::Closed => "closed",
        }
    }
}

impl std::str::FromStr for MilestoneState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(MilestoneState::Open),
            "closed" => Ok(MilestoneState::Closed),
            other => Err(format!("unknown milestone state {other:?} (expected open or closed)")),
        }
    }
}

/// The tracker collection an entry is created in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Milestones,
    Issues,
}

impl Collection {
    /// Path segment under `repos/{repository}/`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Milestones => "milestones",
            Collection::Issues => "issues",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Milestone {
    pub title: String,
    pub body: Option<String>,
    pub state: MilestoneState,
    pub due_on: Option<DateTime<Utc>>,
    number: Option<u64>,
}

impl Milestone {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: None,
            state: MilestoneState::Open,
            due_on: None,
            number: None,
        }
    }

    pub fn number(&self) -> Option<u64> {
        self.number
    }

    /// JSON object to POST to the milestones collection.
    pub fn creation_payload(&self) -> Value {
        let mut payload = Map::new();
        payload.insert("title".into(), json!(self.title));
        payload.insert("state".into(), json!(self.state.as_str()));
        if let Some(body) = non_empty(&self.body) {
            payload.insert("description".into(), json!(body));
        }
        if let Some(due_on) = self.due_on {
            payload.insert(
                "due_on".into(),
                json!(due_on.to_rfc3339_opts(SecondsFormat::Secs, true)),
            );
        }
        Value::Object(payload)
    }

    pub fn record_creation_result(&mut self, response: &Value) -> Result<u64, PushError> {
        record_number(&mut self.number, &self.title, response)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub title: String,
    pub body: Option<String>,
    /// Remote number of the owning milestone.
    pub milestone: Option<u64>,
    pub assignee: Option<String>,
    pub labels: Option<Vec<String>>,
    number: Option<u64>,
}

impl Issue {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: None,
            milestone: None,
            assignee: None,
            labels: None,
            number: None,
        }
    }

    pub fn number(&self) -> Option<u64> {
        self.number
    }

    /// JSON object to POST to the issues collection.
    pub fn creation_payload(&self) -> Value {
        let mut payload = Map::new();
        payload.insert("title".into(), json!(self.title));
        if let Some(body) = non_empty(&self.body) {
            payload.insert("body".into(), json!(body));
        }
        if let Some(milestone) = self.milestone {
            payload.insert("milestone".into(), json!(milestone));
        }
        if let Some(assignee) = &self.assignee {
            payload.insert("assignee".into(), json!(assignee));
        }
        if let Some(labels) = &self.labels {
            payload.insert("labels".into(), json!(labels));
        }
        Value::Object(payload)
    }

    pub fn record_creation_result(&mut self, response: &Value) -> Result<u64, PushError> {
        record_number(&mut self.number, &self.title, response)
    }
}

/// Either kind of entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Milestone(Milestone),
    Issue(Issue),
}

impl Entry {
    pub fn title(&self) -> &str {
        match self {
            Entry::Milestone(m) => &m.title,
            Entry::Issue(i) => &i.title,
        }
    }

    pub fn number(&self) -> Option<u64> {
        match self {
            Entry::Milestone(m) => m.number,
            Entry::Issue(i) => i.number,
        }
    }

    pub fn collection(&self) -> Collection {
        match self {
            Entry::Milestone(_) => Collection::Milestones,
            Entry::Issue(_) => Collection::Issues,
        }
    }

    /// Optional fields are omitted rather than sent as `null`.
    pub fn creation_payload(&self) -> Value {
        match self {
            Entry::Milestone(m) => m.creation_payload(),
            Entry::Issue(i) => i.creation_payload(),
        }
    }

    /// Read the assigned `number` from the tracker's response and store it.
    ///
    /// Fails if the response has no unsigned integer `number`, or if the
    /// entry was already recorded.
    pub fn record_creation_result(&mut self, response: &Value) -> Result<u64, PushError> {
        match self {
            Entry::Milestone(m) => m.record_creation_result(response),
            Entry::Issue(i) => i.record_creation_result(response),
        }
    }
}

fn record_number(slot: &mut Option<u64>, title: &str, response: &Value) -> Result<u64, PushError> {
    if let Some(existing) = slot {
        return Err(PushError::EntryState(format!(
            "{title:?} already recorded as number {existing}"
        )));
    }
    let number = response
        .get("number")
        .and_then(Value::as_u64)
        .ok_or_else(|| {
            PushError::Protocol(format!(
                "response for {title:?} has no numeric \"number\" field"
            ))
        })?;
    *slot = Some(number);
    Ok(number)
}

fn non_empty(body: &Option<String>) -> Option<&str> {
    body.as_deref().filter(|b| !b.is_empty())
}
