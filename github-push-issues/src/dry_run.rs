//! Offline tracker for `--dry-run`: numbers entries locally and logs what
//! would have been sent.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use github_push_issues_core::contract::Tracker;
use github_push_issues_core::entry::Collection;
use github_push_issues_core::PushError;
use serde_json::{json, Value};

/// Assigns 1, 2, 3, … separately for milestones and issues, the way GitHub
/// numbers a fresh repository.
#[derive(Debug, Default)]
pub struct DryRunTracker {
    milestones: AtomicU64,
    issues: AtomicU64,
}

impl DryRunTracker {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Tracker for DryRunTracker {
    async fn create(&self, collection: Collection, payload: Value) -> Result<Value, PushError> {
        let counter = match collection {
            Collection::Milestones => &self.milestones,
            Collection::Issues => &self.issues,
        };
        let number = counter.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!(
            collection = collection.as_str(),
            number,
            %payload,
            "[DRY RUN] Would create"
        );
        Ok(json!({ "number": number }))
    }
}
