//! # contract: the remote tracker seam
//!
//! The push orchestrator never talks HTTP itself. It hands each entry's
//! creation payload to a [`Tracker`], which performs one create request and
//! returns the decoded JSON response.
//!
//! ## Implementors
//! - The CLI crate's GitHub client (reqwest, Basic auth).
//! - The CLI crate's dry-run tracker, which assigns numbers locally.
//! - [`MockTracker`], generated by `mockall` for tests, exported under the
//!   default `test-export-mocks` feature so downstream crates can use it too.
//!
//! ## Contract
//! - `create` is called at most once per entry, strictly in walk order.
//! - The returned value must be the JSON object the tracker sent back; the
//!   entry model reads its `number` field.
//! - Any failure is fatal to the run; implementors must not retry.

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;
use serde_json::Value;

use crate::entry::Collection;
use crate::error::PushError;

/// A remote issue tracker that can create milestones and issues.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Tracker: Send + Sync {
    /// POST `payload` to `collection` and return the created entity as JSON.
    async fn create(&self, collection: Collection, payload: Value) -> Result<Value, PushError>;
}
