#![doc = "GitHub implementation of the core Tracker trait: one POST per created milestone or issue."]
//
//! # GitHub client
//!
//! [`GitHubTracker`] creates entries under
//! `{root_url}/repos/{repository}/milestones` and `.../issues`.
//!
//! - Every request carries the same precomputed `Authorization: Basic ...`
//!   header and a JSON body.
//! - A non-success status is a transport error.
//! - The response must declare a JSON content type; its body is decoded with
//!   the declared charset (UTF-8 when none is given) and parsed as JSON.
//! - Nothing is retried.

use async_trait::async_trait;
use github_push_issues_core::contract::Tracker;
use github_push_issues_core::entry::Collection;
use github_push_issues_core::PushError;
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;

use crate::auth::Credentials;

const USER_AGENT: &str = concat!("github-push-issues/", env!("CARGO_PKG_VERSION"));

pub struct GitHubTracker {
    client: reqwest::Client,
    root_url: String,
    repository: String,
    authorization: HeaderValue,
}

impl GitHubTracker {
    pub fn new(
        root_url: &str,
        repository: &str,
        credentials: &Credentials,
    ) -> Result<Self, PushError> {
        let mut authorization = HeaderValue::from_str(&credentials.basic_auth_header())
            .map_err(|e| PushError::Configuration {
                locator: root_url.to_string(),
                reason: format!("credentials cannot be sent as a header: {e}"),
            })?;
        authorization.set_sensitive(true);

        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        tracing::info!(
            root_url = %root_url,
            repository = %repository,
            username = %credentials.username(),
            "Initialized GitHub client"
        );
        Ok(Self {
            client,
            root_url: root_url.trim_end_matches('/').to_string(),
            repository: repository.to_string(),
            authorization,
        })
    }

    pub fn endpoint(&self, collection: Collection) -> String {
        format!(
            "{}/repos/{}/{}",
            self.root_url,
            self.repository,
            collection.as_str()
        )
    }
}

#[async_trait]
impl Tracker for GitHubTracker {
    async fn create(&self, collection: Collection, payload: Value) -> Result<Value, PushError> {
        let url = self.endpoint(collection);
        tracing::debug!(url = %url, %payload, "POST creation request");

        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, self.authorization.clone())
            .header(ACCEPT, "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, url = %url, "Creation request failed");
                PushError::Transport(format!("POST {url} failed: {e}"))
            })?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let text = response.text_with_charset("utf-8").await?;

        if !status.is_success() {
            tracing::error!(status = %status, url = %url, "Tracker returned error. Response body: {text}");
            return Err(PushError::Transport(format!(
                "POST {url} returned {status}: {text}"
            )));
        }
        decode_created(content_type.as_deref(), &text)
    }
}

/// Check the declared content type and parse the (already charset-decoded) body.
pub fn decode_created(content_type: Option<&str>, text: &str) -> Result<Value, PushError> {
    if !content_type.is_some_and(is_json) {
        return Err(PushError::Protocol(format!(
            "expected a JSON response, got content type {:?}",
            content_type.unwrap_or("<none>")
        )));
    }
    serde_json::from_str(text)
        .map_err(|e| PushError::Protocol(format!("response body is not valid JSON: {e}")))
}

fn is_json(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(str::trim)
        .is_some_and(|essence| essence.eq_ignore_ascii_case("application/json"))
}
