//! Error types for walking, parsing, resolving and creating entries.
//!
//! Every variant is fatal to a push run: the orchestrator stops at the first
//! error and leaves already-created remote entries in place.

use thiserror::Error;

/// Errors raised while parsing a single template stream.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// The line after the title must be blank.
    #[error("second line must be blank, found {0:?}")]
    SecondLineNotBlank(String),

    /// The stream could not be read (including invalid UTF-8).
    #[error("failed to read template: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while resolving `${...}` placeholders in a body.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// The placeholder names a path that has not been created yet.
    #[error("no {namespace} has been created from {path:?}")]
    UnknownReference { namespace: String, path: String },

    /// The placeholder does not follow `${namespace.path.attribute}`.
    #[error("malformed placeholder ${{{0}}}")]
    Malformed(String),

    /// The namespace is neither `milestone` nor `issue`.
    #[error("unknown namespace {namespace:?} in placeholder ${{{placeholder}}}")]
    UnknownNamespace {
        namespace: String,
        placeholder: String,
    },

    /// Only `number` and `title` may be read from an entry.
    #[error("unknown attribute {attribute:?} in placeholder ${{{placeholder}}}")]
    UnknownAttribute {
        attribute: String,
        placeholder: String,
    },
}

/// Top-level error for a push run.
#[derive(Debug, Error)]
pub enum PushError {
    /// The template root cannot be walked (e.g. unsupported archive suffix).
    #[error("configuration error for {locator:?}: {reason}")]
    Configuration { locator: String, reason: String },

    /// A template failed to parse.
    #[error("failed to parse template {path}: {source}")]
    Template {
        path: String,
        #[source]
        source: TemplateError,
    },

    /// A template body references something that cannot be resolved.
    #[error("failed to resolve references in {path}: {source}")]
    Resolve {
        path: String,
        #[source]
        source: ResolveError,
    },

    /// The tracker answered with something other than a JSON entry.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The request could not be completed, or returned a non-success status.
    #[error("transport error: {0}")]
    Transport(String),

    /// The archive could not be decoded.
    #[error("archive error: {0}")]
    Archive(String),

    /// An entry was recorded twice, or recorded before creation.
    #[error("entry state error: {0}")]
    EntryState(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for PushError {
    fn from(e: reqwest::Error) -> Self {
        PushError::Transport(e.to_string())
    }
}
