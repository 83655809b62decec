#![doc = "github-push-issues-core: template walking, parsing and cross-reference resolution."]

//! This crate holds everything between a template root and a remote tracker:
//! walking a directory tree or archive, parsing each Markdown template,
//! resolving `${...}` references against already-created entries, and driving
//! the creation calls through the [`contract::Tracker`] trait.
//!
//! The HTTP client, credential prompting and argument parsing live in the
//! `github-push-issues` CLI crate.
//!
//! # Usage
//! Open a walker with [`walker::open_walker`], pick a [`contract::Tracker`]
//! implementation, and call [`push::push`].

pub mod contract;
pub mod entry;
pub mod error;
pub mod push;
pub mod reference;
pub mod template;
pub mod walker;

pub use error::PushError;
