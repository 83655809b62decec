pub mod auth;
pub mod cli;
pub mod dry_run;
pub mod github;
pub mod load_config;

pub use cli::{run, Cli};
