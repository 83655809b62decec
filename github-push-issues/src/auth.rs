//! Credential acquisition and Basic-Auth header derivation.
//!
//! The username comes from flags/config or is prompted for; the password is
//! read from `GITHUB_PUSH_ISSUES_PASSWORD` when set and otherwise prompted
//! for without echo. Neither is ever logged.

use std::fmt;
use std::io::{self, BufRead, Write};

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

pub const PASSWORD_ENV: &str = "GITHUB_PUSH_ISSUES_PASSWORD";

pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Fill in whatever is missing, prompting on the terminal.
    pub fn acquire(username: Option<String>) -> Result<Self> {
        let username = match username {
            Some(username) => username,
            None => prompt_username()?,
        };
        let password = match std::env::var(PASSWORD_ENV) {
            Ok(password) => {
                tracing::info!(env = PASSWORD_ENV, "Using password from environment");
                password
            }
            Err(_) => rpassword::prompt_password("GitHub password: ")
                .context("Failed to read password")?,
        };
        Ok(Self::new(username, password))
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// `Basic base64(username:password)`.
    pub fn basic_auth_header(&self) -> String {
        let payload = format!("{}:{}", self.username, self.password);
        format!("Basic {}", STANDARD.encode(payload))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

fn prompt_username() -> Result<String> {
    let mut stderr = io::stderr();
    write!(stderr, "GitHub username: ")?;
    stderr.flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read username")?;
    let username = line.trim().to_string();
    if username.is_empty() {
        bail!("no GitHub username given");
    }
    Ok(username)
}
