//! Template parser: turns a Markdown stream into a title and a raw body.
//!
//! The format is strict:
//!
//! ```text
//! # Title line (leading/trailing `#` and whitespace stripped)
//!
//! Body, used verbatim from the third line on.
//! ```

use std::io::BufRead;

use crate::error::TemplateError;

/// A parsed template before reference resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTemplate {
    pub title: String,
    pub raw_body: String,
}

impl ParsedTemplate {
    /// The body, or `None` when the template has nothing after the blank line.
    pub fn body(&self) -> Option<&str> {
        if self.raw_body.is_empty() {
            None
        } else {
            Some(&self.raw_body)
        }
    }
}

/// Parse a template from a UTF-8 stream.
pub fn parse_template<R: BufRead>(mut reader: R) -> Result<ParsedTemplate, TemplateError> {
    let mut first = String::new();
    reader.read_line(&mut first)?;
    let title = first
        .trim_end_matches(['\n', '\r'])
        .trim_matches('#')
        .trim()
        .to_string();

    let mut second = String::new();
    reader.read_line(&mut second)?;
    if !second.trim().is_empty() {
        return Err(TemplateError::SecondLineNotBlank(
            second.trim_end_matches(['\n', '\r']).to_string(),
        ));
    }

    let mut raw_body = String::new();
    reader.read_to_string(&mut raw_body)?;

    Ok(ParsedTemplate { title, raw_body })
}
