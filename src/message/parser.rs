//! Parsing model replies into structured commit messages.
//!
//! Models wrap their answer in prose or markdown fences more often than
//! not, so the parser scans for the first well-formed
//! `type(scope): title` line instead of assuming a clean reply.

use regex_lite::Regex;

use crate::error::ParseError;
use crate::message::{CommitMessage, CommitType};

/// Subject pattern: optional leading glyph token, `type(scope)!: title`.
const SUBJECT_PATTERN: &str = r"^(?:[^\w\s]\S*\s+)?(\w+)(?:\(([^)]*)\))?!?:\s*(.+)$";

/// Parse raw model output into a [`CommitMessage`].
///
/// Scans line by line (with markdown fence markers dropped) for the first
/// subject line whose type is a member of the commit-type taxonomy. Lines
/// after the subject, up to the next fence or blank-separated trailing
/// prose, become the description. An unrecognized type on a structurally
/// valid subject is an error, never a silent default.
pub fn parse_response(raw: &str, title_max: usize) -> Result<CommitMessage, ParseError> {
    let re = Regex::new(SUBJECT_PATTERN).expect("subject pattern is valid");

    let lines: Vec<&str> = raw
        .lines()
        .filter(|l| !l.trim_start().starts_with("```"))
        .collect();

    let mut unknown_type: Option<String> = None;

    for (idx, line) in lines.iter().enumerate() {
        let Some(caps) = re.captures(line.trim()) else {
            continue;
        };

        let type_str = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        let Ok(commit_type) = type_str.parse::<CommitType>() else {
            // Remember the first candidate so the error names what the
            // model actually produced.
            if unknown_type.is_none() {
                unknown_type = Some(type_str.to_string());
            }
            continue;
        };

        let scope = caps
            .get(2)
            .map(|m| m.as_str().trim().to_lowercase())
            .filter(|s| !s.is_empty());
        let title = caps.get(3).map(|m| m.as_str().trim()).unwrap_or("");

        let description = collect_description(&lines[idx + 1..]);

        let message = CommitMessage {
            commit_type,
            scope,
            title: title.to_string(),
            description,
        };
        message.validate(title_max)?;
        return Ok(message);
    }

    match unknown_type {
        Some(t) => Err(ParseError::UnknownType(t)),
        None => Err(ParseError::MissingSubject),
    }
}

/// Gather the description block that follows the subject line.
fn collect_description(rest: &[&str]) -> Option<String> {
    let text = rest.join("\n");
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
