//! Parsing helpers for git tool input and output.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::error::ToolError;

/// Field separator in `git log` output.
pub(crate) const FIELD_SEP: char = '\u{1f}';
/// Record separator in `git log` output.
pub(crate) const RECORD_SEP: char = '\u{1e}';

/// `git log --format` string producing [`FIELD_SEP`]/[`RECORD_SEP`] delimited records.
pub(crate) const LOG_FORMAT: &str = "--format=%H%x1f%an%x1f%aI%x1f%B%x1e";

/// One commit from `git log`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Full commit hash.
    pub hash: String,
    /// Author name.
    pub author: String,
    /// Author date, RFC 3339.
    pub date: String,
    /// Commit message, trimmed.
    pub message: String,
}

impl std::fmt::Display for LogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Commit: {}", self.hash)?;
        writeln!(f, "Author: {}", self.author)?;
        writeln!(f, "Date: {}", self.date)?;
        writeln!(f, "Message: {}", self.message)
    }
}

/// Parses `git log` output produced with [`LOG_FORMAT`].
pub(crate) fn parse_log(output: &str) -> Vec<LogEntry> {
    output
        .split(RECORD_SEP)
        .filter_map(|record| {
            let record = record.trim_start_matches('\n');
            if record.trim().is_empty() {
                return None;
            }
            let mut fields = record.splitn(4, FIELD_SEP);
            Some(LogEntry {
                hash: fields.next()?.to_string(),
                author: fields.next()?.to_string(),
                date: fields.next()?.to_string(),
                message: fields.next().unwrap_or_default().trim().to_string(),
            })
        })
        .collect()
}

/// Parses a user-supplied timestamp.
///
/// Accepted forms: RFC 3339, `YYYY-MM-DDTHH:MM:SS` and `YYYY-MM-DD` (both UTC),
/// and `Mon D YYYY`.
///
/// # Errors
///
/// Returns [`ToolError::InvalidArgument`] naming `field` if no form matches.
pub fn parse_timestamp(field: &str, timestamp: &str) -> Result<DateTime<Utc>, ToolError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(timestamp) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&naive));
    }

    for format in ["%Y-%m-%d", "%b %d %Y"] {
        if let Some(naive) = NaiveDate::parse_from_str(timestamp, format)
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
        {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }

    Err(ToolError::invalid_argument(
        field,
        format!("is not a recognised timestamp: {timestamp}"),
    ))
}

/// Splits a command line into words, honouring single and double quotes.
///
/// Backslash escapes the next character outside single quotes.
///
/// # Errors
///
/// Returns [`ToolError::InvalidArgument`] for an unterminated quote.
pub fn split_command(command: &str) -> Result<Vec<String>, ToolError> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;
    let mut chars = command.chars();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some('\''), '\'') | (Some('"'), '"') => quote = None,
            (Some('\''), _) => current.push(c),
            (_, '\\') => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
                in_word = true;
            }
            (Some(_), _) => current.push(c),
            (None, '\'' | '"') => {
                quote = Some(c);
                in_word = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            (None, _) => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if quote.is_some() {
        return Err(ToolError::invalid_argument("command", "has an unterminated quote"));
    }
    if in_word {
        words.push(current);
    }

    Ok(words)
}
