//! Failed-login event extraction
//!
//! Applies an ordered list of line rules to raw syslog-style text. Each rule
//! recognises one failure-report style and captures the timestamp fragment
//! and the dotted-quad source address. The first matching rule wins, so a
//! line that fits several styles is only counted once.

use chrono::{DateTime, Datelike, NaiveDateTime, Utc};
use regex::Regex;
use thiserror::Error;

use crate::models::{AuthEvent, FailureKind};

/// Errors that can occur while extracting events
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Invalid rule pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Unparseable timestamp '{fragment}': {source}")]
    Timestamp {
        fragment: String,
        #[source]
        source: chrono::ParseError,
    },
}

// ASCII classes only: `\d` and `\w` would also accept non-Latin digits
const TIMESTAMP: &str = r"([0-9A-Za-z_]{3}\s+[0-9]{1,2} [0-9]{2}:[0-9]{2}:[0-9]{2})";
const ADDRESS: &str = r"([0-9]+\.[0-9]+\.[0-9]+\.[0-9]+)";

/// Rule order matters: earlier rules shadow later ones
const RULES: &[(FailureKind, &str, &str)] = &[
    (FailureKind::PasswordFailure, r"Failed password", r"from\s+"),
    (FailureKind::AuthenticationFailure, r"authentication failure", r"rhost="),
    (FailureKind::UnauthorizedAccess, r"unauthorized", r"from\s+"),
    (FailureKind::LoginTimeout, r"login timeout", r"from\s+"),
];

#[derive(Debug, Clone)]
struct ExtractionRule {
    kind: FailureKind,
    pattern: Regex,
}

impl ExtractionRule {
    fn new(kind: FailureKind, marker: &str, address_prefix: &str) -> Result<Self, ExtractError> {
        let pattern = Regex::new(&format!(
            "(?i){}.*{}.*{}{}",
            TIMESTAMP, marker, address_prefix, ADDRESS
        ))?;
        Ok(ExtractionRule { kind, pattern })
    }

    /// Returns the (timestamp fragment, address) pair if the line matches
    fn captures<'l>(&self, line: &'l str) -> Option<(&'l str, &'l str)> {
        let caps = self.pattern.captures(line)?;
        Some((caps.get(1)?.as_str(), caps.get(2)?.as_str()))
    }
}

/// Extracts failed-login events from raw log text
#[derive(Debug, Clone)]
pub struct EventExtractor {
    rules: Vec<ExtractionRule>,
    reference_year: Option<i32>,
}

impl EventExtractor {
    /// Build the extractor with the standard rule set.
    ///
    /// Syslog timestamps carry no year, so `reference_year` is attached to
    /// every fragment. When `None`, the current UTC year at extraction time
    /// is used. Logs that cross a year boundary will parse the later months
    /// into the wrong year either way.
    pub fn new(reference_year: Option<i32>) -> Result<Self, ExtractError> {
        let rules = RULES
            .iter()
            .map(|(kind, marker, prefix)| ExtractionRule::new(*kind, marker, prefix))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(EventExtractor {
            rules,
            reference_year,
        })
    }

    pub fn reference_year(&self) -> i32 {
        self.reference_year.unwrap_or_else(|| Utc::now().year())
    }

    /// Extract events from a sequence of lines, preserving input order.
    ///
    /// Lines matching no rule are dropped. Lines whose timestamp cannot be
    /// parsed are skipped and logged; they never abort the run.
    pub fn extract<'a, I>(&self, lines: I) -> Vec<AuthEvent>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let year = self.reference_year();
        let mut events = Vec::new();

        for line in lines {
            match self.match_line(line, year) {
                Ok(Some(event)) => events.push(event),
                Ok(None) => {}
                Err(e) => log::debug!("Skipping line: {}", e),
            }
        }

        events
    }

    /// Try the rules in order against one line
    pub fn match_line(&self, line: &str, year: i32) -> Result<Option<AuthEvent>, ExtractError> {
        for rule in &self.rules {
            if let Some((fragment, address)) = rule.captures(line) {
                let occurred_at = parse_timestamp(fragment, year)?;
                log::trace!("Matched {} from {}", rule.kind, address);
                return Ok(Some(AuthEvent {
                    source_address: address.to_string(),
                    occurred_at,
                    kind: rule.kind,
                }));
            }
        }
        Ok(None)
    }
}

/// Parse a `Mon D HH:MM:SS` fragment in the given year, as UTC
pub fn parse_timestamp(fragment: &str, year: i32) -> Result<DateTime<Utc>, ExtractError> {
    // Syslog pads single-digit days with a second space
    let normalized = fragment.split_whitespace().collect::<Vec<_>>().join(" ");

    NaiveDateTime::parse_from_str(&format!("{} {}", year, normalized), "%Y %b %d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|source| ExtractError::Timestamp {
            fragment: fragment.to_string(),
            source,
        })
}
