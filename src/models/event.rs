use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Which failure-report style a log line matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    PasswordFailure,
    AuthenticationFailure,
    UnauthorizedAccess,
    LoginTimeout,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::PasswordFailure => "password failure",
            FailureKind::AuthenticationFailure => "authentication failure",
            FailureKind::UnauthorizedAccess => "unauthorized access",
            FailureKind::LoginTimeout => "login timeout",
        };
        f.write_str(name)
    }
}

/// A single failed authentication attempt extracted from a log line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthEvent {
    pub source_address: String,
    pub occurred_at: DateTime<Utc>,
    pub kind: FailureKind,
}

/// A brute-force burst detected for one source address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BurstAlert {
    pub source_address: String,
    /// Total failed attempts seen for the address in the run, not just the window
    pub attempt_count: usize,
    /// Span of the earliest qualifying window, in seconds
    pub window_seconds: f64,
    pub detected_at: DateTime<Utc>,
}

impl BurstAlert {
    pub fn subject(&self) -> String {
        format!("Suspicious IP: {}", self.source_address)
    }

    pub fn body(&self) -> String {
        format!(
            "IP: {}\nAttempts: {}\nWindow: {:.2}s",
            self.source_address, self.attempt_count, self.window_seconds
        )
    }
}

/// An alert as handed back by the alert store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredAlert {
    pub id: i64,
    #[serde(flatten)]
    pub alert: BurstAlert,
}

/// Result of one analysis run over a single log file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub total_lines: usize,
    pub preview: Vec<String>,
    /// Extracted failures per matched rule
    #[serde(default)]
    pub failures_by_kind: BTreeMap<FailureKind, usize>,
    pub alerts: Vec<BurstAlert>,
}
