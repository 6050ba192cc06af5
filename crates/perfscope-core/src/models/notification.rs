//! Operator notification model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Notification severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational
    #[default]
    Info,
    /// Operation succeeded
    Success,
    /// Rejected input or a condition worth attention
    Warning,
    /// An operation failed
    Error,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// The single current notification
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
    pub visible: bool,
    /// Incremented on every `show`, lets observers tell repeats apart
    pub sequence: u64,
    pub shown_at: Option<DateTime<Utc>>,
}
