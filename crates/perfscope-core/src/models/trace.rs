//! Trace capture session model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Device;

/// Lifecycle state of the capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// No capture in flight and no usable trace
    #[default]
    Idle,
    /// A capture was requested and its window has not elapsed
    Capturing,
    /// The capture window elapsed after a successful start
    Ready,
}

/// The client's single capture session
#[derive(Debug, Clone, Default, Serialize)]
pub struct TraceSession {
    /// Trace identifier, once the service accepted the request
    pub id: Option<String>,
    /// Current status
    pub status: SessionStatus,
    /// Device the capture was requested for
    pub device: Option<Device>,
    /// Whether readiness was confirmed by the service rather than assumed
    pub confirmed: bool,
    /// When the capture was requested
    pub started_at: Option<DateTime<Utc>>,
}

impl TraceSession {
    /// Capture and query controls are enabled
    pub fn is_interactive(&self) -> bool {
        self.status != SessionStatus::Capturing
    }
}

/// Response of a successful start request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartedTrace {
    pub trace_id: String,
    #[serde(default)]
    pub message: String,
}

/// Server-side readiness of a trace, used by confirmed readiness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceReadiness {
    Capturing,
    Ready,
    Failed,
}
