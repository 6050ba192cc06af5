//! Query job model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::QueryResult;

/// Client-assigned identity of a query job, strictly increasing per console
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// Lifecycle state of a query job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    #[default]
    Idle,
    Submitted,
    Polling,
    Complete,
    Failed,
}

impl JobState {
    /// Whether the job has reached a final state
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }

    /// Whether the server is still working on the job
    pub fn is_processing(self) -> bool {
        matches!(self, Self::Submitted | Self::Polling)
    }
}

/// One execution of a query against a trace
#[derive(Debug, Clone, Serialize)]
pub struct QueryJob {
    pub id: JobId,
    pub trace_id: String,
    pub query_id: String,
    pub state: JobState,
    /// Where to poll for the result, once submitted
    pub location: Option<PollLocation>,
    /// Result table, only present when `Complete`
    pub result: Option<QueryResult>,
    /// Failure text, only present when `Failed`
    pub error: Option<String>,
    /// Number of poll checks applied so far
    pub polls: u32,
    pub submitted_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl QueryJob {
    /// Create a job in the `Submitted` state
    pub fn submitted(id: JobId, trace_id: impl Into<String>, query_id: impl Into<String>) -> Self {
        Self {
            id,
            trace_id: trace_id.into(),
            query_id: query_id.into(),
            state: JobState::Submitted,
            location: None,
            result: None,
            error: None,
            polls: 0,
            submitted_at: Utc::now(),
            finished_at: None,
        }
    }
}

/// Opaque address returned by the execute operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PollLocation(String);

impl PollLocation {
    pub fn new(location: impl Into<String>) -> Self {
        Self(location.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PollLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status reported by a poll check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollStatus {
    Pending,
    Complete,
    Error,
}

/// Body of a poll check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollResponse {
    pub status: PollStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<QueryResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl PollResponse {
    /// Still running
    pub fn pending() -> Self {
        Self {
            status: PollStatus::Pending,
            data: None,
            detail: None,
        }
    }

    /// Finished with a result table
    pub fn complete(data: QueryResult) -> Self {
        Self {
            status: PollStatus::Complete,
            data: Some(data),
            detail: None,
        }
    }

    /// Failed on the server
    pub fn error(detail: impl Into<String>) -> Self {
        Self {
            status: PollStatus::Error,
            data: None,
            detail: Some(detail.into()),
        }
    }
}
