//! Completion events posted by spawned console tasks

use crate::error::Result;
use crate::models::{Device, JobId, PollLocation, PollResponse, QueryDefinition, StartedTrace};

/// Outcome of a network call or timer, applied by [`super::Console::handle`]
#[derive(Debug)]
pub enum ConsoleEvent {
    /// Device list fetched; `fetch` numbers the request it answers
    DevicesListed {
        fetch: u64,
        result: Result<Vec<Device>>,
    },
    /// Query list fetched
    QueriesListed {
        fetch: u64,
        result: Result<Vec<QueryDefinition>>,
    },
    /// User query stored
    QueryAdded { name: String, result: Result<()> },
    /// User query deleted
    QueryRemoved { id: String, result: Result<()> },
    /// Start request answered
    TraceStarted {
        generation: u64,
        result: Result<StartedTrace>,
    },
    /// Capture window elapsed, or the service confirmed the trace
    TraceReleased { generation: u64, confirmed: bool },
    /// Query submission answered
    JobSubmitted {
        job: JobId,
        result: Result<PollLocation>,
    },
    /// One poll check answered
    JobPolled {
        job: JobId,
        result: Result<PollResponse>,
    },
    /// The visible notification ran out of display time
    NotificationExpired,
}
