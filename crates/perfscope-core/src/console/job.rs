//! Query job state machine
//!
//! `Idle -> Submitted -> Polling -> {Complete | Failed}`.
//!
//! At most one poll handle is live at any time. A handle wraps the abort
//! handle of the single pending poll tick; a new job, a reset, or a terminal
//! poll response releases it. Responses are applied only when they belong to
//! the current job and its handle has not been released, so a check that was
//! already in flight when the operator moved on has no effect.

use chrono::Utc;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use super::Notifier;
use crate::error::{Error, Result};
use crate::models::{JobId, JobState, PollLocation, PollResponse, PollStatus, QueryJob, QueryResult};

const SUBMIT_FAILED: &str = "Failed to run query. The trace file might not be ready yet.";
const QUERY_FAILED: &str = "Query failed.";

/// The live poll tick of a job
#[derive(Debug)]
pub struct PollHandle {
    job: JobId,
    task: AbortHandle,
}

impl PollHandle {
    pub fn new(job: JobId, task: AbortHandle) -> Self {
        Self { job, task }
    }

    pub fn job(&self) -> JobId {
        self.job
    }

    /// Stop the tick; a response it already produced is discarded by the gate
    pub fn release(self) {
        self.task.abort();
    }
}

/// What the console needs to submit a job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobTicket {
    pub job: JobId,
    pub trace_id: String,
    pub query_id: String,
}

/// What to do after a poll response was applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollFollowUp {
    /// The response was stale and dropped
    Ignored,
    /// Still pending, schedule the next tick
    Continue(PollLocation),
    /// The job reached a terminal state
    Finished(JobState),
}

/// Owner of the current query job and its poll handle
#[derive(Debug)]
pub struct QueryJobMachine {
    job: Option<QueryJob>,
    poll: Option<PollHandle>,
    next_id: u64,
    released: u64,
    notifier: Notifier,
}

impl QueryJobMachine {
    pub fn new(notifier: Notifier) -> Self {
        Self {
            job: None,
            poll: None,
            next_id: 0,
            released: 0,
            notifier,
        }
    }

    pub fn job(&self) -> Option<&QueryJob> {
        self.job.as_ref()
    }

    pub fn state(&self) -> JobState {
        self.job.as_ref().map_or(JobState::Idle, |j| j.state)
    }

    /// Result of the current job, only when it completed
    pub fn result(&self) -> Option<&QueryResult> {
        self.job
            .as_ref()
            .filter(|j| j.state == JobState::Complete)
            .and_then(|j| j.result.as_ref())
    }

    /// Number of live poll handles, never more than one
    pub fn live_polls(&self) -> usize {
        usize::from(self.poll.is_some())
    }

    /// Total number of poll handles released so far
    pub fn released_polls(&self) -> u64 {
        self.released
    }

    /// Start a new job, superseding the current one.
    ///
    /// Both ids are required; a missing one is rejected with a warning and
    /// leaves everything untouched. Otherwise the previous poll handle is
    /// released before the job enters `Submitted` with no result.
    pub fn begin(&mut self, trace_id: &str, query_id: &str) -> Result<JobTicket> {
        let trace_id = trace_id.trim();
        let query_id = query_id.trim();

        let problem = if trace_id.is_empty() {
            Some("Please start a trace first.")
        } else if query_id.is_empty() {
            Some("Please select a query.")
        } else {
            None
        };
        if let Some(msg) = problem {
            self.notifier.warning(msg);
            return Err(Error::validation(msg));
        }

        self.release_poll();

        self.next_id += 1;
        let id = JobId(self.next_id);
        self.job = Some(QueryJob::submitted(id, trace_id, query_id));
        info!(job_id = %id, trace_id, query_id, "Query submitted");

        Ok(JobTicket {
            job: id,
            trace_id: trace_id.to_string(),
            query_id: query_id.to_string(),
        })
    }

    /// Apply the submission response.
    ///
    /// Returns the poll location when the job moved to `Polling` and its
    /// first tick should be scheduled.
    pub fn apply_submitted(&mut self, id: JobId, result: Result<PollLocation>) -> Option<PollLocation> {
        let notifier = self.notifier.clone();
        let Some(job) = self.current_mut(id, JobState::Submitted) else {
            debug!(job_id = %id, "Discarding stale submission response");
            return None;
        };

        match result {
            Ok(location) => {
                debug!(job_id = %id, %location, "Polling for result");
                job.state = JobState::Polling;
                job.location = Some(location.clone());
                Some(location)
            }
            Err(e) => {
                let message = e.user_message(SUBMIT_FAILED);
                job.state = JobState::Failed;
                job.error = Some(message.clone());
                job.finished_at = Some(Utc::now());
                notifier.error(message);
                None
            }
        }
    }

    /// Register the tick that will poll the current job.
    ///
    /// A tick for any other job, or for a job no longer polling, is aborted
    /// on the spot.
    pub fn attach_poll(&mut self, id: JobId, task: AbortHandle) {
        if self.current(id, JobState::Polling).is_none() {
            task.abort();
            return;
        }
        self.release_poll();
        self.poll = Some(PollHandle::new(id, task));
    }

    /// Apply one poll check.
    ///
    /// A transport failure is handled like an `error` status; there is no
    /// retry.
    pub fn apply_polled(&mut self, id: JobId, result: Result<PollResponse>) -> PollFollowUp {
        let handle_live = self.poll.as_ref().is_some_and(|p| p.job() == id);
        if !handle_live || self.current(id, JobState::Polling).is_none() {
            warn!(job_id = %id, "Discarding poll response for released job");
            return PollFollowUp::Ignored;
        }

        // The tick that produced this response is done
        self.release_poll();

        let notifier = self.notifier.clone();
        let Some(job) = self.current_mut(id, JobState::Polling) else {
            return PollFollowUp::Ignored;
        };
        job.polls += 1;

        let failure = match result {
            Ok(response) => match response.status {
                PollStatus::Pending => {
                    debug!(job_id = %id, polls = job.polls, "Result pending");
                    return match job.location.clone() {
                        Some(location) => PollFollowUp::Continue(location),
                        None => PollFollowUp::Ignored,
                    };
                }
                PollStatus::Complete => {
                    let data = response.data.unwrap_or_default();
                    info!(job_id = %id, rows = data.row_count(), "Query complete");
                    notifier.success(format!("Query finished with {} row(s).", data.row_count()));
                    job.result = Some(data);
                    job.state = JobState::Complete;
                    job.finished_at = Some(Utc::now());
                    return PollFollowUp::Finished(JobState::Complete);
                }
                PollStatus::Error => response
                    .detail
                    .filter(|d| !d.trim().is_empty())
                    .unwrap_or_else(|| QUERY_FAILED.to_string()),
            },
            Err(e) => e.user_message(QUERY_FAILED),
        };

        job.result = None;
        job.error = Some(failure.clone());
        job.state = JobState::Failed;
        job.finished_at = Some(Utc::now());
        notifier.error(failure);
        PollFollowUp::Finished(JobState::Failed)
    }

    /// Release the live poll handle, if any
    pub fn release_poll(&mut self) -> bool {
        match self.poll.take() {
            Some(handle) => {
                debug!(job_id = %handle.job(), "Releasing poll handle");
                handle.release();
                self.released += 1;
                true
            }
            None => false,
        }
    }

    /// Drop the current job and its handle
    pub fn reset(&mut self) {
        self.release_poll();
        self.job = None;
    }

    fn current(&self, id: JobId, state: JobState) -> Option<&QueryJob> {
        self.job.as_ref().filter(|j| j.id == id && j.state == state)
    }

    fn current_mut(&mut self, id: JobId, state: JobState) -> Option<&mut QueryJob> {
        self.job.as_mut().filter(|j| j.id == id && j.state == state)
    }
}
