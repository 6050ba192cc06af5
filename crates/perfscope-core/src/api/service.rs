//! Service trait consumed by the console

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    Device, NewQuery, PollLocation, PollResponse, QueryDefinition, StartedTrace, TraceReadiness,
};

/// Operations the console needs from the remote trace service
#[async_trait]
pub trait TraceService: Send + Sync {
    /// List the capture targets currently attached
    async fn list_devices(&self) -> Result<Vec<Device>>;

    /// List built-in and user-defined queries
    async fn list_queries(&self) -> Result<Vec<QueryDefinition>>;

    /// Store a user-defined query; the service assigns its id
    async fn add_query(&self, query: &NewQuery) -> Result<()>;

    /// Delete a user-defined query
    async fn delete_query(&self, id: &str) -> Result<()>;

    /// Request a capture on a device
    async fn start_trace(&self, device: &Device) -> Result<StartedTrace>;

    /// Submit a query against a trace, returning where to poll for the result
    async fn execute_query(&self, trace_id: &str, query_id: &str) -> Result<PollLocation>;

    /// One check of a submitted query
    async fn poll_result(&self, location: &PollLocation) -> Result<PollResponse>;

    /// Server-side readiness of a captured trace
    async fn trace_status(&self, trace_id: &str) -> Result<TraceReadiness>;
}
