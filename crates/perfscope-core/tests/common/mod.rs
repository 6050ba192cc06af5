//! Scripted in-memory trace service shared by the integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use perfscope::api::TraceService;
use perfscope::console::Console;
use perfscope::models::*;
use perfscope::{Config, Error, Result};

/// Upper bound for any single `run_until` in the tests
pub const LIMIT: Duration = Duration::from_secs(120);

/// One scripted answer
pub enum Reply<T> {
    Ok(T),
    /// Service answered with a failure status and `detail`
    Status(u16, &'static str),
    /// Service unreachable
    Down,
}

impl<T> Reply<T> {
    fn into_result(self) -> Result<T> {
        match self {
            Reply::Ok(value) => Ok(value),
            Reply::Status(status, detail) => Err(Error::remote(status, detail)),
            Reply::Down => Err(Error::unavailable("connection refused")),
        }
    }
}

/// Decrements the in-flight counter even when the poll task is aborted
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct ScriptedService {
    pub devices: Mutex<Vec<Device>>,
    pub devices_down: AtomicBool,
    pub queries: Mutex<Vec<QueryDefinition>>,
    device_listings: Mutex<VecDeque<Duration>>,
    query_listings: Mutex<VecDeque<Duration>>,
    starts: Mutex<VecDeque<(Duration, Reply<StartedTrace>)>>,
    submissions: Mutex<VecDeque<(Duration, Reply<PollLocation>)>>,
    polls: Mutex<VecDeque<(Duration, Reply<PollResponse>)>>,
    statuses: Mutex<VecDeque<Reply<TraceReadiness>>>,
    calls: Mutex<Vec<String>>,
    next_query: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedService {
    pub fn with_devices<const N: usize>(ids: [&str; N]) -> Self {
        let service = Self::default();
        *service.devices.lock() = ids.iter().map(|id| Device::new(*id)).collect();
        service
    }

    pub fn with_queries(self, queries: Vec<QueryDefinition>) -> Self {
        *self.queries.lock() = queries;
        self
    }

    /// Delay the next device listing; it still answers with the set at call time
    pub fn script_device_listing(&self, delay: Duration) {
        self.device_listings.lock().push_back(delay);
    }

    /// Delay the next query listing; it still answers with the list at call time
    pub fn script_query_listing(&self, delay: Duration) {
        self.query_listings.lock().push_back(delay);
    }

    pub fn script_start(&self, delay: Duration, reply: Reply<StartedTrace>) {
        self.starts.lock().push_back((delay, reply));
    }

    pub fn script_submission(&self, delay: Duration, reply: Reply<PollLocation>) {
        self.submissions.lock().push_back((delay, reply));
    }

    pub fn script_poll(&self, delay: Duration, reply: Reply<PollResponse>) {
        self.polls.lock().push_back((delay, reply));
    }

    pub fn script_status(&self, reply: Reply<TraceReadiness>) {
        self.statuses.lock().push_back(reply);
    }

    /// Names of the calls received, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.as_str() == name).count()
    }

    /// Largest number of poll checks that were ever outstanding at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, name: &str) {
        self.calls.lock().push(name.to_string());
    }
}

#[async_trait]
impl TraceService for ScriptedService {
    async fn list_devices(&self) -> Result<Vec<Device>> {
        self.record("list_devices");
        if self.devices_down.load(Ordering::SeqCst) {
            return Reply::Down.into_result();
        }
        let snapshot = self.devices.lock().clone();
        let delay = self.device_listings.lock().pop_front().unwrap_or_default();
        tokio::time::sleep(delay).await;
        Ok(snapshot)
    }

    async fn list_queries(&self) -> Result<Vec<QueryDefinition>> {
        self.record("list_queries");
        let snapshot = self.queries.lock().clone();
        let delay = self.query_listings.lock().pop_front().unwrap_or_default();
        tokio::time::sleep(delay).await;
        Ok(snapshot)
    }

    async fn add_query(&self, query: &NewQuery) -> Result<()> {
        self.record("add_query");
        let n = self.next_query.fetch_add(1, Ordering::SeqCst) + 1;
        self.queries.lock().push(QueryDefinition {
            id: format!("user_{n}"),
            name: query.name.clone(),
            sql: query.sql.clone(),
            builtin: false,
        });
        Ok(())
    }

    async fn delete_query(&self, id: &str) -> Result<()> {
        self.record("delete_query");
        let mut queries = self.queries.lock();
        match queries.iter().position(|q| q.id == id) {
            Some(i) if queries[i].builtin => {
                Reply::Status(403, "Built-in queries cannot be deleted").into_result()
            }
            Some(i) => {
                queries.remove(i);
                Ok(())
            }
            None => Reply::Status(404, "Query not found").into_result(),
        }
    }

    async fn start_trace(&self, device: &Device) -> Result<StartedTrace> {
        self.record("start_trace");
        let scripted = self.starts.lock().pop_front();
        let (delay, reply) = scripted.unwrap_or_else(|| {
            (
                Duration::ZERO,
                Reply::Ok(StartedTrace {
                    trace_id: "t1".to_string(),
                    message: format!("Tracing started on {device}"),
                }),
            )
        });
        tokio::time::sleep(delay).await;
        reply.into_result()
    }

    async fn execute_query(&self, _trace_id: &str, _query_id: &str) -> Result<PollLocation> {
        self.record("execute_query");
        let scripted = self.submissions.lock().pop_front();
        let (delay, reply) = scripted
            .unwrap_or_else(|| (Duration::ZERO, Reply::Ok(PollLocation::new("/poll/default"))));
        tokio::time::sleep(delay).await;
        reply.into_result()
    }

    async fn poll_result(&self, _location: &PollLocation) -> Result<PollResponse> {
        self.record("poll_result");
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        let scripted = self.polls.lock().pop_front();
        let (delay, reply) =
            scripted.unwrap_or_else(|| (Duration::ZERO, Reply::Ok(PollResponse::pending())));
        tokio::time::sleep(delay).await;
        reply.into_result()
    }

    async fn trace_status(&self, _trace_id: &str) -> Result<TraceReadiness> {
        self.record("trace_status");
        let scripted = self.statuses.lock().pop_front();
        scripted.unwrap_or(Reply::Ok(TraceReadiness::Capturing)).into_result()
    }
}

pub fn console(service: &Arc<ScriptedService>) -> Console {
    console_with(Config::default(), service)
}

pub fn console_with(config: Config, service: &Arc<ScriptedService>) -> Console {
    let service: Arc<dyn TraceService> = service.clone();
    Console::new(config, service)
}

/// Keep handling events for `span` of (virtual) time
pub async fn drain(console: &mut Console, span: Duration) {
    let _ = console.run_until(span, |_| false).await;
}

pub fn builtin(id: &str, name: &str) -> QueryDefinition {
    QueryDefinition {
        id: id.to_string(),
        name: name.to_string(),
        sql: format!("SELECT * FROM {id}"),
        builtin: true,
    }
}

pub fn custom(id: &str, name: &str) -> QueryDefinition {
    QueryDefinition {
        id: id.to_string(),
        name: name.to_string(),
        sql: "SELECT ts, dur FROM slice".to_string(),
        builtin: false,
    }
}
