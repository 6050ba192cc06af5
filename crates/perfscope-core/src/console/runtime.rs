//! The console: owner of all client state and its event loop

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tokio::time::{sleep, sleep_until, timeout_at, Instant};
use tracing::{debug, info};

use super::{
    ConsoleEvent, DeviceRegistry, Notifier, PollFollowUp, QueryCatalog, QueryJobMachine,
    TraceSessionMachine, View, ViewRouter,
};
use crate::api::TraceService;
use crate::config::{Config, ReadinessMode};
use crate::error::{Error, Result};
use crate::models::{Device, JobId, PollLocation, TraceReadiness};

/// Single logical client: every component plus the event channel
pub struct Console {
    config: Config,
    service: Arc<dyn TraceService>,
    tx: mpsc::UnboundedSender<ConsoleEvent>,
    rx: mpsc::UnboundedReceiver<ConsoleEvent>,
    notifier: Notifier,
    devices: DeviceRegistry,
    catalog: QueryCatalog,
    session: TraceSessionMachine,
    jobs: QueryJobMachine,
    router: ViewRouter,
}

impl Console {
    /// Create a console talking to `service`
    pub fn new(config: Config, service: Arc<dyn TraceService>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let notifier = Notifier::new(config.notifications.auto_hide);

        Self {
            devices: DeviceRegistry::new(notifier.clone()),
            catalog: QueryCatalog::new(notifier.clone()),
            session: TraceSessionMachine::new(notifier.clone()),
            jobs: QueryJobMachine::new(notifier.clone()),
            router: ViewRouter::default(),
            notifier,
            config,
            service,
            tx,
            rx,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn devices(&self) -> &DeviceRegistry {
        &self.devices
    }

    pub fn catalog(&self) -> &QueryCatalog {
        &self.catalog
    }

    pub fn session(&self) -> &TraceSessionMachine {
        &self.session
    }

    pub fn jobs(&self) -> &QueryJobMachine {
        &self.jobs
    }

    pub fn router(&self) -> &ViewRouter {
        &self.router
    }

    // ── Device registry ─────────────────────────────────────────────

    /// Fetch the device list
    pub fn refresh_devices(&mut self) {
        let fetch = self.devices.begin_refresh();
        let service = Arc::clone(&self.service);
        self.spawn(async move {
            let result = service.list_devices().await;
            Some(ConsoleEvent::DevicesListed { fetch, result })
        });
    }

    pub fn select_device(&mut self, device: &Device) -> Result<()> {
        self.devices.select(device)
    }

    pub fn select_next_device(&mut self) {
        self.devices.select_next();
    }

    pub fn select_prev_device(&mut self) {
        self.devices.select_prev();
    }

    // ── Query catalog ───────────────────────────────────────────────

    /// Fetch the query list
    pub fn refresh_catalog(&mut self) {
        let fetch = self.catalog.begin_refresh();
        let service = Arc::clone(&self.service);
        self.spawn(async move {
            let result = service.list_queries().await;
            Some(ConsoleEvent::QueriesListed { fetch, result })
        });
    }

    /// Store a user query; blank input is rejected without any request
    pub fn add_query(&mut self, name: &str, sql: &str) -> Result<()> {
        let query = self.catalog.validate_new(name, sql)?;
        let service = Arc::clone(&self.service);
        self.spawn(async move {
            let result = service.add_query(&query).await;
            Some(ConsoleEvent::QueryAdded {
                name: query.name,
                result,
            })
        });
        Ok(())
    }

    /// Delete a user query, then re-fetch the catalog
    pub fn remove_query(&mut self, id: &str) -> Result<()> {
        self.catalog.validate_remove(id)?;
        let id = id.trim().to_string();
        let service = Arc::clone(&self.service);
        self.spawn(async move {
            let result = service.delete_query(&id).await;
            Some(ConsoleEvent::QueryRemoved { id, result })
        });
        Ok(())
    }

    pub fn select_query(&mut self, id: &str) -> Result<()> {
        self.catalog.select(id)
    }

    pub fn select_next_query(&mut self) {
        self.catalog.select_next();
    }

    pub fn select_prev_query(&mut self) {
        self.catalog.select_prev();
    }

    // ── Trace session ───────────────────────────────────────────────

    /// Start a capture on `device_id`, superseding any capture in flight.
    ///
    /// Clears the current trace id and query result. The session is released
    /// after the configured capture window whether or not the start succeeds.
    pub fn start_trace(&mut self, device_id: &str) -> Result<()> {
        let ticket = self.session.begin(device_id)?;
        self.jobs.reset();

        let generation = ticket.generation;
        let service = Arc::clone(&self.service);
        let device = ticket.device;
        self.spawn(async move {
            let result = service.start_trace(&device).await;
            Some(ConsoleEvent::TraceStarted { generation, result })
        });

        let window = self.config.session.capture_window;
        let timer = self.spawn(async move {
            sleep(window).await;
            Some(ConsoleEvent::TraceReleased {
                generation,
                confirmed: false,
            })
        });
        self.session.attach_timer(generation, timer);
        Ok(())
    }

    /// Start a capture on the selected device
    pub fn start_selected_trace(&mut self) -> Result<()> {
        let device = self
            .devices
            .selected()
            .map(|d| d.as_str().to_string())
            .unwrap_or_default();
        self.start_trace(&device)
    }

    // ── Query jobs ──────────────────────────────────────────────────

    /// Execute `query_id` against `trace_id`, superseding the current job
    pub fn execute(&mut self, trace_id: &str, query_id: &str) -> Result<()> {
        let ticket = self.jobs.begin(trace_id, query_id)?;

        let job = ticket.job;
        let service = Arc::clone(&self.service);
        self.spawn(async move {
            let result = service.execute_query(&ticket.trace_id, &ticket.query_id).await;
            Some(ConsoleEvent::JobSubmitted { job, result })
        });
        Ok(())
    }

    /// Execute the selected query against the current trace
    pub fn execute_selected(&mut self) -> Result<()> {
        let trace_id = self.session.trace_id().unwrap_or_default().to_string();
        let query_id = self.catalog.selected_id().unwrap_or_default().to_string();
        self.execute(&trace_id, &query_id)
    }

    // ── Views ───────────────────────────────────────────────────────

    /// Switch the active view without touching anything else
    pub fn switch_view(&mut self, view: View) {
        self.router.switch(view);
    }

    /// Switch to `view` and re-fetch the state it depends on
    pub fn activate_view(&mut self, view: View) {
        self.switch_view(view);
        match view {
            View::Capture => {
                self.refresh_devices();
                self.refresh_catalog();
            }
            View::Queries => self.refresh_catalog(),
            View::Results => {}
        }
    }

    /// Hide the current notification
    pub fn dismiss_notification(&mut self) {
        self.notifier.dismiss();
    }

    // ── Event loop ──────────────────────────────────────────────────

    /// Wait for the next completion event or notification expiry
    pub async fn next_event(&mut self) -> ConsoleEvent {
        let deadline = self.notifier.deadline();
        let expiry = async move {
            match deadline {
                Some(at) => sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            Some(event) = self.rx.recv() => event,
            () = expiry => ConsoleEvent::NotificationExpired,
        }
    }

    /// Apply one event to the owned state
    pub fn handle(&mut self, event: ConsoleEvent) {
        match event {
            ConsoleEvent::DevicesListed { fetch, result } => {
                self.devices.apply_refresh(fetch, result);
            }
            ConsoleEvent::QueriesListed { fetch, result } => {
                self.catalog.apply_list(fetch, result);
            }
            ConsoleEvent::QueryAdded { name, result } => {
                if self.catalog.apply_added(&name, result) {
                    self.refresh_catalog();
                }
            }
            ConsoleEvent::QueryRemoved { id, result } => {
                if self.catalog.apply_removed(&id, result) {
                    self.refresh_catalog();
                }
            }
            ConsoleEvent::TraceStarted { generation, result } => {
                let accepted = self.session.apply_started(generation, result);
                if let Some(trace_id) = accepted {
                    if self.config.session.readiness == ReadinessMode::Confirm {
                        self.spawn_readiness_probe(generation, trace_id);
                    }
                }
            }
            ConsoleEvent::TraceReleased {
                generation,
                confirmed,
            } => {
                self.session.apply_released(generation, confirmed);
            }
            ConsoleEvent::JobSubmitted { job, result } => {
                if let Some(location) = self.jobs.apply_submitted(job, result) {
                    self.schedule_poll(job, location);
                }
            }
            ConsoleEvent::JobPolled { job, result } => {
                if let PollFollowUp::Continue(location) = self.jobs.apply_polled(job, result) {
                    self.schedule_poll(job, location);
                }
            }
            ConsoleEvent::NotificationExpired => {
                self.notifier.hide_expired(Instant::now());
            }
        }
    }

    /// Wait for one event and apply it
    pub async fn step(&mut self) {
        let event = self.next_event().await;
        self.handle(event);
    }

    /// Drive the event loop until `done` holds or `limit` elapses
    pub async fn run_until<F>(&mut self, limit: Duration, mut done: F) -> Result<()>
    where
        F: FnMut(&Self) -> bool,
    {
        let deadline = Instant::now() + limit;
        while !done(self) {
            let event = timeout_at(deadline, self.next_event())
                .await
                .map_err(|_| Error::unavailable(format!("no answer from the trace service within {limit:?}")))?;
            self.handle(event);
        }
        Ok(())
    }

    /// Release the poll handle and stop session timers
    pub fn shutdown(&mut self) {
        info!("Console shutting down");
        self.jobs.release_poll();
        self.session.cancel_timers();
    }

    // ── Internals ───────────────────────────────────────────────────

    fn spawn<F>(&self, task: F) -> AbortHandle
    where
        F: Future<Output = Option<ConsoleEvent>> + Send + 'static,
    {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            if let Some(event) = task.await {
                // The receiver lives as long as the console
                let _ = tx.send(event);
            }
        })
        .abort_handle()
    }

    /// One poll tick: wait an interval, check once, report
    fn schedule_poll(&mut self, job: JobId, location: PollLocation) {
        let service = Arc::clone(&self.service);
        let interval = self.config.jobs.poll_interval;
        let tick = self.spawn(async move {
            sleep(interval).await;
            debug!(job_id = %job, %location, "Poll check");
            let result = service.poll_result(&location).await;
            Some(ConsoleEvent::JobPolled { job, result })
        });
        self.jobs.attach_poll(job, tick);
    }

    /// Probe trace status until it is ready; stops quietly on anything else
    fn spawn_readiness_probe(&mut self, generation: u64, trace_id: String) {
        let service = Arc::clone(&self.service);
        let interval = self.config.session.readiness_probe_interval;
        let probe = self.spawn(async move {
            loop {
                sleep(interval).await;
                match service.trace_status(&trace_id).await {
                    Ok(TraceReadiness::Ready) => {
                        return Some(ConsoleEvent::TraceReleased {
                            generation,
                            confirmed: true,
                        });
                    }
                    Ok(TraceReadiness::Capturing) => {}
                    Ok(TraceReadiness::Failed) => {
                        debug!(%trace_id, "Service reports capture failed, leaving release to the window");
                        return None;
                    }
                    Err(e) => {
                        debug!(%trace_id, error = %e, "Readiness probe unavailable");
                        return None;
                    }
                }
            }
        });
        self.session.attach_timer(generation, probe);
    }
}

impl Drop for Console {
    fn drop(&mut self) {
        self.jobs.release_poll();
        self.session.cancel_timers();
    }
}
