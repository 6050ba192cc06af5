//! Trace session state machine
//!
//! `Idle -> Capturing -> Ready`, or back to `Idle` when the start request
//! failed. The session leaves `Capturing` when its release timer fires after
//! the capture window, whatever the start outcome was. The release is a
//! heuristic: it does not prove the trace is persisted and queryable. With
//! confirmed readiness a status probe may release it earlier.
//!
//! Every `begin` bumps the session generation. Timers and responses carry the
//! generation they were issued for and are dropped once it is superseded.

use chrono::Utc;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use super::Notifier;
use crate::error::{Error, Result};
use crate::models::{Device, SessionStatus, StartedTrace, TraceSession};

const START_FAILED: &str = "Failed to start trace.";

/// What the console needs to issue a start request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartTicket {
    pub generation: u64,
    pub device: Device,
}

/// Owner of the client's single capture session
#[derive(Debug)]
pub struct TraceSessionMachine {
    session: TraceSession,
    generation: u64,
    timers: Vec<AbortHandle>,
    notifier: Notifier,
}

impl TraceSessionMachine {
    pub fn new(notifier: Notifier) -> Self {
        Self {
            session: TraceSession::default(),
            generation: 0,
            timers: Vec::new(),
            notifier,
        }
    }

    pub fn session(&self) -> &TraceSession {
        &self.session
    }

    pub fn status(&self) -> SessionStatus {
        self.session.status
    }

    pub fn trace_id(&self) -> Option<&str> {
        self.session.id.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_interactive(&self) -> bool {
        self.session.is_interactive()
    }

    /// Enter `Capturing` for a device, superseding any session in flight.
    ///
    /// An empty device id is rejected with a warning and changes nothing.
    pub fn begin(&mut self, device_id: &str) -> Result<StartTicket> {
        let device_id = device_id.trim();
        if device_id.is_empty() {
            let msg = "Please select a device.";
            self.notifier.warning(msg);
            return Err(Error::validation(msg));
        }

        self.cancel_timers();
        if self.session.status == SessionStatus::Capturing {
            warn!(
                generation = self.generation,
                previous = ?self.session.id,
                "Superseding capture in flight"
            );
        }

        self.generation += 1;
        let device = Device::new(device_id);
        self.session = TraceSession {
            id: None,
            status: SessionStatus::Capturing,
            device: Some(device.clone()),
            confirmed: false,
            started_at: Some(Utc::now()),
        };
        info!(generation = self.generation, %device, "Capture requested");

        Ok(StartTicket {
            generation: self.generation,
            device,
        })
    }

    /// Track a timer or probe task belonging to the current generation
    pub fn attach_timer(&mut self, generation: u64, handle: AbortHandle) {
        if generation != self.generation || self.session.status != SessionStatus::Capturing {
            handle.abort();
            return;
        }
        self.timers.retain(|h| !h.is_finished());
        self.timers.push(handle);
    }

    /// Apply the start response.
    ///
    /// Returns the trace id when a successful start was applied, so that a
    /// readiness probe can be issued for it.
    pub fn apply_started(&mut self, generation: u64, result: Result<StartedTrace>) -> Option<String> {
        if generation != self.generation {
            debug!(generation, current = self.generation, "Discarding stale start response");
            return None;
        }

        match result {
            Ok(started) => {
                info!(generation, trace_id = %started.trace_id, "Trace accepted");
                let message = if started.message.trim().is_empty() {
                    format!("Trace {} started.", started.trace_id)
                } else {
                    started.message.clone()
                };
                self.session.id = Some(started.trace_id.clone());
                // The window may already have elapsed while the request was slow
                if self.session.status == SessionStatus::Idle {
                    self.session.status = SessionStatus::Ready;
                }
                self.notifier.success(message);
                Some(started.trace_id)
            }
            Err(e) => {
                self.notifier.error(e.user_message(START_FAILED));
                None
            }
        }
    }

    /// Release the session into its interactive state.
    ///
    /// `confirmed` is set when the service reported the trace ready. Returns
    /// whether the release was applied.
    pub fn apply_released(&mut self, generation: u64, confirmed: bool) -> bool {
        if generation != self.generation || self.session.status != SessionStatus::Capturing {
            debug!(generation, current = self.generation, "Discarding stale release");
            return false;
        }

        self.cancel_timers();
        self.session.confirmed = confirmed;
        self.session.status = if self.session.id.is_some() {
            SessionStatus::Ready
        } else {
            SessionStatus::Idle
        };
        info!(
            generation,
            status = ?self.session.status,
            confirmed,
            "Capture window closed"
        );

        if confirmed {
            if let Some(id) = &self.session.id {
                self.notifier.success(format!("Trace {id} is ready."));
            }
        }
        true
    }

    /// Stop all timers of the current session
    pub fn cancel_timers(&mut self) {
        for handle in self.timers.drain(..) {
            handle.abort();
        }
    }
}
