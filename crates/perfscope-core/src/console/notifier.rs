//! Single-slot notification channel
//!
//! The latest notification overwrites whatever was there, visible or not.
//! Observers subscribe to a `watch` receiver and always see the current slot.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::models::{Notification, Severity};

/// Producer handle for the notification slot, cheap to clone
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: Arc<watch::Sender<Notification>>,
    hide_at: Arc<Mutex<Option<Instant>>>,
    auto_hide: Duration,
}

impl Notifier {
    /// Create an empty channel whose notifications hide after `auto_hide`
    pub fn new(auto_hide: Duration) -> Self {
        let (tx, _rx) = watch::channel(Notification::default());
        Self {
            tx: Arc::new(tx),
            hide_at: Arc::new(Mutex::new(None)),
            auto_hide,
        }
    }

    /// Replace the current notification and make it visible.
    ///
    /// Returns the sequence number of the new notification.
    pub fn show(&self, message: impl Into<String>, severity: Severity) -> u64 {
        let message = message.into();
        match severity {
            Severity::Error => error!(severity = severity.as_str(), "{message}"),
            Severity::Warning => warn!(severity = severity.as_str(), "{message}"),
            Severity::Info | Severity::Success => info!(severity = severity.as_str(), "{message}"),
        }

        *self.hide_at.lock() = Some(Instant::now() + self.auto_hide);

        let mut sequence = 0;
        self.tx.send_modify(|current| {
            current.message = message;
            current.severity = severity;
            current.visible = true;
            current.sequence += 1;
            current.shown_at = Some(Utc::now());
            sequence = current.sequence;
        });
        sequence
    }

    pub fn info(&self, message: impl Into<String>) -> u64 {
        self.show(message, Severity::Info)
    }

    pub fn success(&self, message: impl Into<String>) -> u64 {
        self.show(message, Severity::Success)
    }

    pub fn warning(&self, message: impl Into<String>) -> u64 {
        self.show(message, Severity::Warning)
    }

    pub fn error(&self, message: impl Into<String>) -> u64 {
        self.show(message, Severity::Error)
    }

    /// Hide the current notification, keeping its text
    pub fn dismiss(&self) {
        *self.hide_at.lock() = None;
        self.tx.send_if_modified(|current| {
            let was_visible = current.visible;
            current.visible = false;
            was_visible
        });
    }

    /// Hide the current notification if its display time has run out.
    ///
    /// Returns whether anything was hidden.
    pub fn hide_expired(&self, now: Instant) -> bool {
        match self.deadline() {
            Some(hide_at) if now >= hide_at => {
                self.dismiss();
                true
            }
            _ => false,
        }
    }

    /// When the visible notification is due to hide
    pub fn deadline(&self) -> Option<Instant> {
        *self.hide_at.lock()
    }

    /// Snapshot of the current notification
    pub fn current(&self) -> Notification {
        self.tx.borrow().clone()
    }

    /// Sequence number of the latest notification, 0 if none was shown
    pub fn sequence(&self) -> u64 {
        self.tx.borrow().sequence
    }

    /// Observe notification changes
    pub fn subscribe(&self) -> watch::Receiver<Notification> {
        self.tx.subscribe()
    }
}
