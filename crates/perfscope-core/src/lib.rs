//! # Perfscope
//!
//! Operator console for a remote performance-trace service.
//!
//! Perfscope lets an operator pick an attached device, capture a
//! performance trace on it, and run predefined or custom SQL queries
//! against the captured trace, polling each query until its result table
//! is ready.
//!
//! ## Architecture
//!
//! - **API**: [`api::TraceService`] and its HTTP binding
//! - **Console**: device registry, query catalog, trace session and query
//!   job state machines, view router and notification channel
//! - **TUI**: terminal dashboard over the console
//!
//! ## Quick Start
//!
//! ```bash
//! # Open the dashboard
//! perfscope dashboard
//!
//! # Or drive it headless
//! perfscope trace start --device emulator-5554
//! perfscope query run --trace <trace-id> --query q_cpu
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod api;
pub mod config;
pub mod console;
pub mod error;
pub mod logging;
pub mod models;
#[cfg(feature = "tui")]
pub mod tui;

pub use config::Config;
pub use error::{Error, Result};

/// Re-exports for convenience
pub mod prelude {
    pub use crate::api::{HttpTraceService, TraceService};
    pub use crate::config::Config;
    pub use crate::console::{Console, View};
    pub use crate::error::{Error, Result};
    pub use crate::models::*;
}
