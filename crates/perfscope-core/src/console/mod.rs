//! Job orchestration core
//!
//! The [`Console`] owns one instance of every component: the device registry,
//! the query catalog, the trace session and query job state machines, the
//! view router and the notification channel. Operations validate their input
//! synchronously, spawn the remote call or timer, and return. Each spawned
//! task posts a [`ConsoleEvent`] back, and state only changes when the owner
//! passes that event to [`Console::handle`]. All mutation therefore happens on
//! one logical thread of control, in the order events are handled.
//!
//! Components never mutate each other. The state machines push messages into
//! the [`Notifier`]; screens read component state through the accessors and
//! change it only through the console operations.

mod catalog;
mod devices;
mod event;
mod job;
mod notifier;
mod router;
mod runtime;
mod session;

pub use catalog::QueryCatalog;
pub use devices::DeviceRegistry;
pub use event::ConsoleEvent;
pub use job::{JobTicket, PollFollowUp, PollHandle, QueryJobMachine};
pub use notifier::Notifier;
pub use router::{View, ViewRouter};
pub use runtime::Console;
pub use session::{StartTicket, TraceSessionMachine};
