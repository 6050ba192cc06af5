//! Terminal dashboard for Perfscope
//!
//! Renders the console's views and maps key presses to console operations.

mod app;
mod components;
mod event;
mod ui;

pub use app::App;
pub use event::{Event, EventHandler};
