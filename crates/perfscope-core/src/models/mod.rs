//! Data models for Perfscope

mod device;
mod job;
mod notification;
mod query;
mod trace;

pub use device::*;
pub use job::*;
pub use notification::*;
pub use query::*;
pub use trace::*;
