//! Remote trace service client
//!
//! The service lists devices, starts captures, executes queries and serves
//! their results. The console only talks to it through [`TraceService`], so
//! tests and alternative transports can stand in for the HTTP binding.

mod http;
mod service;

pub use http::HttpTraceService;
pub use service::TraceService;
