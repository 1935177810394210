//! A load-testing harness for a network cache service.
//!
//! The harness generates a reproducible synthetic request stream (a
//! read-heavy GET/SET/DEL mix with variable key and value sizes), drives
//! the service over one connection per request, and reports space usage,
//! hit rate, tail latency, and throughput.
//!
//! The cache service itself is out of scope: it is reached purely through
//! PUT/GET/DELETE/HEAD/POST requests and its "Space-Used" response field.
//! The harness is deliberately single-threaded and synchronous so that
//! per-request timings are free of contention.
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod bench;
pub mod client;
pub mod config;
pub mod report;
pub mod transport;
pub mod workload;

#[cfg(test)]
pub(crate) mod testutil;

pub use crate::bench::{BenchmarkResult, run};
pub use crate::client::CacheClient;
pub use crate::config::Config;
pub use crate::workload::Workload;
