//! Test support for the cachebench workspace: an in-process stub cache
//! service and logging setup for tests.

pub mod server;
pub mod tracing;
