//! Tracing initialization
//!
//! Installs the global `tracing` subscriber for LoanLens binaries.

mod init_basic;

pub use init_basic::{default_filter, init_telemetry};
