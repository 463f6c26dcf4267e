//! LoanLens infrastructure: process-wide concerns shared by binaries.

pub mod telemetry;
