//! Correction service access.
//!
//! ```text
//! Orchestrator ──▶ CorrectionClient ──(retry loop)──▶ dyn CorrectionBackend
//!                                                          └─ HttpBackend (reqwest)
//! ```
//!
//! * [`backend`]: wire contract and the HTTP transport.
//! * [`client`]:  bounded retry, attempt tracking, manual entry point.
//! * [`process`]: optional child process that hosts the service.

pub mod backend;
pub mod client;
pub mod process;

pub use backend::{interpret_reply, BackendError, BackendReply, CorrectionBackend, HttpBackend};
pub use client::{
    AttemptStatus, CorrectionAttempt, CorrectionClient, CorrectionOutcome,
    ManualCorrectionError, RetryPolicy,
};
pub use process::BackendProcess;
