//! The orchestrator: sentence → correction → rewrite, one at a time.
//!
//! # Architecture
//!
//! ```text
//! KeyListener thread ──InputEvent (mpsc)──▶ Orchestrator::run()  ← one tokio task
//!                                               │
//!                                               ├─ CaptureGate / KeyInputAccumulator
//!                                               │     └─ sentence
//!                                               ├─ CorrectionClient::correct     (job)
//!                                               └─ pause → InputRewriter::apply   (job)
//!                                                    → settle → resume
//!
//! OrchestratorEvent (unbounded mpsc) ──▶ observers (logging, tests)
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use tokio::sync::mpsc;
//! use text_pilot::config::AppConfig;
//! use text_pilot::pipeline::Orchestrator;
//! use text_pilot::rewrite::EnigoSink;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let (tx, rx) = mpsc::channel(256);
//!     let orchestrator = Orchestrator::from_config(&config, EnigoSink::factory());
//!
//!     // tx is passed to KeyListener::start(...)
//!     # drop(tx);
//!     orchestrator.run(rx).await;
//! }
//! ```

pub mod runner;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use runner::{needs_rewrite, Orchestrator, OrchestratorEvent};
pub use state::SentenceStage;
