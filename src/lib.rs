//! Live sentence correction for any text field.
//!
//! Keystrokes are captured globally, segmented into sentences, sent to a
//! local correction service, and corrected sentences are retyped in place.

pub mod capture;
pub mod config;
pub mod keyboard;
pub mod pipeline;
pub mod rewrite;
pub mod service;
