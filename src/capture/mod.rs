//! Key capture: turns key presses into sentences, behind a pausable gate.
//!
//! * [`KeyInputAccumulator`]: debounce/boundary state machine over key events.
//! * [`CaptureGate`]: Active/Paused switch in front of the accumulator.
//! * [`Sentence`]: a flushed, trimmed unit of text.

pub mod accumulator;
pub mod gate;

pub use accumulator::{KeyInputAccumulator, Sentence};
pub use gate::{CaptureGate, CaptureState};
