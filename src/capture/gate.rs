//! Pausable front door of the accumulator.
//!
//! The orchestrator pauses the gate for the duration of a rewrite so the
//! synthetic keystrokes it emits are never read back as user typing.

use tokio::time::Instant;

use crate::keyboard::KeyEvent;

use super::accumulator::{KeyInputAccumulator, Sentence};

/// Whether key events are being interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureState {
    #[default]
    Active,
    Paused,
}

/// Owns the [`CaptureState`] and the [`KeyInputAccumulator`] behind it.
#[derive(Debug)]
pub struct CaptureGate {
    state: CaptureState,
    accumulator: KeyInputAccumulator,
    /// Events stamped before this instant are leftovers of a paused window.
    resumed_at: Option<Instant>,
}

impl CaptureGate {
    pub fn new(accumulator: KeyInputAccumulator) -> Self {
        Self {
            state: CaptureState::Active,
            accumulator,
            resumed_at: None,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == CaptureState::Active
    }

    pub fn accumulator(&self) -> &KeyInputAccumulator {
        &self.accumulator
    }

    /// Pending inactivity deadline.  Always `None` while paused.
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            CaptureState::Active => self.accumulator.deadline(),
            CaptureState::Paused => None,
        }
    }

    /// Route a key event to the accumulator.  Releases, events arriving
    /// while paused and events stamped before the last resume are dropped.
    pub fn on_key(&mut self, event: &KeyEvent) -> Option<Sentence> {
        if !event.is_press || self.state == CaptureState::Paused {
            return None;
        }
        if self.resumed_at.is_some_and(|t| event.pressed_at < t) {
            log::trace!("capture: dropping stale key {}", event.raw_name);
            return None;
        }
        self.accumulator.on_key(event)
    }

    pub fn on_timer(&mut self, now: Instant) -> Option<Sentence> {
        match self.state {
            CaptureState::Active => self.accumulator.on_timer(now),
            CaptureState::Paused => None,
        }
    }

    /// Stop interpreting keys.  The pending timer is cancelled without
    /// flushing.
    pub fn pause(&mut self) {
        if self.state == CaptureState::Paused {
            return;
        }
        self.state = CaptureState::Paused;
        self.accumulator.cancel_timer();
        log::info!("capture: paused");
    }

    /// Start interpreting keys again from an empty buffer.
    pub fn resume(&mut self, now: Instant) {
        if self.state == CaptureState::Active {
            return;
        }
        self.state = CaptureState::Active;
        self.accumulator.reset();
        self.resumed_at = Some(now);
        log::info!("capture: resumed");
    }

    /// Throw away the partial sentence and its timer (used when automatic
    /// correction is switched off, and on shutdown).
    pub fn discard(&mut self) {
        self.accumulator.reset();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
