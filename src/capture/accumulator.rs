//! Sentence segmentation of the live key stream.
//!
//! [`KeyInputAccumulator`] is a pure state machine: it never reads the clock
//! or sleeps.  Each key event carries its own timestamp, and the inactivity
//! timer is represented as a deadline that the owner polls (see
//! [`deadline`](KeyInputAccumulator::deadline) and
//! [`on_timer`](KeyInputAccumulator::on_timer)).
//!
//! ```text
//! Idle ──printable / space* / other*──▶ Accumulating ──terminator──▶ flush ─▶ Idle
//!                                        │  ▲
//!                                        │  └── any key: deadline = pressed_at + debounce
//!                                        └──── deadline reached ──▶ flush ─▶ Idle
//! ```

use std::time::Duration;

use tokio::time::Instant;

use crate::keyboard::{KeyEvent, KeyKind};

// ---------------------------------------------------------------------------
// Sentence
// ---------------------------------------------------------------------------

/// A finished unit of text handed to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    /// Trimmed sentence text, never empty.
    pub text: String,
    /// Whitespace that followed the text on screen and was trimmed away.
    /// A rewrite must delete and retype it to keep the cursor in place.
    pub trailing: Option<char>,
}

impl Sentence {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            trailing: None,
        }
    }
}

// ---------------------------------------------------------------------------
// KeyInputAccumulator
// ---------------------------------------------------------------------------

/// Builds sentences out of key presses.
///
/// Invariant: `deadline` is `Some` only while the buffer is non-empty.
#[derive(Debug)]
pub struct KeyInputAccumulator {
    buffer: String,
    last_mutation_at: Option<Instant>,
    deadline: Option<Instant>,
    debounce: Duration,
    terminators: Vec<char>,
}

impl KeyInputAccumulator {
    pub fn new(debounce: Duration, terminators: &str) -> Self {
        Self {
            buffer: String::new(),
            last_mutation_at: None,
            deadline: None,
            debounce,
            terminators: terminators.chars().collect(),
        }
    }

    /// Current (untrimmed) buffer contents.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// When the buffer was last appended to or shortened.
    pub fn last_mutation_at(&self) -> Option<Instant> {
        self.last_mutation_at
    }

    /// When the pending inactivity flush is due, if one is scheduled.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_idle(&self) -> bool {
        self.buffer.is_empty() && self.deadline.is_none()
    }

    /// Apply one key press.  Returns a sentence when the key ended one.
    pub fn on_key(&mut self, event: &KeyEvent) -> Option<Sentence> {
        let at = event.pressed_at;

        match event.kind {
            KeyKind::Printable(c) => {
                self.buffer.push(c);
                self.last_mutation_at = Some(at);
                if self.terminators.contains(&c) {
                    return self.flush();
                }
            }
            KeyKind::Space => {
                if !self.buffer.is_empty() && !self.buffer.ends_with(' ') {
                    self.buffer.push(' ');
                    self.last_mutation_at = Some(at);
                }
            }
            KeyKind::Backspace => {
                if self.buffer.pop().is_some() {
                    self.last_mutation_at = Some(at);
                }
            }
            // Not text, but still activity.
            KeyKind::Other => {}
        }

        self.reschedule(at);
        None
    }

    /// Flush if the inactivity deadline has passed at `now`.
    pub fn on_timer(&mut self, now: Instant) -> Option<Sentence> {
        match self.deadline {
            Some(deadline) if deadline <= now => self.flush(),
            _ => None,
        }
    }

    /// Finalise the buffer.  Whitespace-only content is dropped silently.
    pub fn flush(&mut self) -> Option<Sentence> {
        self.deadline = None;
        let raw = std::mem::take(&mut self.buffer);

        let text = raw.trim();
        if text.is_empty() {
            return None;
        }

        let trailing = raw.chars().last().filter(|c| c.is_whitespace());
        log::debug!("capture: sentence flushed: {:?}", text);
        Some(Sentence {
            text: text.to_string(),
            trailing,
        })
    }

    /// Drop the pending timer without flushing; the buffer is kept.
    pub fn cancel_timer(&mut self) {
        self.deadline = None;
    }

    /// Discard both the buffer and the pending timer.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.deadline = None;
    }

    fn reschedule(&mut self, at: Instant) {
        self.deadline = if self.buffer.is_empty() {
            None
        } else {
            Some(at + self.debounce)
        };
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
