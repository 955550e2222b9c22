//! [`SyntheticInputSink`] backed by the `enigo` crate.
//!
//! `Enigo` is not `Send`, so a sink is created per rewrite on the blocking
//! thread that runs it (see [`EnigoSink::factory`]).

use std::sync::Arc;

use enigo::{Direction, Enigo, Key, Keyboard, Settings};

use super::sink::{EscapeRule, SinkFactory, SyntheticInputSink};
use super::RewriteError;

pub struct EnigoSink {
    enigo: Enigo,
}

impl EnigoSink {
    pub fn new() -> Result<Self, RewriteError> {
        let enigo =
            Enigo::new(&Settings::default()).map_err(|e| RewriteError::Init(e.to_string()))?;
        Ok(Self { enigo })
    }

    pub fn factory() -> SinkFactory {
        Arc::new(|| Ok(Box::new(EnigoSink::new()?) as Box<dyn SyntheticInputSink>))
    }
}

impl SyntheticInputSink for EnigoSink {
    fn delete(&mut self) -> Result<(), RewriteError> {
        self.enigo
            .key(Key::Backspace, Direction::Click)
            .map_err(|e| RewriteError::KeySimulation(e.to_string()))
    }

    fn type_text(&mut self, text: &str) -> Result<(), RewriteError> {
        self.enigo
            .text(text)
            .map_err(|e| RewriteError::KeySimulation(e.to_string()))
    }

    // enigo types Unicode text directly.
    fn escape_rule(&self) -> EscapeRule {
        EscapeRule::Literal
    }
}
