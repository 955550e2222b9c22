//! In-place rewriting of text the user already typed.
//!
//! A rewrite is: N backspaces (one per character of the original, plus the
//! trailing boundary if there was one), then the corrected text.
//!
//! ```text
//! "Yo echo de menos."  ──17 × ⌫──▶  ""  ──type──▶  "Yo hecho de menos."
//! ```
//!
//! The caller must have paused capture first; the keystrokes emitted here
//! would otherwise be read back as typing.
//!
//! # Usage
//!
//! ```no_run
//! # async fn demo() -> Result<(), text_pilot::rewrite::RewriteError> {
//! use std::time::Duration;
//! use text_pilot::rewrite::{EnigoSink, InputRewriter};
//!
//! let rewriter = InputRewriter::new(EnigoSink::factory(), Duration::from_millis(15), false);
//! rewriter.apply("Yo echo de menos.", "Yo hecho de menos.", None).await?;
//! # Ok(())
//! # }
//! ```

pub mod enigo_sink;
pub mod sink;

pub use enigo_sink::EnigoSink;
pub use sink::{EscapeRule, SinkFactory, SyntheticInputSink};

use std::time::Duration;

use thiserror::Error;

use crate::config::RewriteConfig;

// ---------------------------------------------------------------------------
// RewriteError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum RewriteError {
    /// The platform input backend could not be opened.
    #[error("cannot initialise synthetic input: {0}")]
    Init(String),

    #[error("cannot simulate key press: {0}")]
    KeySimulation(String),

    /// The blocking rewrite task panicked or was cancelled.
    #[error("rewrite task failed: {0}")]
    Internal(String),
}

// ---------------------------------------------------------------------------
// RewritePlan
// ---------------------------------------------------------------------------

/// The exact keystrokes of one rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewritePlan {
    pub deletes: usize,
    /// Escaped text to type, boundary included.
    pub text: String,
}

impl RewritePlan {
    /// `trailing` is the boundary character trimmed off the flushed
    /// sentence.  In phrase mode a space boundary is assumed when none was
    /// recorded.
    pub fn new(
        original: &str,
        corrected: &str,
        trailing: Option<char>,
        phrase_mode: bool,
        rule: EscapeRule,
    ) -> Self {
        let boundary = trailing.or(phrase_mode.then_some(' '));

        let mut text = rule.escape(corrected).into_owned();
        if let Some(c) = boundary {
            text.push(c);
        }

        Self {
            deletes: original.chars().count() + usize::from(boundary.is_some()),
            text,
        }
    }
}

// ---------------------------------------------------------------------------
// InputRewriter
// ---------------------------------------------------------------------------

pub struct InputRewriter {
    factory: SinkFactory,
    key_delay: Duration,
    phrase_mode: bool,
}

impl InputRewriter {
    pub fn new(factory: SinkFactory, key_delay: Duration, phrase_mode: bool) -> Self {
        Self {
            factory,
            key_delay,
            phrase_mode,
        }
    }

    pub fn from_config(factory: SinkFactory, config: &RewriteConfig) -> Self {
        Self::new(factory, config.key_delay(), config.phrase_mode)
    }

    /// Replace `original` (just typed, cursor at its end) with `corrected`.
    ///
    /// Resolves once the sink has accepted every keystroke.  A failure part
    /// way through leaves the input partially rewritten.
    pub async fn apply(
        &self,
        original: &str,
        corrected: &str,
        trailing: Option<char>,
    ) -> Result<(), RewriteError> {
        let factory = self.factory.clone();
        let key_delay = self.key_delay;
        let phrase_mode = self.phrase_mode;
        let original = original.to_string();
        let corrected = corrected.to_string();

        tokio::task::spawn_blocking(move || {
            let mut sink = factory()?;
            let plan = RewritePlan::new(
                &original,
                &corrected,
                trailing,
                phrase_mode,
                sink.escape_rule(),
            );
            log::debug!(
                "rewrite: {} deletes, typing {:?}",
                plan.deletes,
                plan.text
            );
            run_plan(sink.as_mut(), &plan, key_delay)
        })
        .await
        .map_err(|e| RewriteError::Internal(e.to_string()))?
    }
}

fn run_plan(
    sink: &mut dyn SyntheticInputSink,
    plan: &RewritePlan,
    key_delay: Duration,
) -> Result<(), RewriteError> {
    for _ in 0..plan.deletes {
        sink.delete()?;
        if !key_delay.is_zero() {
            std::thread::sleep(key_delay);
        }
    }
    if !plan.text.is_empty() {
        sink.type_text(&plan.text)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Op {
        Delete,
        Type(String),
    }

    struct Recording {
        ops: Arc<Mutex<Vec<Op>>>,
        rule: EscapeRule,
        fail_after: Option<usize>,
    }

    impl SyntheticInputSink for Recording {
        fn delete(&mut self) -> Result<(), RewriteError> {
            let mut ops = self.ops.lock().unwrap();
            if self.fail_after.is_some_and(|n| ops.len() >= n) {
                return Err(RewriteError::KeySimulation("sink gone".into()));
            }
            ops.push(Op::Delete);
            Ok(())
        }

        fn type_text(&mut self, text: &str) -> Result<(), RewriteError> {
            self.ops.lock().unwrap().push(Op::Type(text.to_string()));
            Ok(())
        }

        fn escape_rule(&self) -> EscapeRule {
            self.rule
        }
    }

    fn recorder(
        rule: EscapeRule,
        fail_after: Option<usize>,
    ) -> (SinkFactory, Arc<Mutex<Vec<Op>>>) {
        let ops = Arc::new(Mutex::new(Vec::new()));
        let shared = ops.clone();
        let factory: SinkFactory = Arc::new(move || {
            Ok(Box::new(Recording {
                ops: shared.clone(),
                rule,
                fail_after,
            }) as Box<dyn SyntheticInputSink>)
        });
        (factory, ops)
    }

    fn deletes(ops: &[Op]) -> usize {
        ops.iter().filter(|op| **op == Op::Delete).count()
    }

    #[tokio::test]
    async fn deletes_original_then_types_correction() {
        let (factory, ops) = recorder(EscapeRule::Literal, None);
        let rewriter = InputRewriter::new(factory, Duration::ZERO, false);

        rewriter
            .apply("Yo echo de menos.", "Yo hecho de menos.", None)
            .await
            .unwrap();

        let ops = ops.lock().unwrap();
        assert_eq!(ops.len(), 18);
        assert_eq!(deletes(&ops), "Yo echo de menos.".chars().count());
        assert_eq!(ops.last(), Some(&Op::Type("Yo hecho de menos.".into())));
    }

    #[tokio::test]
    async fn trailing_boundary_is_deleted_and_retyped() {
        let (factory, ops) = recorder(EscapeRule::Literal, None);
        let rewriter = InputRewriter::new(factory, Duration::ZERO, false);

        rewriter.apply("ola que tal", "hola qué tal", Some(' ')).await.unwrap();

        let ops = ops.lock().unwrap();
        assert_eq!(deletes(&ops), 12);
        assert_eq!(ops.last(), Some(&Op::Type("hola qué tal ".into())));
    }

    #[tokio::test]
    async fn multibyte_characters_count_once() {
        let (factory, ops) = recorder(EscapeRule::Literal, None);
        let rewriter = InputRewriter::new(factory, Duration::ZERO, false);

        rewriter.apply("canción", "Canción.", None).await.unwrap();
        assert_eq!(deletes(&ops.lock().unwrap()), 7);
    }

    #[tokio::test]
    async fn sink_escape_rule_is_applied() {
        let (factory, ops) = recorder(EscapeRule::SendKeys, None);
        let rewriter = InputRewriter::new(factory, Duration::ZERO, false);

        rewriter.apply("2+2=4", "2 + 2 = 4", None).await.unwrap();
        assert_eq!(
            ops.lock().unwrap().last(),
            Some(&Op::Type("2 {+} 2 = 4".into()))
        );
    }

    #[tokio::test]
    async fn sink_failure_is_reported() {
        let (factory, ops) = recorder(EscapeRule::Literal, Some(3));
        let rewriter = InputRewriter::new(factory, Duration::ZERO, false);

        let err = rewriter.apply("abcdef", "ABCDEF", None).await.unwrap_err();
        assert!(matches!(err, RewriteError::KeySimulation(_)));
        // Partially applied, nothing typed.
        assert_eq!(*ops.lock().unwrap(), vec![Op::Delete; 3]);
    }

    #[tokio::test]
    async fn factory_failure_is_reported() {
        let factory: SinkFactory = Arc::new(|| Err(RewriteError::Init("no display".into())));
        let rewriter = InputRewriter::new(factory, Duration::ZERO, false);
        assert!(matches!(
            rewriter.apply("a", "b", None).await,
            Err(RewriteError::Init(_))
        ));
    }

    #[test]
    fn phrase_mode_adds_a_boundary() {
        let plan = RewritePlan::new("hola", "Hola", None, true, EscapeRule::Literal);
        assert_eq!(
            plan,
            RewritePlan {
                deletes: 5,
                text: "Hola ".into()
            }
        );
    }

    #[test]
    fn phrase_mode_keeps_the_recorded_boundary() {
        let plan = RewritePlan::new("hola", "Hola", Some('\t'), true, EscapeRule::Literal);
        assert_eq!(plan.deletes, 5);
        assert_eq!(plan.text, "Hola\t");
    }
}
