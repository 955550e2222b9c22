//! The synthetic-input capability the rewriter drives.

use std::borrow::Cow;
use std::sync::Arc;

use super::RewriteError;

/// Characters SendKeys-style automation treats as commands.
const SENDKEYS_SPECIALS: &[char] = &['+', '^', '%', '~', '(', ')', '{', '}', '[', ']'];

/// How literal text must be encoded before a sink types it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EscapeRule {
    /// The sink types text verbatim.
    #[default]
    Literal,
    /// SendKeys syntax: each special character is wrapped in braces.
    SendKeys,
}

impl EscapeRule {
    /// Encode `text` for a sink using this rule.
    ///
    /// ```
    /// use text_pilot::rewrite::EscapeRule;
    ///
    /// assert_eq!(EscapeRule::SendKeys.escape("a+b"), "a{+}b");
    /// assert_eq!(EscapeRule::Literal.escape("a+b"), "a+b");
    /// ```
    pub fn escape<'a>(&self, text: &'a str) -> Cow<'a, str> {
        match self {
            EscapeRule::Literal => Cow::Borrowed(text),
            EscapeRule::SendKeys => {
                if !text.contains(SENDKEYS_SPECIALS) {
                    return Cow::Borrowed(text);
                }
                let mut out = String::with_capacity(text.len() + 8);
                for c in text.chars() {
                    if SENDKEYS_SPECIALS.contains(&c) {
                        out.push('{');
                        out.push(c);
                        out.push('}');
                    } else {
                        out.push(c);
                    }
                }
                Cow::Owned(out)
            }
        }
    }
}

/// Delete and type operations on the focused window.
///
/// Implementations are used from a blocking thread and need not be `Send`.
pub trait SyntheticInputSink {
    /// Press backspace once.
    fn delete(&mut self) -> Result<(), RewriteError>;

    /// Type already-escaped text.
    fn type_text(&mut self, text: &str) -> Result<(), RewriteError>;

    fn escape_rule(&self) -> EscapeRule {
        EscapeRule::Literal
    }
}

/// Builds a fresh sink on the thread that will use it.
pub type SinkFactory =
    Arc<dyn Fn() -> Result<Box<dyn SyntheticInputSink>, RewriteError> + Send + Sync>;
