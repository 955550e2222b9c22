//! Global keyboard capture, backed by `rdev`.
//!
//! # Design
//!
//! `rdev::listen()` is a blocking OS-level call that never returns while the
//! process is alive.  It runs on a **dedicated OS thread** owned by
//! [`KeyListener`], which converts every raw event into a [`KeyEvent`] and
//! queues it as an [`InputEvent`] on a `tokio::sync::mpsc` channel.  Nothing
//! in the hook callback touches capture state directly; the orchestrator
//! consumes the channel on its own task.
//!
//! The same thread watches for the toggle [`Hotkey`] and emits
//! [`InputEvent::ToggleAutoCorrect`] instead of forwarding that chord.
//!
//! # Usage
//!
//! ```no_run
//! use tokio::sync::mpsc;
//! use text_pilot::keyboard::{Hotkey, KeyListener};
//!
//! let (tx, mut rx) = mpsc::channel(256);
//! let toggle: Hotkey = "Ctrl+Shift+X".parse().expect("bad hotkey");
//! let _listener = KeyListener::start(tx, Some(toggle));
//!
//! // In your async loop:
//! // while let Some(ev) = rx.recv().await { ... }
//! ```

pub mod combo;
pub mod listener;

pub use combo::{parse_key, Hotkey, HotkeyParseError, ModifierState};
pub use listener::KeyListener;

use tokio::time::Instant;

// ---------------------------------------------------------------------------
// KeyKind
// ---------------------------------------------------------------------------

/// What a physical key means for sentence capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// A key that produced a visible character (layout and shift applied).
    Printable(char),
    /// The space bar.
    Space,
    /// Backspace.
    Backspace,
    /// Navigation, modifiers, enter, tab, function keys …
    Other,
}

impl KeyKind {
    /// Classify an `rdev` key together with the text the OS reported for it.
    ///
    /// ```
    /// use text_pilot::keyboard::KeyKind;
    ///
    /// assert_eq!(KeyKind::from_rdev(rdev::Key::KeyA, Some("a")), KeyKind::Printable('a'));
    /// assert_eq!(KeyKind::from_rdev(rdev::Key::Space, Some(" ")), KeyKind::Space);
    /// assert_eq!(KeyKind::from_rdev(rdev::Key::Return, Some("\r")), KeyKind::Other);
    /// ```
    pub fn from_rdev(key: rdev::Key, name: Option<&str>) -> Self {
        match key {
            rdev::Key::Space => return KeyKind::Space,
            rdev::Key::Backspace => return KeyKind::Backspace,
            _ => {}
        }

        let mut chars = name.unwrap_or("").chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if !c.is_control() => KeyKind::Printable(c),
            _ => KeyKind::Other,
        }
    }
}

// ---------------------------------------------------------------------------
// KeyEvent
// ---------------------------------------------------------------------------

/// One raw key transition from the OS hook.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyEvent {
    /// Name of the physical key as reported by the hook (e.g. `"KeyA"`).
    pub raw_name: String,
    pub kind: KeyKind,
    /// When the hook saw the event.
    pub pressed_at: Instant,
    /// `true` for key-down, `false` for key-up.
    pub is_press: bool,
}

impl KeyEvent {
    /// A key-down event of the given kind.
    pub fn press(kind: KeyKind, pressed_at: Instant) -> Self {
        let raw_name = match kind {
            KeyKind::Printable(c) => c.to_string(),
            KeyKind::Space => "Space".into(),
            KeyKind::Backspace => "Backspace".into(),
            KeyKind::Other => "Other".into(),
        };
        Self {
            raw_name,
            kind,
            pressed_at,
            is_press: true,
        }
    }

    /// Key-down event for a typed character; `' '` maps to the space bar.
    pub fn typed(c: char, pressed_at: Instant) -> Self {
        let kind = if c == ' ' {
            KeyKind::Space
        } else {
            KeyKind::Printable(c)
        };
        Self::press(kind, pressed_at)
    }
}

// ---------------------------------------------------------------------------
// InputEvent
// ---------------------------------------------------------------------------

/// Messages delivered, in order, to the orchestrator's input channel.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// A key transition from the OS hook.
    Key(KeyEvent),
    /// The toggle hotkey was pressed.
    ToggleAutoCorrect,
    /// Stop processing immediately.
    Shutdown,
}
