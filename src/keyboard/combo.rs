//! Key-combination parsing and modifier tracking for the toggle hotkey.

use std::str::FromStr;

use thiserror::Error;

// ---------------------------------------------------------------------------
// HotkeyParseError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HotkeyParseError {
    #[error("hotkey is empty")]
    Empty,

    #[error("unknown modifier {0:?}")]
    UnknownModifier(String),

    #[error("unknown key {0:?}")]
    UnknownKey(String),
}

// ---------------------------------------------------------------------------
// parse_key
// ---------------------------------------------------------------------------

/// Parse a key name from a config string into an [`rdev::Key`].
///
/// Supports F1–F12, common named keys, digits and single ASCII letters.
/// Returns `None` for unrecognised names.
///
/// ```
/// use text_pilot::keyboard::parse_key;
///
/// assert_eq!(parse_key("F9"),      Some(rdev::Key::F9));
/// assert_eq!(parse_key("Escape"),  Some(rdev::Key::Escape));
/// assert_eq!(parse_key("x"),       Some(rdev::Key::KeyX));
/// assert_eq!(parse_key("xyz"),     None);
/// ```
pub fn parse_key(key_str: &str) -> Option<rdev::Key> {
    use rdev::Key::*;

    let key = match key_str {
        "F1" => F1,
        "F2" => F2,
        "F3" => F3,
        "F4" => F4,
        "F5" => F5,
        "F6" => F6,
        "F7" => F7,
        "F8" => F8,
        "F9" => F9,
        "F10" => F10,
        "F11" => F11,
        "F12" => F12,

        "Escape" | "Esc" => Escape,
        "Space" => Space,
        "Return" | "Enter" => Return,
        "Tab" => Tab,
        "Backspace" => Backspace,
        "Delete" | "Del" => Delete,
        "Home" => Home,
        "End" => End,
        "PageUp" => PageUp,
        "PageDown" => PageDown,
        "Insert" => Insert,
        "Pause" => Pause,

        "0" => Num0,
        "1" => Num1,
        "2" => Num2,
        "3" => Num3,
        "4" => Num4,
        "5" => Num5,
        "6" => Num6,
        "7" => Num7,
        "8" => Num8,
        "9" => Num9,

        other => return parse_letter(other),
    };
    Some(key)
}

fn parse_letter(s: &str) -> Option<rdev::Key> {
    use rdev::Key::*;

    let mut chars = s.chars();
    let c = match (chars.next(), chars.next()) {
        (Some(c), None) => c.to_ascii_uppercase(),
        _ => return None,
    };
    let key = match c {
        'A' => KeyA,
        'B' => KeyB,
        'C' => KeyC,
        'D' => KeyD,
        'E' => KeyE,
        'F' => KeyF,
        'G' => KeyG,
        'H' => KeyH,
        'I' => KeyI,
        'J' => KeyJ,
        'K' => KeyK,
        'L' => KeyL,
        'M' => KeyM,
        'N' => KeyN,
        'O' => KeyO,
        'P' => KeyP,
        'Q' => KeyQ,
        'R' => KeyR,
        'S' => KeyS,
        'T' => KeyT,
        'U' => KeyU,
        'V' => KeyV,
        'W' => KeyW,
        'X' => KeyX,
        'Y' => KeyY,
        'Z' => KeyZ,
        _ => return None,
    };
    Some(key)
}

// ---------------------------------------------------------------------------
// Hotkey
// ---------------------------------------------------------------------------

/// A key plus the exact set of modifiers that must be held with it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hotkey {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
    pub key: rdev::Key,
}

impl FromStr for Hotkey {
    type Err = HotkeyParseError;

    /// Parse `"Ctrl+Shift+X"`-style strings.  Modifier names are
    /// case-insensitive; the key itself goes through [`parse_key`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('+').map(str::trim).collect();
        let (key_name, modifiers) = match parts.split_last() {
            Some((key, mods)) if !key.is_empty() => (*key, mods),
            _ => return Err(HotkeyParseError::Empty),
        };

        let mut hotkey = Hotkey {
            ctrl: false,
            shift: false,
            alt: false,
            meta: false,
            key: parse_key(key_name)
                .ok_or_else(|| HotkeyParseError::UnknownKey(key_name.to_string()))?,
        };

        for m in modifiers {
            match m.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => hotkey.ctrl = true,
                "shift" => hotkey.shift = true,
                "alt" | "option" => hotkey.alt = true,
                "meta" | "cmd" | "super" | "win" => hotkey.meta = true,
                _ => return Err(HotkeyParseError::UnknownModifier(m.to_string())),
            }
        }

        Ok(hotkey)
    }
}

// ---------------------------------------------------------------------------
// ModifierState
// ---------------------------------------------------------------------------

/// Which modifier keys are currently held, tracked from raw press/release
/// events on the hook thread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifierState {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
}

impl ModifierState {
    /// Update from a key transition.  Returns `true` if `key` is a modifier.
    pub fn update(&mut self, key: rdev::Key, pressed: bool) -> bool {
        use rdev::Key::*;

        match key {
            ControlLeft | ControlRight => self.ctrl = pressed,
            ShiftLeft | ShiftRight => self.shift = pressed,
            Alt | AltGr => self.alt = pressed,
            MetaLeft | MetaRight => self.meta = pressed,
            _ => return false,
        }
        true
    }

    /// `true` when `key` together with the held modifiers is exactly `hotkey`.
    pub fn matches(&self, hotkey: &Hotkey, key: rdev::Key) -> bool {
        key == hotkey.key
            && self.ctrl == hotkey.ctrl
            && self.shift == hotkey.shift
            && self.alt == hotkey.alt
            && self.meta == hotkey.meta
    }
}
