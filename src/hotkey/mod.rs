//! Optional global "advance playback" key, backed by `rdev`.
//!
//! `rdev::listen()` blocks for the life of the process, so it runs on a
//! dedicated OS thread (see [`HotkeyListener`]).  Each press of the
//! configured key is forwarded as [`ControlEvent::Advance`]; holding the key
//! down does not repeat.
//!
//! ```no_run
//! use tokio::sync::mpsc;
//! use bilingual_reader::hotkey::{parse_key, HotkeyListener};
//!
//! let (tx, _rx) = mpsc::channel(16);
//! let key = parse_key("F8").expect("unknown key");
//! let _listener = HotkeyListener::start(key, tx).expect("no listener thread");
//! ```
//!
//! [`ControlEvent::Advance`]: crate::controller::ControlEvent::Advance

pub mod listener;

pub use listener::HotkeyListener;

use rdev::Key;

const FUNCTION_KEYS: [Key; 12] = [
    Key::F1,
    Key::F2,
    Key::F3,
    Key::F4,
    Key::F5,
    Key::F6,
    Key::F7,
    Key::F8,
    Key::F9,
    Key::F10,
    Key::F11,
    Key::F12,
];

const LETTER_KEYS: [Key; 26] = [
    Key::KeyA,
    Key::KeyB,
    Key::KeyC,
    Key::KeyD,
    Key::KeyE,
    Key::KeyF,
    Key::KeyG,
    Key::KeyH,
    Key::KeyI,
    Key::KeyJ,
    Key::KeyK,
    Key::KeyL,
    Key::KeyM,
    Key::KeyN,
    Key::KeyO,
    Key::KeyP,
    Key::KeyQ,
    Key::KeyR,
    Key::KeyS,
    Key::KeyT,
    Key::KeyU,
    Key::KeyV,
    Key::KeyW,
    Key::KeyX,
    Key::KeyY,
    Key::KeyZ,
];

/// Parse a key name from config into an [`rdev::Key`].
///
/// Accepts `F1`–`F12`, single letters and a handful of named keys, all
/// case-insensitively.  `None` for anything else.
///
/// ```
/// use bilingual_reader::hotkey::parse_key;
///
/// assert_eq!(parse_key("f8"), Some(rdev::Key::F8));
/// assert_eq!(parse_key("Pause"), Some(rdev::Key::Pause));
/// assert_eq!(parse_key("F13"), None);
/// ```
pub fn parse_key(name: &str) -> Option<Key> {
    let name = name.trim();

    if let Some(number) = name
        .strip_prefix(['F', 'f'])
        .and_then(|n| n.parse::<usize>().ok())
    {
        return FUNCTION_KEYS.get(number.checked_sub(1)?).copied();
    }

    if let [letter] = name.as_bytes() {
        if letter.is_ascii_alphabetic() {
            return LETTER_KEYS
                .get(usize::from(letter.to_ascii_uppercase() - b'A'))
                .copied();
        }
    }

    match name.to_ascii_lowercase().as_str() {
        "space" => Some(Key::Space),
        "pause" => Some(Key::Pause),
        "insert" | "ins" => Some(Key::Insert),
        "home" => Some(Key::Home),
        "end" => Some(Key::End),
        "pageup" => Some(Key::PageUp),
        "pagedown" => Some(Key::PageDown),
        "scrolllock" => Some(Key::ScrollLock),
        "printscreen" => Some(Key::PrintScreen),
        "right" | "rightarrow" => Some(Key::RightArrow),
        "left" | "leftarrow" => Some(Key::LeftArrow),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_keys_in_range() {
        assert_eq!(parse_key("F1"), Some(Key::F1));
        assert_eq!(parse_key("f12"), Some(Key::F12));
        assert_eq!(parse_key("F0"), None);
        assert_eq!(parse_key("F13"), None);
    }

    #[test]
    fn single_letters_either_case() {
        assert_eq!(parse_key("a"), Some(Key::KeyA));
        assert_eq!(parse_key("Z"), Some(Key::KeyZ));
        // A lone "F" is the letter, not a function key.
        assert_eq!(parse_key("f"), Some(Key::KeyF));
    }

    #[test]
    fn named_keys() {
        assert_eq!(parse_key(" PageDown "), Some(Key::PageDown));
        assert_eq!(parse_key("right"), Some(Key::RightArrow));
        assert_eq!(parse_key("SPACE"), Some(Key::Space));
    }

    #[test]
    fn unknown_names() {
        assert_eq!(parse_key(""), None);
        assert_eq!(parse_key("Ctrl+N"), None);
        assert_eq!(parse_key("é"), None);
    }
}
