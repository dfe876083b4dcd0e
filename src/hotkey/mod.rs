//! Global hot-key adapter with platform-specific listeners.
//!
//! Every listener sends one hot-key trigger per physical press of the
//! configured chord. Auto-repeat while the chord is held does not count.

#[cfg(any(target_os = "macos", target_os = "windows"))]
mod hook;
#[cfg(target_os = "linux")]
mod x11;

use std::fmt;
use std::str::FromStr;
use std::thread::{self, JoinHandle};
use thiserror::Error;
use tracing::{error, info};

use crate::trigger::TriggerSender;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HotKeyError {
    #[error("hot-key chord is empty")]
    Empty,
    #[error("unknown key name: {0:?}")]
    UnknownKey(String),
    #[error("hot-key chord has no non-modifier key")]
    MissingKey,
    #[error("hot-key chord names more than one key: {0:?}")]
    MultipleKeys(String),
}

/// Keys a chord can be built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// Lowercase ASCII letter or digit.
    Char(char),
    /// Function key F1-F12.
    F(u8),
    Space,
    Escape,
    Return,
    Tab,
    // Modifier keys only come from the hook backend. X11 grabs work on masks.
    #[cfg(any(target_os = "macos", target_os = "windows", test))]
    MetaLeft,
    #[cfg(any(target_os = "macos", target_os = "windows", test))]
    MetaRight,
    #[cfg(any(target_os = "macos", target_os = "windows", test))]
    ShiftLeft,
    #[cfg(any(target_os = "macos", target_os = "windows", test))]
    ShiftRight,
    #[cfg(any(target_os = "macos", target_os = "windows", test))]
    Alt,
    #[cfg(any(target_os = "macos", target_os = "windows", test))]
    AltGr,
    #[cfg(any(target_os = "macos", target_os = "windows", test))]
    ControlLeft,
    #[cfg(any(target_os = "macos", target_os = "windows", test))]
    ControlRight,
}

#[cfg(any(target_os = "macos", target_os = "windows", test))]
impl Key {
    pub fn is_modifier(&self) -> bool {
        matches!(
            self,
            Key::MetaLeft
                | Key::MetaRight
                | Key::ShiftLeft
                | Key::ShiftRight
                | Key::Alt
                | Key::AltGr
                | Key::ControlLeft
                | Key::ControlRight
        )
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Char(c) => write!(f, "{}", c),
            Key::F(n) => write!(f, "f{}", n),
            other => write!(f, "{}", format!("{:?}", other).to_lowercase()),
        }
    }
}

/// Parse a non-modifier key name.
fn parse_key(name: &str) -> Option<Key> {
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return c.is_ascii_alphanumeric().then(|| Key::Char(c.to_ascii_lowercase()));
    }

    match name {
        "space" => Some(Key::Space),
        "escape" | "esc" => Some(Key::Escape),
        "return" | "enter" => Some(Key::Return),
        "tab" => Some(Key::Tab),
        _ => name
            .strip_prefix('f')
            .and_then(|n| n.parse::<u8>().ok())
            .filter(|n| (1..=12).contains(n))
            .map(Key::F),
    }
}

/// Modifier mask of a chord.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub command: bool,
    pub shift: bool,
    pub option: bool,
    pub control: bool,
}

#[cfg(any(target_os = "macos", target_os = "windows", test))]
impl Modifiers {
    fn from_held(held: &[Key]) -> Self {
        let mut mods = Self::default();
        for key in held {
            match key {
                Key::MetaLeft | Key::MetaRight => mods.command = true,
                Key::ShiftLeft | Key::ShiftRight => mods.shift = true,
                Key::Alt | Key::AltGr => mods.option = true,
                Key::ControlLeft | Key::ControlRight => mods.control = true,
                _ => {}
            }
        }
        mods
    }
}

/// A modifier mask plus one key, e.g. `cmd+shift+s`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotKeyChord {
    pub modifiers: Modifiers,
    pub key: Key,
}

impl Default for HotKeyChord {
    /// Command + Shift + S.
    fn default() -> Self {
        Self {
            modifiers: Modifiers {
                command: true,
                shift: true,
                ..Modifiers::default()
            },
            key: Key::Char('s'),
        }
    }
}

impl FromStr for HotKeyChord {
    type Err = HotKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(HotKeyError::Empty);
        }

        let mut modifiers = Modifiers::default();
        let mut key = None;

        for part in s.split('+').map(|p| p.trim().to_lowercase()) {
            match part.as_str() {
                "cmd" | "command" | "meta" | "super" => modifiers.command = true,
                "shift" => modifiers.shift = true,
                "alt" | "option" | "opt" => modifiers.option = true,
                "ctrl" | "control" => modifiers.control = true,
                name => {
                    let parsed = parse_key(name).ok_or_else(|| HotKeyError::UnknownKey(name.to_string()))?;
                    if key.replace(parsed).is_some() {
                        return Err(HotKeyError::MultipleKeys(s.to_string()));
                    }
                }
            }
        }

        let key = key.ok_or(HotKeyError::MissingKey)?;
        Ok(Self { modifiers, key })
    }
}

impl fmt::Display for HotKeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = &self.modifiers;
        for (held, name) in [
            (m.command, "cmd"),
            (m.control, "ctrl"),
            (m.option, "alt"),
            (m.shift, "shift"),
        ] {
            if held {
                write!(f, "{}+", name)?;
            }
        }
        write!(f, "{}", self.key)
    }
}

/// Raw key transition.
#[cfg(any(target_os = "macos", target_os = "windows", test))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Press(Key),
    Release(Key),
}

/// Turns raw key transitions into chord presses.
///
/// The held modifiers must match the chord exactly. Auto-repeat presses of
/// the chord key are ignored until it is released.
#[cfg(any(target_os = "macos", target_os = "windows", test))]
pub struct ChordMatcher {
    chord: HotKeyChord,
    held: Vec<Key>,
    key_down: bool,
}

#[cfg(any(target_os = "macos", target_os = "windows", test))]
impl ChordMatcher {
    pub fn new(chord: HotKeyChord) -> Self {
        Self {
            chord,
            held: Vec::new(),
            key_down: false,
        }
    }

    /// Returns `true` when this transition is a fresh chord press.
    pub fn handle(&mut self, action: KeyAction) -> bool {
        match action {
            KeyAction::Press(key) if key.is_modifier() => {
                if !self.held.contains(&key) {
                    self.held.push(key);
                }
                false
            }
            KeyAction::Release(key) if key.is_modifier() => {
                self.held.retain(|k| *k != key);
                false
            }
            KeyAction::Press(key) if key == self.chord.key => {
                if self.key_down {
                    return false;
                }
                self.key_down = true;
                Modifiers::from_held(&self.held) == self.chord.modifiers
            }
            KeyAction::Release(key) if key == self.chord.key => {
                self.key_down = false;
                false
            }
            _ => false,
        }
    }
}

/// Send one hot-key trigger. Returns `false` once the arbiter has shut down
/// and the listener should stop.
#[cfg(any(target_os = "macos", target_os = "windows", target_os = "linux", test))]
fn send_press(intake: &TriggerSender) -> bool {
    use crate::trigger::{TriggerCandidate, TriggerSource};

    tracing::debug!("Hot key pressed");
    if intake.send(TriggerCandidate::now(TriggerSource::HotKey)).is_err() {
        tracing::debug!("Trigger intake closed, dropping hot key press");
        return false;
    }
    true
}

/// Install the global hot key on its own thread.
///
/// If the OS refuses (missing input-monitoring permission, no display) the
/// failure is logged and no hot-key triggers arrive.
pub fn spawn_listener(chord: HotKeyChord, intake: TriggerSender) -> std::io::Result<JoinHandle<()>> {
    info!("Listening for hot key {}", chord);

    thread::Builder::new()
        .name("hotkey-listener".to_string())
        .spawn(move || {
            if let Err(e) = listen(chord, intake) {
                error!("Hot-key listener failed: {:#}", e);
            }
        })
}

#[cfg(any(target_os = "macos", target_os = "windows"))]
use hook::listen;
#[cfg(target_os = "linux")]
use x11::listen;

#[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
fn listen(_chord: HotKeyChord, _intake: TriggerSender) -> anyhow::Result<()> {
    anyhow::bail!("global hot keys are not supported on this platform")
}
