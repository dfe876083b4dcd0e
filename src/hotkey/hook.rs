//! Hot key for macOS and Windows via an `rdev` global keyboard hook.

use anyhow::Result;
use rdev::{Event, EventType};

use super::{send_press, ChordMatcher, HotKeyChord, Key, KeyAction};
use crate::trigger::TriggerSender;

/// Block the calling thread feeding every key event into a chord matcher.
pub fn listen(chord: HotKeyChord, intake: TriggerSender) -> Result<()> {
    let mut matcher = ChordMatcher::new(chord);

    rdev::listen(move |event: Event| {
        let action = match event.event_type {
            EventType::KeyPress(key) => from_rdev(key).map(KeyAction::Press),
            EventType::KeyRelease(key) => from_rdev(key).map(KeyAction::Release),
            _ => None,
        };
        if let Some(action) = action {
            // rdev cannot be stopped from inside the callback; later
            // presses are dropped once the intake is closed.
            if matcher.handle(action) {
                send_press(&intake);
            }
        }
    })
    .map_err(|e| anyhow::anyhow!("Failed to install keyboard hook: {:?}", e))
}

fn from_rdev(key: rdev::Key) -> Option<Key> {
    use rdev::Key as R;

    let key = match key {
        R::KeyA => Key::Char('a'),
        R::KeyB => Key::Char('b'),
        R::KeyC => Key::Char('c'),
        R::KeyD => Key::Char('d'),
        R::KeyE => Key::Char('e'),
        R::KeyF => Key::Char('f'),
        R::KeyG => Key::Char('g'),
        R::KeyH => Key::Char('h'),
        R::KeyI => Key::Char('i'),
        R::KeyJ => Key::Char('j'),
        R::KeyK => Key::Char('k'),
        R::KeyL => Key::Char('l'),
        R::KeyM => Key::Char('m'),
        R::KeyN => Key::Char('n'),
        R::KeyO => Key::Char('o'),
        R::KeyP => Key::Char('p'),
        R::KeyQ => Key::Char('q'),
        R::KeyR => Key::Char('r'),
        R::KeyS => Key::Char('s'),
        R::KeyT => Key::Char('t'),
        R::KeyU => Key::Char('u'),
        R::KeyV => Key::Char('v'),
        R::KeyW => Key::Char('w'),
        R::KeyX => Key::Char('x'),
        R::KeyY => Key::Char('y'),
        R::KeyZ => Key::Char('z'),
        R::Num0 => Key::Char('0'),
        R::Num1 => Key::Char('1'),
        R::Num2 => Key::Char('2'),
        R::Num3 => Key::Char('3'),
        R::Num4 => Key::Char('4'),
        R::Num5 => Key::Char('5'),
        R::Num6 => Key::Char('6'),
        R::Num7 => Key::Char('7'),
        R::Num8 => Key::Char('8'),
        R::Num9 => Key::Char('9'),
        R::F1 => Key::F(1),
        R::F2 => Key::F(2),
        R::F3 => Key::F(3),
        R::F4 => Key::F(4),
        R::F5 => Key::F(5),
        R::F6 => Key::F(6),
        R::F7 => Key::F(7),
        R::F8 => Key::F(8),
        R::F9 => Key::F(9),
        R::F10 => Key::F(10),
        R::F11 => Key::F(11),
        R::F12 => Key::F(12),
        R::Space => Key::Space,
        R::Escape => Key::Escape,
        R::Return => Key::Return,
        R::Tab => Key::Tab,
        R::MetaLeft => Key::MetaLeft,
        R::MetaRight => Key::MetaRight,
        R::ShiftLeft => Key::ShiftLeft,
        R::ShiftRight => Key::ShiftRight,
        R::Alt => Key::Alt,
        R::AltGr => Key::AltGr,
        R::ControlLeft => Key::ControlLeft,
        R::ControlRight => Key::ControlRight,
        _ => return None,
    };
    Some(key)
}
