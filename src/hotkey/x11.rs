//! Hot key for Linux using an X11 passive key grab on the root window.

use anyhow::{Context, Result};
use tracing::debug;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{ConnectionExt as _, GrabMode, Keycode, Keysym, ModMask, Timestamp};
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;

use super::{send_press, HotKeyChord, Key, Modifiers};
use crate::trigger::TriggerSender;

/// Grab the chord and block the calling thread waiting for presses.
pub fn listen(chord: HotKeyChord, intake: TriggerSender) -> Result<()> {
    let (conn, screen_num) =
        RustConnection::connect(None).context("Failed to connect to X11 display. Is DISPLAY set?")?;
    let root = conn.setup().roots[screen_num].root;

    let keysym = keysym(chord.key).with_context(|| format!("{} cannot be grabbed", chord.key))?;
    let keycode = keycode_for(&conn, keysym)?
        .with_context(|| format!("No keycode produces {}", chord.key))?;
    let mask = modifier_mask(chord.modifiers);

    // Caps Lock (LOCK) and Num Lock (M2) must not defeat the grab.
    for extra in [ModMask::from(0u16), ModMask::LOCK, ModMask::M2, ModMask::LOCK | ModMask::M2] {
        conn.grab_key(false, root, mask | extra, keycode, GrabMode::ASYNC, GrabMode::ASYNC)?
            .check()
            .context("Hot key is already grabbed by another client")?;
    }
    conn.flush()?;
    debug!("Grabbed keycode {} with mask {:#x}", keycode, u16::from(mask));

    let mut repeat = RepeatFilter::default();
    loop {
        match conn.wait_for_event()? {
            Event::KeyPress(ev) if ev.detail == keycode => {
                if repeat.press(ev.time) && !send_press(&intake) {
                    return Ok(());
                }
            }
            Event::KeyRelease(ev) if ev.detail == keycode => repeat.release(ev.time),
            _ => {}
        }
    }
}

fn keycode_for(conn: &RustConnection, keysym: Keysym) -> Result<Option<Keycode>> {
    let setup = conn.setup();
    let (min, max) = (setup.min_keycode, setup.max_keycode);
    let reply = conn
        .get_keyboard_mapping(min, max - min + 1)?
        .reply()
        .context("Failed to read keyboard mapping")?;

    let per_keycode = usize::from(reply.keysyms_per_keycode);
    if per_keycode == 0 {
        return Ok(None);
    }
    Ok(reply
        .keysyms
        .chunks(per_keycode)
        .position(|syms| syms.contains(&keysym))
        .map(|i| min + i as Keycode))
}

fn modifier_mask(modifiers: Modifiers) -> ModMask {
    let mut mask = ModMask::from(0u16);
    for (held, bit) in [
        (modifiers.shift, ModMask::SHIFT),
        (modifiers.control, ModMask::CONTROL),
        (modifiers.option, ModMask::M1),
        (modifiers.command, ModMask::M4),
    ] {
        if held {
            mask = mask | bit;
        }
    }
    mask
}

/// X keysym of a non-modifier key.
fn keysym(key: Key) -> Option<Keysym> {
    match key {
        Key::Char(c) if c.is_ascii_alphanumeric() => Some(c.to_ascii_lowercase() as Keysym),
        Key::F(n) if (1..=12).contains(&n) => Some(0xffbe + Keysym::from(n) - 1),
        Key::Space => Some(0x0020),
        Key::Escape => Some(0xff1b),
        Key::Return => Some(0xff0d),
        Key::Tab => Some(0xff09),
        _ => None,
    }
}

/// X reports auto-repeat as a release and a press carrying the same
/// timestamp. Only the first press of a hold gets through.
#[derive(Debug, Default)]
struct RepeatFilter {
    down: bool,
    last_release: Option<Timestamp>,
}

impl RepeatFilter {
    fn press(&mut self, time: Timestamp) -> bool {
        let repeat = self.down || self.last_release == Some(time);
        self.down = true;
        !repeat
    }

    fn release(&mut self, time: Timestamp) {
        self.down = false;
        self.last_release = Some(time);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keysyms() {
        assert_eq!(keysym(Key::Char('s')), Some(0x73));
        assert_eq!(keysym(Key::Char('7')), Some(0x37));
        assert_eq!(keysym(Key::F(1)), Some(0xffbe));
        assert_eq!(keysym(Key::F(12)), Some(0xffc9));
        assert_eq!(keysym(Key::ShiftLeft), None);
    }

    #[test]
    fn test_modifier_mask() {
        let mask = modifier_mask(HotKeyChord::default().modifiers);
        assert_eq!(u16::from(mask), u16::from(ModMask::SHIFT | ModMask::M4));
        assert_eq!(u16::from(modifier_mask(Modifiers::default())), 0);
    }

    #[test]
    fn test_repeat_filter() {
        let mut filter = RepeatFilter::default();
        assert!(filter.press(100));
        // Auto-repeat pair.
        filter.release(150);
        assert!(!filter.press(150));
        filter.release(400);
        assert!(filter.press(900));
    }
}
