//! Translation of host key and mouse events into the byte sequences a
//! child process expects, honoring the keyboard- and mouse-related modes.

use bitflags::bitflags;

use crate::modes::{Modes, MouseTracking};

bitflags! {
    /// Keyboard modifier state for input encoding.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Modifiers: u8 {
        const SHIFT = 1 << 0;
        const ALT   = 1 << 1;
        const CTRL  = 1 << 2;
        const META  = 1 << 3;
    }
}

impl Modifiers {
    /// The xterm `;N` modifier parameter: 1 + shift(1) + alt(2) + ctrl(4)
    /// + meta(8).
    fn xterm_param(&self) -> u8 {
        let mut n = 1;
        if self.contains(Modifiers::SHIFT) {
            n += 1;
        }
        if self.contains(Modifiers::ALT) {
            n += 2;
        }
        if self.contains(Modifiers::CTRL) {
            n += 4;
        }
        if self.contains(Modifiers::META) {
            n += 8;
        }
        n
    }
}

/// A logical key event from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Up,
    Down,
    Right,
    Left,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    Delete,
    Backspace,
    Tab,
    Enter,
    Escape,
}

/// Keys on the numeric keypad, encoded per DECNKM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumpadKey {
    Digit(u8),
    Decimal,
    Plus,
    Minus,
    Multiply,
    Divide,
    Enter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    WheelUp,
    WheelDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseEventKind {
    Press,
    Release,
    Motion,
}

/// Encode a key press. Cursor/editing keys follow xterm conventions,
/// switching to SS3 forms under DECCKM; Backspace follows DECBKM.
pub fn encode_key(key: Key, mods: Modifiers, modes: &Modes) -> Vec<u8> {
    match key {
        Key::Char(c) => encode_char(c, mods),
        Key::Up => arrow_key('A', mods, modes),
        Key::Down => arrow_key('B', mods, modes),
        Key::Right => arrow_key('C', mods, modes),
        Key::Left => arrow_key('D', mods, modes),
        Key::Home => arrow_key('H', mods, modes),
        Key::End => arrow_key('F', mods, modes),
        Key::Insert => tilde_key(2, mods),
        Key::Delete => tilde_key(3, mods),
        Key::PageUp => tilde_key(5, mods),
        Key::PageDown => tilde_key(6, mods),
        Key::Backspace => {
            let byte: u8 = if modes.backarrow_sends_bs { 0x08 } else { 0x7f };
            if mods.contains(Modifiers::ALT) {
                vec![0x1b, byte]
            } else {
                vec![byte]
            }
        }
        Key::Tab => {
            if mods.contains(Modifiers::SHIFT) {
                b"\x1b[Z".to_vec()
            } else {
                b"\t".to_vec()
            }
        }
        Key::Enter => b"\r".to_vec(),
        Key::Escape => b"\x1b".to_vec(),
    }
}

fn encode_char(c: char, mods: Modifiers) -> Vec<u8> {
    let mut out = Vec::new();
    if mods.contains(Modifiers::ALT) {
        out.push(0x1b);
    }
    if mods.contains(Modifiers::CTRL) {
        let lower = c.to_ascii_lowercase();
        match lower {
            'a'..='z' => out.push(lower as u8 - b'a' + 1),
            ' ' | '@' => out.push(0x00),
            '[' => out.push(0x1b),
            '\\' => out.push(0x1c),
            ']' => out.push(0x1d),
            '^' => out.push(0x1e),
            '_' => out.push(0x1f),
            '?' => out.push(0x7f),
            _ => out.extend(c.to_string().into_bytes()),
        }
    } else {
        out.extend(c.to_string().into_bytes());
    }
    out
}

fn arrow_key(final_byte: char, mods: Modifiers, modes: &Modes) -> Vec<u8> {
    if mods.is_empty() {
        if modes.cursor_keys_application {
            format!("\x1bO{}", final_byte).into_bytes()
        } else {
            format!("\x1b[{}", final_byte).into_bytes()
        }
    } else {
        format!("\x1b[1;{}{}", mods.xterm_param(), final_byte).into_bytes()
    }
}

fn tilde_key(code: u8, mods: Modifiers) -> Vec<u8> {
    if mods.is_empty() {
        format!("\x1b[{}~", code).into_bytes()
    } else {
        format!("\x1b[{};{}~", code, mods.xterm_param()).into_bytes()
    }
}

/// Encode a function key F1..F12. Out-of-range keys encode to nothing.
pub fn encode_fkey(n: u8, mods: Modifiers) -> Vec<u8> {
    match n {
        1..=4 => {
            let final_byte = (b'P' + n - 1) as char;
            if mods.is_empty() {
                format!("\x1bO{}", final_byte).into_bytes()
            } else {
                format!("\x1b[1;{}{}", mods.xterm_param(), final_byte).into_bytes()
            }
        }
        5..=12 => {
            let code = match n {
                5 => 15,
                6 => 17,
                7 => 18,
                8 => 19,
                9 => 20,
                10 => 21,
                11 => 23,
                _ => 24,
            };
            tilde_key(code, mods)
        }
        _ => Vec::new(),
    }
}

/// Encode a numeric-keypad key: literal characters in numeric mode, SS3
/// sequences in application mode.
pub fn encode_numpad(key: NumpadKey, application: bool) -> Vec<u8> {
    if !application {
        return match key {
            NumpadKey::Digit(d) => vec![b'0' + d.min(9)],
            NumpadKey::Decimal => b".".to_vec(),
            NumpadKey::Plus => b"+".to_vec(),
            NumpadKey::Minus => b"-".to_vec(),
            NumpadKey::Multiply => b"*".to_vec(),
            NumpadKey::Divide => b"/".to_vec(),
            NumpadKey::Enter => b"\r".to_vec(),
        };
    }
    let final_byte = match key {
        NumpadKey::Digit(d) => b'p' + d.min(9),
        NumpadKey::Decimal => b'n',
        NumpadKey::Plus => b'k',
        NumpadKey::Minus => b'm',
        NumpadKey::Multiply => b'j',
        NumpadKey::Divide => b'o',
        NumpadKey::Enter => b'M',
    };
    vec![0x1b, b'O', final_byte]
}

/// Encode a mouse event per the active tracking mode and report format.
/// Returns nothing when the event is not reportable under the current
/// mode. Coordinates are 0-based cell positions.
pub fn encode_mouse(
    x: usize,
    y: usize,
    button: MouseButton,
    kind: MouseEventKind,
    mods: Modifiers,
    modes: &Modes,
) -> Vec<u8> {
    let reportable = match modes.mouse {
        MouseTracking::Off => false,
        MouseTracking::X10 => kind == MouseEventKind::Press,
        MouseTracking::Normal => kind != MouseEventKind::Motion,
        MouseTracking::ButtonEvent | MouseTracking::AnyEvent => true,
    };
    if !reportable {
        return Vec::new();
    }

    let mut code: u8 = match button {
        MouseButton::Left => 0,
        MouseButton::Middle => 1,
        MouseButton::Right => 2,
        MouseButton::WheelUp => 64,
        MouseButton::WheelDown => 65,
    };
    if kind == MouseEventKind::Motion {
        code += 32;
    }
    // X10 mode predates modifier reporting.
    if modes.mouse != MouseTracking::X10 {
        if mods.contains(Modifiers::SHIFT) {
            code += 4;
        }
        if mods.contains(Modifiers::META) {
            code += 8;
        }
        if mods.contains(Modifiers::CTRL) {
            code += 16;
        }
    }

    if modes.sgr_mouse {
        let suffix = if kind == MouseEventKind::Release { 'm' } else { 'M' };
        format!("\x1b[<{};{};{}{}", code, x + 1, y + 1, suffix).into_bytes()
    } else {
        if kind == MouseEventKind::Release {
            // Legacy reports cannot say which button was released.
            code = (code & !0b11) | 3;
        }
        let cx = (x + 1).min(223) as u8 + 32;
        let cy = (y + 1).min(223) as u8 + 32;
        vec![0x1b, b'[', b'M', 32 + code, cx, cy]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ctrl_letters_map_to_control_bytes() {
        assert_eq!(
            encode_key(Key::Char('c'), Modifiers::CTRL, &Modes::default()),
            vec![0x03]
        );
        assert_eq!(
            encode_key(Key::Char('A'), Modifiers::CTRL, &Modes::default()),
            vec![0x01]
        );
        assert_eq!(
            encode_key(Key::Char('['), Modifiers::CTRL, &Modes::default()),
            vec![0x1b]
        );
    }

    #[test]
    fn backspace_follows_decbkm() {
        let mut modes = Modes::default();
        assert_eq!(encode_key(Key::Backspace, Modifiers::empty(), &modes), b"\x7f");
        modes.backarrow_sends_bs = true;
        assert_eq!(encode_key(Key::Backspace, Modifiers::empty(), &modes), b"\x08");
    }

    #[test]
    fn arrows_switch_on_deckcm() {
        let mut modes = Modes::default();
        assert_eq!(encode_key(Key::Up, Modifiers::empty(), &modes), b"\x1b[A");
        modes.cursor_keys_application = true;
        assert_eq!(encode_key(Key::Up, Modifiers::empty(), &modes), b"\x1bOA");
        // Modified arrows always use the CSI form.
        assert_eq!(
            encode_key(Key::Up, Modifiers::SHIFT, &modes),
            b"\x1b[1;2A"
        );
    }

    #[test]
    fn editing_keys_use_tilde_forms() {
        let modes = Modes::default();
        assert_eq!(encode_key(Key::PageUp, Modifiers::empty(), &modes), b"\x1b[5~");
        assert_eq!(
            encode_key(Key::Delete, Modifiers::CTRL, &modes),
            b"\x1b[3;5~"
        );
    }

    #[test]
    fn function_keys() {
        assert_eq!(encode_fkey(1, Modifiers::empty()), b"\x1bOP");
        assert_eq!(encode_fkey(4, Modifiers::empty()), b"\x1bOS");
        assert_eq!(encode_fkey(1, Modifiers::CTRL), b"\x1b[1;5P");
        assert_eq!(encode_fkey(5, Modifiers::empty()), b"\x1b[15~");
        assert_eq!(encode_fkey(12, Modifiers::SHIFT), b"\x1b[24;2~");
        assert_eq!(encode_fkey(13, Modifiers::empty()), b"");
    }

    #[test]
    fn numpad_numeric_vs_application() {
        assert_eq!(encode_numpad(NumpadKey::Digit(0), false), b"0");
        assert_eq!(encode_numpad(NumpadKey::Enter, false), b"\r");
        let expect: [(NumpadKey, &[u8]); 7] = [
            (NumpadKey::Digit(0), b"\x1bOp"),
            (NumpadKey::Digit(9), b"\x1bOy"),
            (NumpadKey::Decimal, b"\x1bOn"),
            (NumpadKey::Plus, b"\x1bOk"),
            (NumpadKey::Minus, b"\x1bOm"),
            (NumpadKey::Multiply, b"\x1bOj"),
            (NumpadKey::Divide, b"\x1bOo"),
        ];
        for (key, bytes) in expect {
            assert_eq!(encode_numpad(key, true), bytes, "key {:?}", key);
        }
        assert_eq!(encode_numpad(NumpadKey::Enter, true), b"\x1bOM");
    }

    #[test]
    fn mouse_off_reports_nothing() {
        let modes = Modes::default();
        assert!(encode_mouse(
            0,
            0,
            MouseButton::Left,
            MouseEventKind::Press,
            Modifiers::empty(),
            &modes
        )
        .is_empty());
    }

    #[test]
    fn legacy_mouse_encoding() {
        let mut modes = Modes::default();
        modes.mouse = MouseTracking::Normal;
        let bytes = encode_mouse(
            9,
            4,
            MouseButton::Left,
            MouseEventKind::Press,
            Modifiers::empty(),
            &modes,
        );
        assert_eq!(bytes, vec![0x1b, b'[', b'M', 32, 32 + 10, 32 + 5]);
        let release = encode_mouse(
            9,
            4,
            MouseButton::Left,
            MouseEventKind::Release,
            Modifiers::empty(),
            &modes,
        );
        assert_eq!(release[3], 32 + 3, "legacy release is always button 3");
    }

    #[test]
    fn sgr_mouse_encoding() {
        let mut modes = Modes::default();
        modes.mouse = MouseTracking::Normal;
        modes.sgr_mouse = true;
        assert_eq!(
            encode_mouse(
                14,
                7,
                MouseButton::Left,
                MouseEventKind::Press,
                Modifiers::SHIFT | Modifiers::CTRL,
                &modes
            ),
            b"\x1b[<20;15;8M"
        );
        assert_eq!(
            encode_mouse(
                14,
                7,
                MouseButton::Left,
                MouseEventKind::Release,
                Modifiers::empty(),
                &modes
            ),
            b"\x1b[<0;15;8m"
        );
    }

    #[test]
    fn motion_filtered_by_tracking_model() {
        let mut modes = Modes::default();
        modes.mouse = MouseTracking::Normal;
        assert!(encode_mouse(
            1,
            1,
            MouseButton::Left,
            MouseEventKind::Motion,
            Modifiers::empty(),
            &modes
        )
        .is_empty());
        modes.mouse = MouseTracking::ButtonEvent;
        let bytes = encode_mouse(
            1,
            1,
            MouseButton::Left,
            MouseEventKind::Motion,
            Modifiers::empty(),
            &modes,
        );
        assert_eq!(bytes[3], 32 + 32, "motion adds 32 to the button code");
        modes.mouse = MouseTracking::X10;
        assert!(
            encode_mouse(
                1,
                1,
                MouseButton::Left,
                MouseEventKind::Release,
                Modifiers::empty(),
                &modes
            )
            .is_empty(),
            "X10 reports presses only"
        );
    }
}
