//! Boot-protocol keyboard mapping used by the pairing peripheral.
//!
//! The peripheral types the credential it receives into the host as a USB
//! HID boot keyboard and silently skips characters it has no mapping for.
//! This mirrors its table so the app can warn before sending.

/// Modifier bit for left shift
pub const MOD_LEFT_SHIFT: u8 = 1 << 1;

/// Usage IDs from the HID keyboard page
pub mod usage {
    pub const A: u8 = 0x04;
    pub const DIGIT_1: u8 = 0x1E;
    pub const DIGIT_0: u8 = 0x27;
    pub const ENTER: u8 = 0x28;
    pub const BACKSPACE: u8 = 0x2A;
    pub const SPACE: u8 = 0x2C;
    pub const MINUS: u8 = 0x2D;
    pub const EQUAL: u8 = 0x2E;
    pub const LEFT_BRACKET: u8 = 0x2F;
    pub const RIGHT_BRACKET: u8 = 0x30;
    pub const BACKSLASH: u8 = 0x31;
    pub const SEMICOLON: u8 = 0x33;
    pub const APOSTROPHE: u8 = 0x34;
    pub const GRAVE: u8 = 0x35;
    pub const COMMA: u8 = 0x36;
    pub const PERIOD: u8 = 0x37;
    pub const SLASH: u8 = 0x38;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyStroke {
    pub modifiers: u8,
    pub usage: u8,
}

impl KeyStroke {
    const fn plain(usage: u8) -> Self {
        Self {
            modifiers: 0,
            usage,
        }
    }

    const fn shifted(usage: u8) -> Self {
        Self {
            modifiers: MOD_LEFT_SHIFT,
            usage,
        }
    }

    /// Keystroke for an ASCII character, if the keyboard can type it
    pub fn for_char(c: char) -> Option<Self> {
        let stroke = match c {
            'a'..='z' => Self::plain(usage::A + (c as u8 - b'a')),
            'A'..='Z' => Self::shifted(usage::A + (c as u8 - b'A')),
            '1'..='9' => Self::plain(usage::DIGIT_1 + (c as u8 - b'1')),
            '0' => Self::plain(usage::DIGIT_0),
            ' ' => Self::plain(usage::SPACE),
            '\n' | '\r' => Self::plain(usage::ENTER),
            '\u{8}' => Self::plain(usage::BACKSPACE),
            '-' => Self::plain(usage::MINUS),
            '_' => Self::shifted(usage::MINUS),
            '=' => Self::plain(usage::EQUAL),
            '+' => Self::shifted(usage::EQUAL),
            '[' => Self::plain(usage::LEFT_BRACKET),
            '{' => Self::shifted(usage::LEFT_BRACKET),
            ']' => Self::plain(usage::RIGHT_BRACKET),
            '}' => Self::shifted(usage::RIGHT_BRACKET),
            '\\' => Self::plain(usage::BACKSLASH),
            '|' => Self::shifted(usage::BACKSLASH),
            ';' => Self::plain(usage::SEMICOLON),
            ':' => Self::shifted(usage::SEMICOLON),
            '\'' => Self::plain(usage::APOSTROPHE),
            '"' => Self::shifted(usage::APOSTROPHE),
            '`' => Self::plain(usage::GRAVE),
            '~' => Self::shifted(usage::GRAVE),
            ',' => Self::plain(usage::COMMA),
            '<' => Self::shifted(usage::COMMA),
            '.' => Self::plain(usage::PERIOD),
            '>' => Self::shifted(usage::PERIOD),
            '/' => Self::plain(usage::SLASH),
            '?' => Self::shifted(usage::SLASH),
            _ => return None,
        };
        Some(stroke)
    }
}

/// 8-byte boot keyboard input report: modifiers, reserved, six key slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyboardReport {
    pub modifiers: u8,
    pub keys: [u8; 6],
}

impl KeyboardReport {
    pub fn press(stroke: KeyStroke) -> Self {
        Self {
            modifiers: stroke.modifiers,
            keys: [stroke.usage, 0, 0, 0, 0, 0],
        }
    }

    pub fn release() -> Self {
        Self::default()
    }

    pub fn to_bytes(self) -> [u8; 8] {
        let mut bytes = [0u8; 8];
        bytes[0] = self.modifiers;
        bytes[2..].copy_from_slice(&self.keys);
        bytes
    }
}

/// Keystrokes for `text`, plus the characters that will be skipped
pub fn keystrokes(text: &str) -> (Vec<KeyStroke>, Vec<char>) {
    let mut strokes = Vec::with_capacity(text.len());
    let mut skipped = Vec::new();
    for c in text.chars() {
        match KeyStroke::for_char(c) {
            Some(stroke) => strokes.push(stroke),
            None => skipped.push(c),
        }
    }
    (strokes, skipped)
}

/// Press/release report pairs the peripheral emits for `text`
pub fn reports(text: &str) -> Vec<KeyboardReport> {
    keystrokes(text)
        .0
        .into_iter()
        .flat_map(|stroke| [KeyboardReport::press(stroke), KeyboardReport::release()])
        .collect()
}
