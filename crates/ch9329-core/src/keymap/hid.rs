//! USB HID Usage IDs (page 0x07, Keyboard/Keypad page) keyed by web key name.
//!
//! The CH9329 keyboard report carries raw HID Usage IDs.  Hosts identify keys
//! with the web `KeyboardEvent.code` names (`"KeyA"`, `"Enter"`,
//! `"ShiftLeft"`, ...), so this table is the bridge between the two.
//!
//! Reference: USB HID Usage Tables 1.3, Section 10 (Keyboard/Keypad page 0x07).
//!
//! HID codes describe *physical key positions*, not characters.  Letter A is
//! 0x04 regardless of whether the target machine uses QWERTY or AZERTY; the
//! target's layout decides which character the position produces.

/// USB HID Usage ID for keyboard keys (page 0x07).
///
/// The numeric value of each variant is its HID Usage ID and is exactly the
/// byte placed in a CH9329 keyboard report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum HidKeyCode {
    // Letters (HID 0x04–0x1D)
    KeyA = 0x04,
    KeyB = 0x05,
    KeyC = 0x06,
    KeyD = 0x07,
    KeyE = 0x08,
    KeyF = 0x09,
    KeyG = 0x0A,
    KeyH = 0x0B,
    KeyI = 0x0C,
    KeyJ = 0x0D,
    KeyK = 0x0E,
    KeyL = 0x0F,
    KeyM = 0x10,
    KeyN = 0x11,
    KeyO = 0x12,
    KeyP = 0x13,
    KeyQ = 0x14,
    KeyR = 0x15,
    KeyS = 0x16,
    KeyT = 0x17,
    KeyU = 0x18,
    KeyV = 0x19,
    KeyW = 0x1A,
    KeyX = 0x1B,
    KeyY = 0x1C,
    KeyZ = 0x1D,

    // Digits (HID 0x1E–0x27)
    Digit1 = 0x1E,
    Digit2 = 0x1F,
    Digit3 = 0x20,
    Digit4 = 0x21,
    Digit5 = 0x22,
    Digit6 = 0x23,
    Digit7 = 0x24,
    Digit8 = 0x25,
    Digit9 = 0x26,
    Digit0 = 0x27,

    // Control keys (HID 0x28–0x38)
    Enter = 0x28,
    Escape = 0x29,
    Backspace = 0x2A,
    Tab = 0x2B,
    Space = 0x2C,
    Minus = 0x2D,
    Equal = 0x2E,
    BracketLeft = 0x2F,
    BracketRight = 0x30,
    Backslash = 0x31,
    Semicolon = 0x33,
    Quote = 0x34,
    Backquote = 0x35,
    Comma = 0x36,
    Period = 0x37,
    Slash = 0x38,

    CapsLock = 0x39,

    // Function keys (HID 0x3A–0x45)
    F1 = 0x3A,
    F2 = 0x3B,
    F3 = 0x3C,
    F4 = 0x3D,
    F5 = 0x3E,
    F6 = 0x3F,
    F7 = 0x40,
    F8 = 0x41,
    F9 = 0x42,
    F10 = 0x43,
    F11 = 0x44,
    F12 = 0x45,

    // Navigation cluster (HID 0x46–0x52)
    PrintScreen = 0x46,
    ScrollLock = 0x47,
    Pause = 0x48,
    Insert = 0x49,
    Home = 0x4A,
    PageUp = 0x4B,
    Delete = 0x4C,
    End = 0x4D,
    PageDown = 0x4E,
    ArrowRight = 0x4F,
    ArrowLeft = 0x50,
    ArrowDown = 0x51,
    ArrowUp = 0x52,

    // Numpad (HID 0x53–0x63)
    NumLock = 0x53,
    NumpadDivide = 0x54,
    NumpadMultiply = 0x55,
    NumpadSubtract = 0x56,
    NumpadAdd = 0x57,
    NumpadEnter = 0x58,
    Numpad1 = 0x59,
    Numpad2 = 0x5A,
    Numpad3 = 0x5B,
    Numpad4 = 0x5C,
    Numpad5 = 0x5D,
    Numpad6 = 0x5E,
    Numpad7 = 0x5F,
    Numpad8 = 0x60,
    Numpad9 = 0x61,
    Numpad0 = 0x62,
    NumpadDecimal = 0x63,

    IntlBackslash = 0x64,
    ContextMenu = 0x65,
    Power = 0x66,
    NumpadEqual = 0x67,

    // Extended function keys (HID 0x68–0x73)
    F13 = 0x68,
    F14 = 0x69,
    F15 = 0x6A,
    F16 = 0x6B,
    F17 = 0x6C,
    F18 = 0x6D,
    F19 = 0x6E,
    F20 = 0x6F,
    F21 = 0x70,
    F22 = 0x71,
    F23 = 0x72,
    F24 = 0x73,

    AudioVolumeMute = 0x7F,
    AudioVolumeUp = 0x80,
    AudioVolumeDown = 0x81,

    // International keys
    IntlRo = 0x87,
    KanaMode = 0x88,
    IntlYen = 0x89,
    Convert = 0x8A,
    NonConvert = 0x8B,

    // Modifier keys (HID 0xE0–0xE7)
    ControlLeft = 0xE0,
    ShiftLeft = 0xE1,
    AltLeft = 0xE2,
    MetaLeft = 0xE3,
    ControlRight = 0xE4,
    ShiftRight = 0xE5,
    AltRight = 0xE6,
    MetaRight = 0xE7,
}

impl HidKeyCode {
    /// Every key in the table, ordered by HID Usage ID.
    pub const ALL: [HidKeyCode; 127] = [
        HidKeyCode::KeyA, HidKeyCode::KeyB, HidKeyCode::KeyC, HidKeyCode::KeyD,
        HidKeyCode::KeyE, HidKeyCode::KeyF, HidKeyCode::KeyG, HidKeyCode::KeyH,
        HidKeyCode::KeyI, HidKeyCode::KeyJ, HidKeyCode::KeyK, HidKeyCode::KeyL,
        HidKeyCode::KeyM, HidKeyCode::KeyN, HidKeyCode::KeyO, HidKeyCode::KeyP,
        HidKeyCode::KeyQ, HidKeyCode::KeyR, HidKeyCode::KeyS, HidKeyCode::KeyT,
        HidKeyCode::KeyU, HidKeyCode::KeyV, HidKeyCode::KeyW, HidKeyCode::KeyX,
        HidKeyCode::KeyY, HidKeyCode::KeyZ,
        HidKeyCode::Digit1, HidKeyCode::Digit2, HidKeyCode::Digit3, HidKeyCode::Digit4,
        HidKeyCode::Digit5, HidKeyCode::Digit6, HidKeyCode::Digit7, HidKeyCode::Digit8,
        HidKeyCode::Digit9, HidKeyCode::Digit0,
        HidKeyCode::Enter, HidKeyCode::Escape, HidKeyCode::Backspace, HidKeyCode::Tab,
        HidKeyCode::Space, HidKeyCode::Minus, HidKeyCode::Equal, HidKeyCode::BracketLeft,
        HidKeyCode::BracketRight, HidKeyCode::Backslash, HidKeyCode::Semicolon,
        HidKeyCode::Quote, HidKeyCode::Backquote, HidKeyCode::Comma, HidKeyCode::Period,
        HidKeyCode::Slash, HidKeyCode::CapsLock,
        HidKeyCode::F1, HidKeyCode::F2, HidKeyCode::F3, HidKeyCode::F4, HidKeyCode::F5,
        HidKeyCode::F6, HidKeyCode::F7, HidKeyCode::F8, HidKeyCode::F9, HidKeyCode::F10,
        HidKeyCode::F11, HidKeyCode::F12,
        HidKeyCode::PrintScreen, HidKeyCode::ScrollLock, HidKeyCode::Pause,
        HidKeyCode::Insert, HidKeyCode::Home, HidKeyCode::PageUp, HidKeyCode::Delete,
        HidKeyCode::End, HidKeyCode::PageDown, HidKeyCode::ArrowRight,
        HidKeyCode::ArrowLeft, HidKeyCode::ArrowDown, HidKeyCode::ArrowUp,
        HidKeyCode::NumLock, HidKeyCode::NumpadDivide, HidKeyCode::NumpadMultiply,
        HidKeyCode::NumpadSubtract, HidKeyCode::NumpadAdd, HidKeyCode::NumpadEnter,
        HidKeyCode::Numpad1, HidKeyCode::Numpad2, HidKeyCode::Numpad3, HidKeyCode::Numpad4,
        HidKeyCode::Numpad5, HidKeyCode::Numpad6, HidKeyCode::Numpad7, HidKeyCode::Numpad8,
        HidKeyCode::Numpad9, HidKeyCode::Numpad0, HidKeyCode::NumpadDecimal,
        HidKeyCode::IntlBackslash, HidKeyCode::ContextMenu, HidKeyCode::Power,
        HidKeyCode::NumpadEqual,
        HidKeyCode::F13, HidKeyCode::F14, HidKeyCode::F15, HidKeyCode::F16,
        HidKeyCode::F17, HidKeyCode::F18, HidKeyCode::F19, HidKeyCode::F20,
        HidKeyCode::F21, HidKeyCode::F22, HidKeyCode::F23, HidKeyCode::F24,
        HidKeyCode::AudioVolumeMute, HidKeyCode::AudioVolumeUp, HidKeyCode::AudioVolumeDown,
        HidKeyCode::IntlRo, HidKeyCode::KanaMode, HidKeyCode::IntlYen,
        HidKeyCode::Convert, HidKeyCode::NonConvert,
        HidKeyCode::ControlLeft, HidKeyCode::ShiftLeft, HidKeyCode::AltLeft,
        HidKeyCode::MetaLeft, HidKeyCode::ControlRight, HidKeyCode::ShiftRight,
        HidKeyCode::AltRight, HidKeyCode::MetaRight,
    ];

    /// Returns the raw HID Usage ID placed in a keyboard report.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Looks a key up by its web `KeyboardEvent.code` name.
    ///
    /// Returns `None` for names that are not in the table.
    pub fn from_web_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|key| key.web_name() == name)
    }

    /// The web `KeyboardEvent.code` name of this key.
    pub fn web_name(self) -> &'static str {
        match self {
            HidKeyCode::KeyA => "KeyA",
            HidKeyCode::KeyB => "KeyB",
            HidKeyCode::KeyC => "KeyC",
            HidKeyCode::KeyD => "KeyD",
            HidKeyCode::KeyE => "KeyE",
            HidKeyCode::KeyF => "KeyF",
            HidKeyCode::KeyG => "KeyG",
            HidKeyCode::KeyH => "KeyH",
            HidKeyCode::KeyI => "KeyI",
            HidKeyCode::KeyJ => "KeyJ",
            HidKeyCode::KeyK => "KeyK",
            HidKeyCode::KeyL => "KeyL",
            HidKeyCode::KeyM => "KeyM",
            HidKeyCode::KeyN => "KeyN",
            HidKeyCode::KeyO => "KeyO",
            HidKeyCode::KeyP => "KeyP",
            HidKeyCode::KeyQ => "KeyQ",
            HidKeyCode::KeyR => "KeyR",
            HidKeyCode::KeyS => "KeyS",
            HidKeyCode::KeyT => "KeyT",
            HidKeyCode::KeyU => "KeyU",
            HidKeyCode::KeyV => "KeyV",
            HidKeyCode::KeyW => "KeyW",
            HidKeyCode::KeyX => "KeyX",
            HidKeyCode::KeyY => "KeyY",
            HidKeyCode::KeyZ => "KeyZ",
            HidKeyCode::Digit1 => "Digit1",
            HidKeyCode::Digit2 => "Digit2",
            HidKeyCode::Digit3 => "Digit3",
            HidKeyCode::Digit4 => "Digit4",
            HidKeyCode::Digit5 => "Digit5",
            HidKeyCode::Digit6 => "Digit6",
            HidKeyCode::Digit7 => "Digit7",
            HidKeyCode::Digit8 => "Digit8",
            HidKeyCode::Digit9 => "Digit9",
            HidKeyCode::Digit0 => "Digit0",
            HidKeyCode::Enter => "Enter",
            HidKeyCode::Escape => "Escape",
            HidKeyCode::Backspace => "Backspace",
            HidKeyCode::Tab => "Tab",
            HidKeyCode::Space => "Space",
            HidKeyCode::Minus => "Minus",
            HidKeyCode::Equal => "Equal",
            HidKeyCode::BracketLeft => "BracketLeft",
            HidKeyCode::BracketRight => "BracketRight",
            HidKeyCode::Backslash => "Backslash",
            HidKeyCode::Semicolon => "Semicolon",
            HidKeyCode::Quote => "Quote",
            HidKeyCode::Backquote => "Backquote",
            HidKeyCode::Comma => "Comma",
            HidKeyCode::Period => "Period",
            HidKeyCode::Slash => "Slash",
            HidKeyCode::CapsLock => "CapsLock",
            HidKeyCode::F1 => "F1",
            HidKeyCode::F2 => "F2",
            HidKeyCode::F3 => "F3",
            HidKeyCode::F4 => "F4",
            HidKeyCode::F5 => "F5",
            HidKeyCode::F6 => "F6",
            HidKeyCode::F7 => "F7",
            HidKeyCode::F8 => "F8",
            HidKeyCode::F9 => "F9",
            HidKeyCode::F10 => "F10",
            HidKeyCode::F11 => "F11",
            HidKeyCode::F12 => "F12",
            HidKeyCode::PrintScreen => "PrintScreen",
            HidKeyCode::ScrollLock => "ScrollLock",
            HidKeyCode::Pause => "Pause",
            HidKeyCode::Insert => "Insert",
            HidKeyCode::Home => "Home",
            HidKeyCode::PageUp => "PageUp",
            HidKeyCode::Delete => "Delete",
            HidKeyCode::End => "End",
            HidKeyCode::PageDown => "PageDown",
            HidKeyCode::ArrowRight => "ArrowRight",
            HidKeyCode::ArrowLeft => "ArrowLeft",
            HidKeyCode::ArrowDown => "ArrowDown",
            HidKeyCode::ArrowUp => "ArrowUp",
            HidKeyCode::NumLock => "NumLock",
            HidKeyCode::NumpadDivide => "NumpadDivide",
            HidKeyCode::NumpadMultiply => "NumpadMultiply",
            HidKeyCode::NumpadSubtract => "NumpadSubtract",
            HidKeyCode::NumpadAdd => "NumpadAdd",
            HidKeyCode::NumpadEnter => "NumpadEnter",
            HidKeyCode::Numpad1 => "Numpad1",
            HidKeyCode::Numpad2 => "Numpad2",
            HidKeyCode::Numpad3 => "Numpad3",
            HidKeyCode::Numpad4 => "Numpad4",
            HidKeyCode::Numpad5 => "Numpad5",
            HidKeyCode::Numpad6 => "Numpad6",
            HidKeyCode::Numpad7 => "Numpad7",
            HidKeyCode::Numpad8 => "Numpad8",
            HidKeyCode::Numpad9 => "Numpad9",
            HidKeyCode::Numpad0 => "Numpad0",
            HidKeyCode::NumpadDecimal => "NumpadDecimal",
            HidKeyCode::IntlBackslash => "IntlBackslash",
            HidKeyCode::ContextMenu => "ContextMenu",
            HidKeyCode::Power => "Power",
            HidKeyCode::NumpadEqual => "NumpadEqual",
            HidKeyCode::F13 => "F13",
            HidKeyCode::F14 => "F14",
            HidKeyCode::F15 => "F15",
            HidKeyCode::F16 => "F16",
            HidKeyCode::F17 => "F17",
            HidKeyCode::F18 => "F18",
            HidKeyCode::F19 => "F19",
            HidKeyCode::F20 => "F20",
            HidKeyCode::F21 => "F21",
            HidKeyCode::F22 => "F22",
            HidKeyCode::F23 => "F23",
            HidKeyCode::F24 => "F24",
            HidKeyCode::AudioVolumeMute => "AudioVolumeMute",
            HidKeyCode::AudioVolumeUp => "AudioVolumeUp",
            HidKeyCode::AudioVolumeDown => "AudioVolumeDown",
            HidKeyCode::IntlRo => "IntlRo",
            HidKeyCode::KanaMode => "KanaMode",
            HidKeyCode::IntlYen => "IntlYen",
            HidKeyCode::Convert => "Convert",
            HidKeyCode::NonConvert => "NonConvert",
            HidKeyCode::ControlLeft => "ControlLeft",
            HidKeyCode::ShiftLeft => "ShiftLeft",
            HidKeyCode::AltLeft => "AltLeft",
            HidKeyCode::MetaLeft => "MetaLeft",
            HidKeyCode::ControlRight => "ControlRight",
            HidKeyCode::ShiftRight => "ShiftRight",
            HidKeyCode::AltRight => "AltRight",
            HidKeyCode::MetaRight => "MetaRight",
        }
    }
}
