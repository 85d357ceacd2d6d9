//! Kernel keycode definitions.
//!
//! Codes live in the Linux input-event keycode space (`EV_KEY`). The named
//! domain is fixed at compile time; [`KeyCode::table`] and
//! [`MouseButton::table`] expose it as name→code lookups for hosts.

use std::collections::BTreeMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A keyboard keycode in the kernel's input-event keycode space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KeyCode(pub u16);

macro_rules! key_codes {
    ($($name:ident = $code:expr),* $(,)?) => {
        #[allow(missing_docs)]
        impl KeyCode {
            $(pub const $name: KeyCode = KeyCode($code);)*
        }

        const KEY_TABLE: &[(&str, KeyCode)] = &[$((stringify!($name), KeyCode($code)),)*];
    };
}

key_codes! {
    // Main block
    ESC = 1,
    KEY_1 = 2,
    KEY_2 = 3,
    KEY_3 = 4,
    KEY_4 = 5,
    KEY_5 = 6,
    KEY_6 = 7,
    KEY_7 = 8,
    KEY_8 = 9,
    KEY_9 = 10,
    KEY_0 = 11,
    MINUS = 12,
    EQUAL = 13,
    BACKSPACE = 14,
    TAB = 15,
    KEY_Q = 16,
    KEY_W = 17,
    KEY_E = 18,
    KEY_R = 19,
    KEY_T = 20,
    KEY_Y = 21,
    KEY_U = 22,
    KEY_I = 23,
    KEY_O = 24,
    KEY_P = 25,
    LEFTBRACE = 26,
    RIGHTBRACE = 27,
    ENTER = 28,
    LEFTCTRL = 29,
    KEY_A = 30,
    KEY_S = 31,
    KEY_D = 32,
    KEY_F = 33,
    KEY_G = 34,
    KEY_H = 35,
    KEY_J = 36,
    KEY_K = 37,
    KEY_L = 38,
    SEMICOLON = 39,
    APOSTROPHE = 40,
    GRAVE = 41,
    LEFTSHIFT = 42,
    BACKSLASH = 43,
    KEY_Z = 44,
    KEY_X = 45,
    KEY_C = 46,
    KEY_V = 47,
    KEY_B = 48,
    KEY_N = 49,
    KEY_M = 50,
    COMMA = 51,
    DOT = 52,
    SLASH = 53,
    RIGHTSHIFT = 54,
    KPASTERISK = 55,
    LEFTALT = 56,
    SPACE = 57,
    CAPSLOCK = 58,

    // Function row and keypad
    F1 = 59,
    F2 = 60,
    F3 = 61,
    F4 = 62,
    F5 = 63,
    F6 = 64,
    F7 = 65,
    F8 = 66,
    F9 = 67,
    F10 = 68,
    NUMLOCK = 69,
    SCROLLLOCK = 70,
    KP7 = 71,
    KP8 = 72,
    KP9 = 73,
    KPMINUS = 74,
    KP4 = 75,
    KP5 = 76,
    KP6 = 77,
    KPPLUS = 78,
    KP1 = 79,
    KP2 = 80,
    KP3 = 81,
    KP0 = 82,
    KPDOT = 83,
    ZENKAKUHANKAKU = 85,
    KEY_102ND = 86,
    F11 = 87,
    F12 = 88,
    RO = 89,
    KATAKANA = 90,
    HIRAGANA = 91,
    HENKAN = 92,
    KATAKANAHIRAGANA = 93,
    MUHENKAN = 94,
    KPJPCOMMA = 95,
    KPENTER = 96,
    RIGHTCTRL = 97,
    KPSLASH = 98,
    SYSRQ = 99,
    RIGHTALT = 100,
    LINEFEED = 101,

    // Navigation
    HOME = 102,
    UP = 103,
    PAGEUP = 104,
    LEFT = 105,
    RIGHT = 106,
    END = 107,
    DOWN = 108,
    PAGEDOWN = 109,
    INSERT = 110,
    DELETE = 111,
    MACRO = 112,

    // Media and system
    MUTE = 113,
    VOLUMEDOWN = 114,
    VOLUMEUP = 115,
    POWER = 116,
    KPEQUAL = 117,
    KPPLUSMINUS = 118,
    PAUSE = 119,
    SCALE = 120,
    KPCOMMA = 121,
    HANGEUL = 122,
    HANJA = 123,
    YEN = 124,
    LEFTMETA = 125,
    RIGHTMETA = 126,
    COMPOSE = 127,
    STOP = 128,
    AGAIN = 129,
    PROPS = 130,
    UNDO = 131,
    FRONT = 132,
    COPY = 133,
    OPEN = 134,
    PASTE = 135,
    FIND = 136,
    CUT = 137,
    HELP = 138,
    MENU = 139,
    CALC = 140,
    SETUP = 141,
    SLEEP = 142,
    WAKEUP = 143,
    FILE = 144,
    SENDFILE = 145,
    DELETEFILE = 146,
    XFER = 147,
    PROG1 = 148,
    PROG2 = 149,
    WWW = 150,
    MSDOS = 151,
    COFFEE = 152,
    ROTATE_DISPLAY = 153,
    CYCLEWINDOWS = 154,
    MAIL = 155,
    BOOKMARKS = 156,
    COMPUTER = 157,
    BACK = 158,
    FORWARD = 159,
    CLOSECD = 160,
    EJECTCD = 161,
    EJECTCLOSECD = 162,
    NEXTSONG = 163,
    PLAYPAUSE = 164,
    PREVIOUSSONG = 165,
    STOPCD = 166,
    RECORD = 167,
    REWIND = 168,
    PHONE = 169,
    ISO = 170,
    CONFIG = 171,
    HOMEPAGE = 172,
    REFRESH = 173,
    EXIT = 174,
    MOVE = 175,
    EDIT = 176,
    SCROLLUP = 177,
    SCROLLDOWN = 178,
    KPLEFTPAREN = 179,
    KPRIGHTPAREN = 180,
    NEW = 181,
    REDO = 182,
    F13 = 183,
    F14 = 184,
    F15 = 185,
    F16 = 186,
    F17 = 187,
    F18 = 188,
    F19 = 189,
    F20 = 190,
    F21 = 191,
    F22 = 192,
    F23 = 193,
    F24 = 194,
    PLAYCD = 200,
    PAUSECD = 201,
    PROG3 = 202,
    PROG4 = 203,
    ALL_APPLICATIONS = 204,
    SUSPEND = 205,
    CLOSE = 206,
    PLAY = 207,
    FASTFORWARD = 208,
    BASSBOOST = 209,
    PRINT = 210,
    HP = 211,
    CAMERA = 212,
    SOUND = 213,
    QUESTION = 214,
    EMAIL = 215,
    CHAT = 216,
    SEARCH = 217,
    CONNECT = 218,
    FINANCE = 219,
    SPORT = 220,
    SHOP = 221,
    ALTERASE = 222,
    CANCEL = 223,
    BRIGHTNESSDOWN = 224,
    BRIGHTNESSUP = 225,
    MEDIA = 226,
    SWITCHVIDEOMODE = 227,
    KBDILLUMTOGGLE = 228,
    KBDILLUMDOWN = 229,
    KBDILLUMUP = 230,
    SEND = 231,
    REPLY = 232,
    FORWARDMAIL = 233,
    SAVE = 234,
    DOCUMENTS = 235,
    BATTERY = 236,
    BLUETOOTH = 237,
    WLAN = 238,
    UWB = 239,
    UNKNOWN = 240,
    VIDEO_NEXT = 241,
    VIDEO_PREV = 242,
    BRIGHTNESS_CYCLE = 243,
    BRIGHTNESS_AUTO = 244,
    DISPLAY_OFF = 245,
    WWAN = 246,
    RFKILL = 247,
    MICMUTE = 248,
}

impl KeyCode {
    /// The raw kernel code.
    #[inline]
    pub const fn code(self) -> u16 {
        self.0
    }

    /// All named keycodes, in ascending code order.
    pub fn all() -> impl Iterator<Item = KeyCode> {
        KEY_TABLE.iter().map(|&(_, code)| code)
    }

    /// The name of this code, if it belongs to the named domain.
    pub fn name(self) -> Option<&'static str> {
        KEY_TABLE
            .iter()
            .find(|&&(_, code)| code == self)
            .map(|&(name, _)| name)
    }

    /// Look up a code by its name.
    pub fn from_name(name: &str) -> Option<KeyCode> {
        KEY_TABLE
            .iter()
            .find(|&&(n, _)| n == name)
            .map(|&(_, code)| code)
    }

    /// Name→code table for the whole keyboard domain.
    pub fn table() -> BTreeMap<&'static str, u16> {
        KEY_TABLE
            .iter()
            .map(|&(name, code)| (name, code.0))
            .collect()
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "{}", self.0),
        }
    }
}

impl From<KeyCode> for u16 {
    fn from(code: KeyCode) -> u16 {
        code.0
    }
}

#[cfg(target_os = "linux")]
impl From<KeyCode> for evdev::Key {
    fn from(code: KeyCode) -> Self {
        evdev::Key::new(code.0)
    }
}

#[cfg(target_os = "linux")]
impl From<evdev::Key> for KeyCode {
    fn from(key: evdev::Key) -> Self {
        KeyCode(key.code())
    }
}

/// Pointer button codes (the `BTN_*` subset of the keycode space).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u16)]
pub enum MouseButton {
    /// Primary button (`BTN_LEFT`).
    Left = 0x110,
    /// Secondary button (`BTN_RIGHT`).
    Right = 0x111,
    /// Middle button (`BTN_MIDDLE`).
    Middle = 0x112,
}

impl MouseButton {
    /// Every supported button.
    pub const ALL: [MouseButton; 3] = [MouseButton::Left, MouseButton::Middle, MouseButton::Right];

    /// The raw kernel code.
    #[inline]
    pub const fn code(self) -> u16 {
        self as u16
    }

    /// Host-facing name of the button.
    pub const fn name(self) -> &'static str {
        match self {
            MouseButton::Left => "LEFT",
            MouseButton::Right => "RIGHT",
            MouseButton::Middle => "MIDDLE",
        }
    }

    /// Map a raw code back to a button.
    pub fn from_code(code: u16) -> Option<MouseButton> {
        Self::ALL.into_iter().find(|b| b.code() == code)
    }

    /// Name→code table for the button domain.
    pub fn table() -> BTreeMap<&'static str, u16> {
        Self::ALL.iter().map(|b| (b.name(), b.code())).collect()
    }
}

#[cfg(target_os = "linux")]
impl From<MouseButton> for evdev::Key {
    fn from(button: MouseButton) -> Self {
        evdev::Key::new(button.code())
    }
}

/// How printable characters are translated into keycodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CharMapMode {
    /// Letters and digits map to the keys that actually produce them on a US layout.
    #[default]
    Standard,
    /// Arithmetic mapping inherited from older remapper builds:
    /// `30 + (c - 'a')` for letters and `2 + digit` for digits. Only `a`
    /// lands on its own key; each digit types the next digit up.
    Legacy,
}

/// QWERTY keycodes for `a`..=`z`.
const LETTERS: [KeyCode; 26] = [
    KeyCode::KEY_A,
    KeyCode::KEY_B,
    KeyCode::KEY_C,
    KeyCode::KEY_D,
    KeyCode::KEY_E,
    KeyCode::KEY_F,
    KeyCode::KEY_G,
    KeyCode::KEY_H,
    KeyCode::KEY_I,
    KeyCode::KEY_J,
    KeyCode::KEY_K,
    KeyCode::KEY_L,
    KeyCode::KEY_M,
    KeyCode::KEY_N,
    KeyCode::KEY_O,
    KeyCode::KEY_P,
    KeyCode::KEY_Q,
    KeyCode::KEY_R,
    KeyCode::KEY_S,
    KeyCode::KEY_T,
    KeyCode::KEY_U,
    KeyCode::KEY_V,
    KeyCode::KEY_W,
    KeyCode::KEY_X,
    KeyCode::KEY_Y,
    KeyCode::KEY_Z,
];

/// Translate a character into the keycode that types it.
///
/// Letters are case-insensitive. Characters outside letters, digits, space,
/// newline, tab, period and comma return `None`; callers skip them.
pub fn char_to_key(c: char, mode: CharMapMode) -> Option<KeyCode> {
    let fixed = match c {
        ' ' => Some(KeyCode::SPACE),
        '\n' => Some(KeyCode::ENTER),
        '\t' => Some(KeyCode::TAB),
        '.' => Some(KeyCode::DOT),
        ',' => Some(KeyCode::COMMA),
        _ => None,
    };
    if fixed.is_some() {
        return fixed;
    }

    if c.is_ascii_alphabetic() {
        let index = (c.to_ascii_lowercase() as u8 - b'a') as u16;
        return Some(match mode {
            CharMapMode::Standard => LETTERS[index as usize],
            CharMapMode::Legacy => KeyCode(30 + index),
        });
    }

    if let Some(digit) = c.to_digit(10) {
        let digit = digit as u16;
        return Some(match mode {
            CharMapMode::Standard if digit == 0 => KeyCode::KEY_0,
            CharMapMode::Standard => KeyCode(KeyCode::KEY_1.0 + digit - 1),
            CharMapMode::Legacy => KeyCode(2 + digit),
        });
    }

    None
}
