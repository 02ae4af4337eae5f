// src/keys.rs

//! Backend key codes and their translation from X11 keysyms.
//!
//! Key codes index the 256-slot key-down buffer and follow the classic
//! PC scan-code layout, so `KEY_A` is 30 regardless of keyboard layout.

use x11::keysym;

pub const KEY_NONE: u8 = 0x00;
pub const KEY_ESCAPE: u8 = 0x01;
pub const KEY_1: u8 = 0x02;
pub const KEY_2: u8 = 0x03;
pub const KEY_3: u8 = 0x04;
pub const KEY_4: u8 = 0x05;
pub const KEY_5: u8 = 0x06;
pub const KEY_6: u8 = 0x07;
pub const KEY_7: u8 = 0x08;
pub const KEY_8: u8 = 0x09;
pub const KEY_9: u8 = 0x0A;
pub const KEY_0: u8 = 0x0B;
pub const KEY_MINUS: u8 = 0x0C;
pub const KEY_EQUALS: u8 = 0x0D;
pub const KEY_BACK: u8 = 0x0E;
pub const KEY_TAB: u8 = 0x0F;
pub const KEY_Q: u8 = 0x10;
pub const KEY_W: u8 = 0x11;
pub const KEY_E: u8 = 0x12;
pub const KEY_R: u8 = 0x13;
pub const KEY_T: u8 = 0x14;
pub const KEY_Y: u8 = 0x15;
pub const KEY_U: u8 = 0x16;
pub const KEY_I: u8 = 0x17;
pub const KEY_O: u8 = 0x18;
pub const KEY_P: u8 = 0x19;
pub const KEY_LBRACKET: u8 = 0x1A;
pub const KEY_RBRACKET: u8 = 0x1B;
pub const KEY_RETURN: u8 = 0x1C;
pub const KEY_LCONTROL: u8 = 0x1D;
pub const KEY_A: u8 = 0x1E;
pub const KEY_S: u8 = 0x1F;
pub const KEY_D: u8 = 0x20;
pub const KEY_F: u8 = 0x21;
pub const KEY_G: u8 = 0x22;
pub const KEY_H: u8 = 0x23;
pub const KEY_J: u8 = 0x24;
pub const KEY_K: u8 = 0x25;
pub const KEY_L: u8 = 0x26;
pub const KEY_SEMICOLON: u8 = 0x27;
pub const KEY_APOSTROPHE: u8 = 0x28;
pub const KEY_GRAVE: u8 = 0x29;
pub const KEY_LSHIFT: u8 = 0x2A;
pub const KEY_BACKSLASH: u8 = 0x2B;
pub const KEY_Z: u8 = 0x2C;
pub const KEY_X: u8 = 0x2D;
pub const KEY_C: u8 = 0x2E;
pub const KEY_V: u8 = 0x2F;
pub const KEY_B: u8 = 0x30;
pub const KEY_N: u8 = 0x31;
pub const KEY_M: u8 = 0x32;
pub const KEY_COMMA: u8 = 0x33;
pub const KEY_PERIOD: u8 = 0x34;
pub const KEY_SLASH: u8 = 0x35;
pub const KEY_RSHIFT: u8 = 0x36;
pub const KEY_MULTIPLY: u8 = 0x37;
pub const KEY_LMENU: u8 = 0x38; // Left Alt
pub const KEY_SPACE: u8 = 0x39;
pub const KEY_CAPITAL: u8 = 0x3A; // Caps Lock
pub const KEY_F1: u8 = 0x3B;
pub const KEY_F2: u8 = 0x3C;
pub const KEY_F3: u8 = 0x3D;
pub const KEY_F4: u8 = 0x3E;
pub const KEY_F5: u8 = 0x3F;
pub const KEY_F6: u8 = 0x40;
pub const KEY_F7: u8 = 0x41;
pub const KEY_F8: u8 = 0x42;
pub const KEY_F9: u8 = 0x43;
pub const KEY_F10: u8 = 0x44;
pub const KEY_NUMLOCK: u8 = 0x45;
pub const KEY_SCROLL: u8 = 0x46;
pub const KEY_NUMPAD7: u8 = 0x47;
pub const KEY_NUMPAD8: u8 = 0x48;
pub const KEY_NUMPAD9: u8 = 0x49;
pub const KEY_SUBTRACT: u8 = 0x4A;
pub const KEY_NUMPAD4: u8 = 0x4B;
pub const KEY_NUMPAD5: u8 = 0x4C;
pub const KEY_NUMPAD6: u8 = 0x4D;
pub const KEY_ADD: u8 = 0x4E;
pub const KEY_NUMPAD1: u8 = 0x4F;
pub const KEY_NUMPAD2: u8 = 0x50;
pub const KEY_NUMPAD3: u8 = 0x51;
pub const KEY_NUMPAD0: u8 = 0x52;
pub const KEY_DECIMAL: u8 = 0x53;
pub const KEY_F11: u8 = 0x57;
pub const KEY_F12: u8 = 0x58;
pub const KEY_F13: u8 = 0x64;
pub const KEY_F14: u8 = 0x65;
pub const KEY_F15: u8 = 0x66;
pub const KEY_NUMPADENTER: u8 = 0x9C;
pub const KEY_RCONTROL: u8 = 0x9D;
pub const KEY_DIVIDE: u8 = 0xB5;
pub const KEY_SYSRQ: u8 = 0xB7;
pub const KEY_RMENU: u8 = 0xB8; // Right Alt
pub const KEY_PAUSE: u8 = 0xC5;
pub const KEY_HOME: u8 = 0xC7;
pub const KEY_UP: u8 = 0xC8;
pub const KEY_PRIOR: u8 = 0xC9; // Page Up
pub const KEY_LEFT: u8 = 0xCB;
pub const KEY_RIGHT: u8 = 0xCD;
pub const KEY_END: u8 = 0xCF;
pub const KEY_DOWN: u8 = 0xD0;
pub const KEY_NEXT: u8 = 0xD1; // Page Down
pub const KEY_INSERT: u8 = 0xD2;
pub const KEY_DELETE: u8 = 0xD3;
pub const KEY_LMETA: u8 = 0xDB;
pub const KEY_RMETA: u8 = 0xDC;
pub const KEY_APPS: u8 = 0xDD;

/// Key codes for the letters a-z, in alphabetical order.
const LETTER_KEYS: [u8; 26] = [
    KEY_A, KEY_B, KEY_C, KEY_D, KEY_E, KEY_F, KEY_G, KEY_H, KEY_I, KEY_J, KEY_K, KEY_L, KEY_M,
    KEY_N, KEY_O, KEY_P, KEY_Q, KEY_R, KEY_S, KEY_T, KEY_U, KEY_V, KEY_W, KEY_X, KEY_Y, KEY_Z,
];

/// Key codes for the digits 0-9, in numeric order.
const DIGIT_KEYS: [u8; 10] = [
    KEY_0, KEY_1, KEY_2, KEY_3, KEY_4, KEY_5, KEY_6, KEY_7, KEY_8, KEY_9,
];

/// Translates an X11 keysym into a backend key code.
///
/// Returns [`KEY_NONE`] for keysyms with no key code.
pub fn translate_keysym(keysym: u32) -> u8 {
    match keysym {
        keysym::XK_a..=keysym::XK_z => LETTER_KEYS[(keysym - keysym::XK_a) as usize],
        keysym::XK_A..=keysym::XK_Z => LETTER_KEYS[(keysym - keysym::XK_A) as usize],
        keysym::XK_0..=keysym::XK_9 => DIGIT_KEYS[(keysym - keysym::XK_0) as usize],

        keysym::XK_Escape => KEY_ESCAPE,
        keysym::XK_minus => KEY_MINUS,
        keysym::XK_equal => KEY_EQUALS,
        keysym::XK_BackSpace => KEY_BACK,
        keysym::XK_Tab | keysym::XK_ISO_Left_Tab => KEY_TAB,
        keysym::XK_bracketleft => KEY_LBRACKET,
        keysym::XK_bracketright => KEY_RBRACKET,
        keysym::XK_Return => KEY_RETURN,
        keysym::XK_semicolon => KEY_SEMICOLON,
        keysym::XK_apostrophe => KEY_APOSTROPHE,
        keysym::XK_grave => KEY_GRAVE,
        keysym::XK_backslash => KEY_BACKSLASH,
        keysym::XK_comma => KEY_COMMA,
        keysym::XK_period => KEY_PERIOD,
        keysym::XK_slash => KEY_SLASH,
        keysym::XK_space => KEY_SPACE,

        // Modifiers
        keysym::XK_Shift_L => KEY_LSHIFT,
        keysym::XK_Shift_R => KEY_RSHIFT,
        keysym::XK_Control_L => KEY_LCONTROL,
        keysym::XK_Control_R => KEY_RCONTROL,
        keysym::XK_Alt_L => KEY_LMENU,
        keysym::XK_Alt_R | keysym::XK_ISO_Level3_Shift => KEY_RMENU,
        keysym::XK_Meta_L | keysym::XK_Super_L => KEY_LMETA,
        keysym::XK_Meta_R | keysym::XK_Super_R => KEY_RMETA,
        keysym::XK_Menu => KEY_APPS,
        keysym::XK_Caps_Lock => KEY_CAPITAL,
        keysym::XK_Num_Lock => KEY_NUMLOCK,
        keysym::XK_Scroll_Lock => KEY_SCROLL,

        // Function keys
        keysym::XK_F1 => KEY_F1,
        keysym::XK_F2 => KEY_F2,
        keysym::XK_F3 => KEY_F3,
        keysym::XK_F4 => KEY_F4,
        keysym::XK_F5 => KEY_F5,
        keysym::XK_F6 => KEY_F6,
        keysym::XK_F7 => KEY_F7,
        keysym::XK_F8 => KEY_F8,
        keysym::XK_F9 => KEY_F9,
        keysym::XK_F10 => KEY_F10,
        keysym::XK_F11 => KEY_F11,
        keysym::XK_F12 => KEY_F12,
        keysym::XK_F13 => KEY_F13,
        keysym::XK_F14 => KEY_F14,
        keysym::XK_F15 => KEY_F15,

        // Navigation
        keysym::XK_Home => KEY_HOME,
        keysym::XK_Up => KEY_UP,
        keysym::XK_Page_Up => KEY_PRIOR,
        keysym::XK_Left => KEY_LEFT,
        keysym::XK_Right => KEY_RIGHT,
        keysym::XK_End => KEY_END,
        keysym::XK_Down => KEY_DOWN,
        keysym::XK_Page_Down => KEY_NEXT,
        keysym::XK_Insert => KEY_INSERT,
        keysym::XK_Delete => KEY_DELETE,
        keysym::XK_Pause => KEY_PAUSE,
        keysym::XK_Print | keysym::XK_Sys_Req => KEY_SYSRQ,

        // Keypad, with and without Num Lock
        keysym::XK_KP_0 | keysym::XK_KP_Insert => KEY_NUMPAD0,
        keysym::XK_KP_1 | keysym::XK_KP_End => KEY_NUMPAD1,
        keysym::XK_KP_2 | keysym::XK_KP_Down => KEY_NUMPAD2,
        keysym::XK_KP_3 | keysym::XK_KP_Page_Down => KEY_NUMPAD3,
        keysym::XK_KP_4 | keysym::XK_KP_Left => KEY_NUMPAD4,
        keysym::XK_KP_5 | keysym::XK_KP_Begin => KEY_NUMPAD5,
        keysym::XK_KP_6 | keysym::XK_KP_Right => KEY_NUMPAD6,
        keysym::XK_KP_7 | keysym::XK_KP_Home => KEY_NUMPAD7,
        keysym::XK_KP_8 | keysym::XK_KP_Up => KEY_NUMPAD8,
        keysym::XK_KP_9 | keysym::XK_KP_Page_Up => KEY_NUMPAD9,
        keysym::XK_KP_Decimal | keysym::XK_KP_Delete => KEY_DECIMAL,
        keysym::XK_KP_Enter => KEY_NUMPADENTER,
        keysym::XK_KP_Add => KEY_ADD,
        keysym::XK_KP_Subtract => KEY_SUBTRACT,
        keysym::XK_KP_Multiply => KEY_MULTIPLY,
        keysym::XK_KP_Divide => KEY_DIVIDE,

        _ => KEY_NONE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_map_independently_of_case() {
        assert_eq!(translate_keysym(keysym::XK_a), KEY_A);
        assert_eq!(translate_keysym(keysym::XK_A), KEY_A);
        assert_eq!(translate_keysym(keysym::XK_q), KEY_Q);
        assert_eq!(translate_keysym(keysym::XK_Z), KEY_Z);
    }

    #[test]
    fn digits_follow_scan_code_layout() {
        assert_eq!(translate_keysym(keysym::XK_1), KEY_1);
        assert_eq!(translate_keysym(keysym::XK_9), KEY_9);
        assert_eq!(translate_keysym(keysym::XK_0), KEY_0);
    }

    #[test]
    fn keypad_maps_with_and_without_num_lock() {
        assert_eq!(translate_keysym(keysym::XK_KP_7), KEY_NUMPAD7);
        assert_eq!(translate_keysym(keysym::XK_KP_Home), KEY_NUMPAD7);
        assert_eq!(translate_keysym(keysym::XK_KP_Enter), KEY_NUMPADENTER);
    }

    #[test]
    fn left_and_right_modifiers_are_distinct() {
        assert_eq!(translate_keysym(keysym::XK_Shift_L), KEY_LSHIFT);
        assert_eq!(translate_keysym(keysym::XK_Shift_R), KEY_RSHIFT);
        assert_eq!(translate_keysym(keysym::XK_Control_R), KEY_RCONTROL);
    }

    #[test]
    fn unknown_keysym_has_no_key_code() {
        assert_eq!(translate_keysym(keysym::XK_Hyper_L), KEY_NONE);
        assert_eq!(translate_keysym(0x0100_20AC), KEY_NONE); // Unicode euro sign keysym
    }
}
