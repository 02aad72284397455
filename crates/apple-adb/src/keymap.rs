//! ADB keycode → ASCII translation for the Apple II keyboard register.

use crate::modifiers;

/// (keycode, unshifted, shifted) for every key that produces a character.
#[rustfmt::skip]
const KEYS: &[(u8, u8, u8)] = &[
    (0x00, b'a', b'A'), (0x01, b's', b'S'), (0x02, b'd', b'D'), (0x03, b'f', b'F'),
    (0x04, b'h', b'H'), (0x05, b'g', b'G'), (0x06, b'z', b'Z'), (0x07, b'x', b'X'),
    (0x08, b'c', b'C'), (0x09, b'v', b'V'), (0x0B, b'b', b'B'), (0x0C, b'q', b'Q'),
    (0x0D, b'w', b'W'), (0x0E, b'e', b'E'), (0x0F, b'r', b'R'), (0x10, b't', b'T'),
    (0x11, b'y', b'Y'), (0x12, b'1', b'!'), (0x13, b'2', b'@'), (0x14, b'3', b'#'),
    (0x15, b'4', b'$'), (0x16, b'6', b'^'), (0x17, b'5', b'%'), (0x18, b'=', b'+'),
    (0x19, b'9', b'('), (0x1A, b'7', b'&'), (0x1B, b'-', b'_'), (0x1C, b'8', b'*'),
    (0x1D, b'0', b')'), (0x1E, b']', b'}'), (0x1F, b'o', b'O'), (0x20, b'u', b'U'),
    (0x21, b'[', b'{'), (0x22, b'i', b'I'), (0x23, b'p', b'P'), (0x24, 0x0D, 0x0D),
    (0x25, b'l', b'L'), (0x26, b'j', b'J'), (0x27, b'\'', b'"'), (0x28, b'k', b'K'),
    (0x29, b';', b':'), (0x2A, b'\\', b'|'), (0x2B, b',', b'<'), (0x2C, b'/', b'?'),
    (0x2D, b'n', b'N'), (0x2E, b'm', b'M'), (0x2F, b'.', b'>'), (0x30, 0x09, 0x09),
    (0x31, b' ', b' '), (0x32, b'`', b'~'), (0x33, 0x7F, 0x7F), (0x35, 0x1B, 0x1B),
    // Arrows produce the classic Apple II control codes.
    (0x3B, 0x08, 0x08), (0x3C, 0x15, 0x15), (0x3D, 0x0A, 0x0A), (0x3E, 0x0B, 0x0B),
    // Keypad.
    (0x41, b'.', b'.'), (0x43, b'*', b'*'), (0x45, b'+', b'+'), (0x4B, b'/', b'/'),
    (0x4C, 0x0D, 0x0D), (0x4E, b'-', b'-'), (0x51, b'=', b'='),
    (0x52, b'0', b'0'), (0x53, b'1', b'1'), (0x54, b'2', b'2'), (0x55, b'3', b'3'),
    (0x56, b'4', b'4'), (0x57, b'5', b'5'), (0x58, b'6', b'6'), (0x59, b'7', b'7'),
    (0x5B, b'8', b'8'), (0x5C, b'9', b'9'),
];

/// ASCII for an ADB keycode under the given modifier mask. `None` for keys
/// with no character (function keys, modifiers).
#[must_use]
pub fn ascii_for_key(keycode: u8, modifier_mask: u8) -> Option<u8> {
    let &(_, base, shifted) = KEYS.iter().find(|&&(code, _, _)| code == keycode)?;
    let shift = modifier_mask & modifiers::SHIFT != 0;
    let mut ascii = if shift { shifted } else { base };
    if modifier_mask & modifiers::CAPS_LOCK != 0 {
        ascii = ascii.to_ascii_uppercase();
    }
    if modifier_mask & modifiers::CONTROL != 0 && ascii.to_ascii_uppercase().is_ascii_alphabetic()
    {
        ascii = ascii.to_ascii_uppercase() & 0x1F;
    }
    Some(ascii)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_and_shift() {
        assert_eq!(ascii_for_key(0x00, 0), Some(b'a'));
        assert_eq!(ascii_for_key(0x00, modifiers::SHIFT), Some(b'A'));
        assert_eq!(ascii_for_key(0x00, modifiers::CAPS_LOCK), Some(b'A'));
    }

    #[test]
    fn control_produces_control_codes() {
        assert_eq!(ascii_for_key(0x08, modifiers::CONTROL), Some(0x03)); // ^C
        // Control does not mangle digits.
        assert_eq!(ascii_for_key(0x12, modifiers::CONTROL), Some(b'1'));
    }

    #[test]
    fn no_ascii_for_modifier_keys() {
        assert_eq!(ascii_for_key(0x38, 0), None);
        assert_eq!(ascii_for_key(0x7A, 0), None); // F1
    }

    #[test]
    fn return_and_escape() {
        assert_eq!(ascii_for_key(0x24, 0), Some(0x0D));
        assert_eq!(ascii_for_key(0x35, 0), Some(0x1B));
    }
}
