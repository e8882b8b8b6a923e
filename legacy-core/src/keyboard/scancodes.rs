//! USB HID usage to AT/XT scan code translation.
//!
//! Each usage has a set 2 code and a set 1 (XT) code, optionally behind an
//! `E0` prefix. Break codes are derived from the make code: set 2 inserts
//! `F0` after the prefix, set 1 sets bit 7.

use heapless::Vec;

use crate::types::ScanCodeSet;

/// Scan bytes produced by one key transition.
pub type ScanSequence = Vec<u8, 8>;

pub const USAGE_PRINT_SCREEN: u8 = 0x46;
pub const USAGE_PAUSE: u8 = 0x48;
pub const USAGE_LEFT_CTRL: u8 = 0xE0;

const EXTENDED: u8 = 0xE0;
const SET2_BREAK: u8 = 0xF0;
const SET1_BREAK: u8 = 0x80;

const PAUSE_SET2: [u8; 8] = [0xE1, 0x14, 0x77, 0xE1, 0xF0, 0x14, 0xF0, 0x77];
const PAUSE_SET1: [u8; 6] = [0xE1, 0x1D, 0x45, 0xE1, 0x9D, 0xC5];

const PRINT_SET2_MAKE: [u8; 4] = [0xE0, 0x12, 0xE0, 0x7C];
const PRINT_SET2_BREAK: [u8; 6] = [0xE0, 0xF0, 0x7C, 0xE0, 0xF0, 0x12];
const PRINT_SET1_MAKE: [u8; 4] = [0xE0, 0x2A, 0xE0, 0x37];
const PRINT_SET1_BREAK: [u8; 4] = [0xE0, 0xB7, 0xE0, 0xAA];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct KeyCode {
    extended: bool,
    set2: u8,
    set1: u8,
}

const fn key(set2: u8, set1: u8) -> Option<KeyCode> {
    Some(KeyCode {
        extended: false,
        set2,
        set1,
    })
}

const fn ext(set2: u8, set1: u8) -> Option<KeyCode> {
    Some(KeyCode {
        extended: true,
        set2,
        set1,
    })
}

/// Usages that can never produce a code: the reserved block and anything
/// past the modifiers.
#[inline]
#[must_use]
pub const fn is_unknown(usage: u8) -> bool {
    (usage > 0xA4 && usage < 0xE0) || usage > 0xE7
}

fn lookup(usage: u8) -> Option<KeyCode> {
    match usage {
        // letters
        0x04 => key(0x1C, 0x1E),
        0x05 => key(0x32, 0x30),
        0x06 => key(0x21, 0x2E),
        0x07 => key(0x23, 0x20),
        0x08 => key(0x24, 0x12),
        0x09 => key(0x2B, 0x21),
        0x0A => key(0x34, 0x22),
        0x0B => key(0x33, 0x23),
        0x0C => key(0x43, 0x17),
        0x0D => key(0x3B, 0x24),
        0x0E => key(0x42, 0x25),
        0x0F => key(0x4B, 0x26),
        0x10 => key(0x3A, 0x32),
        0x11 => key(0x31, 0x31),
        0x12 => key(0x44, 0x18),
        0x13 => key(0x4D, 0x19),
        0x14 => key(0x15, 0x10),
        0x15 => key(0x2D, 0x13),
        0x16 => key(0x1B, 0x1F),
        0x17 => key(0x2C, 0x14),
        0x18 => key(0x3C, 0x16),
        0x19 => key(0x2A, 0x2F),
        0x1A => key(0x1D, 0x11),
        0x1B => key(0x22, 0x2D),
        0x1C => key(0x35, 0x15),
        0x1D => key(0x1A, 0x2C),
        // 1 through 0
        0x1E => key(0x16, 0x02),
        0x1F => key(0x1E, 0x03),
        0x20 => key(0x26, 0x04),
        0x21 => key(0x25, 0x05),
        0x22 => key(0x2E, 0x06),
        0x23 => key(0x36, 0x07),
        0x24 => key(0x3D, 0x08),
        0x25 => key(0x3E, 0x09),
        0x26 => key(0x46, 0x0A),
        0x27 => key(0x45, 0x0B),
        0x28 => key(0x5A, 0x1C),
        0x29 => key(0x76, 0x01),
        0x2A => key(0x66, 0x0E),
        0x2B => key(0x0D, 0x0F),
        0x2C => key(0x29, 0x39),
        0x2D => key(0x4E, 0x0C),
        0x2E => key(0x55, 0x0D),
        0x2F => key(0x54, 0x1A),
        0x30 => key(0x5B, 0x1B),
        0x31 | 0x32 => key(0x5D, 0x2B),
        0x33 => key(0x4C, 0x27),
        0x34 => key(0x52, 0x28),
        0x35 => key(0x0E, 0x29),
        0x36 => key(0x41, 0x33),
        0x37 => key(0x49, 0x34),
        0x38 => key(0x4A, 0x35),
        0x39 => key(0x58, 0x3A),
        // F1 through F12
        0x3A => key(0x05, 0x3B),
        0x3B => key(0x06, 0x3C),
        0x3C => key(0x04, 0x3D),
        0x3D => key(0x0C, 0x3E),
        0x3E => key(0x03, 0x3F),
        0x3F => key(0x0B, 0x40),
        0x40 => key(0x83, 0x41),
        0x41 => key(0x0A, 0x42),
        0x42 => key(0x01, 0x43),
        0x43 => key(0x09, 0x44),
        0x44 => key(0x78, 0x57),
        0x45 => key(0x07, 0x58),
        0x47 => key(0x7E, 0x46),
        // navigation cluster
        0x49 => ext(0x70, 0x52),
        0x4A => ext(0x6C, 0x47),
        0x4B => ext(0x7D, 0x49),
        0x4C => ext(0x71, 0x53),
        0x4D => ext(0x69, 0x4F),
        0x4E => ext(0x7A, 0x51),
        0x4F => ext(0x74, 0x4D),
        0x50 => ext(0x6B, 0x4B),
        0x51 => ext(0x72, 0x50),
        0x52 => ext(0x75, 0x48),
        // keypad
        0x53 => key(0x77, 0x45),
        0x54 => ext(0x4A, 0x35),
        0x55 => key(0x7C, 0x37),
        0x56 => key(0x7B, 0x4A),
        0x57 => key(0x79, 0x4E),
        0x58 => ext(0x5A, 0x1C),
        0x59 => key(0x69, 0x4F),
        0x5A => key(0x72, 0x50),
        0x5B => key(0x7A, 0x51),
        0x5C => key(0x6B, 0x4B),
        0x5D => key(0x73, 0x4C),
        0x5E => key(0x74, 0x4D),
        0x5F => key(0x6C, 0x47),
        0x60 => key(0x75, 0x48),
        0x61 => key(0x7D, 0x49),
        0x62 => key(0x70, 0x52),
        0x63 => key(0x71, 0x53),
        0x64 => key(0x61, 0x56),
        0x65 => ext(0x2F, 0x5D),
        0x66 => ext(0x37, 0x5E),
        0x67 => key(0x0F, 0x59),
        // F13 through F24
        0x68 => key(0x08, 0x64),
        0x69 => key(0x10, 0x65),
        0x6A => key(0x18, 0x66),
        0x6B => key(0x20, 0x67),
        0x6C => key(0x28, 0x68),
        0x6D => key(0x30, 0x69),
        0x6E => key(0x38, 0x6A),
        0x6F => key(0x40, 0x6B),
        0x70 => key(0x48, 0x6C),
        0x71 => key(0x50, 0x6D),
        0x72 => key(0x57, 0x6E),
        0x73 => key(0x5F, 0x76),
        // mute, volume up, volume down
        0x7F => ext(0x23, 0x20),
        0x80 => ext(0x32, 0x30),
        0x81 => ext(0x21, 0x2E),
        // keypad comma and the international keys
        0x85 => key(0x6D, 0x7E),
        0x87 => key(0x51, 0x73),
        0x88 => key(0x13, 0x70),
        0x89 => key(0x6A, 0x7D),
        0x8A => key(0x64, 0x79),
        0x8B => key(0x67, 0x7B),
        // modifiers
        0xE0 => key(0x14, 0x1D),
        0xE1 => key(0x12, 0x2A),
        0xE2 => key(0x11, 0x38),
        0xE3 => ext(0x1F, 0x5B),
        0xE4 => ext(0x14, 0x1D),
        0xE5 => key(0x59, 0x36),
        0xE6 => ext(0x11, 0x38),
        0xE7 => ext(0x27, 0x5C),
        _ => None,
    }
}

fn extend(seq: &mut ScanSequence, bytes: &[u8]) {
    // every sequence fits the capacity
    let _ = seq.extend_from_slice(bytes);
}

/// Scan bytes for a key transition in `set`. Set 3 uses set 2 codes.
///
/// Pause has no break sequence. An empty result means the usage has no
/// code and nothing should be sent.
#[must_use]
pub fn translate(usage: u8, make: bool, set: ScanCodeSet) -> ScanSequence {
    let mut seq = ScanSequence::new();
    let set1 = matches!(set, ScanCodeSet::Set1);

    match usage {
        USAGE_PAUSE => {
            if make {
                let bytes: &[u8] = if set1 { &PAUSE_SET1 } else { &PAUSE_SET2 };
                extend(&mut seq, bytes);
            }
        }
        USAGE_PRINT_SCREEN => {
            let bytes: &[u8] = match (set1, make) {
                (true, true) => &PRINT_SET1_MAKE,
                (true, false) => &PRINT_SET1_BREAK,
                (false, true) => &PRINT_SET2_MAKE,
                (false, false) => &PRINT_SET2_BREAK,
            };
            extend(&mut seq, bytes);
        }
        _ if is_unknown(usage) => {}
        _ => {
            let Some(code) = lookup(usage) else {
                #[cfg(feature = "defmt")]
                defmt::trace!("no scan code for usage {=u8:#x}", usage);
                return seq;
            };
            if code.extended {
                extend(&mut seq, &[EXTENDED]);
            }
            if set1 {
                let byte = if make { code.set1 } else { code.set1 | SET1_BREAK };
                extend(&mut seq, &[byte]);
            } else if make {
                extend(&mut seq, &[code.set2]);
            } else {
                extend(&mut seq, &[SET2_BREAK, code.set2]);
            }
        }
    }
    seq
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;

    fn bytes(usage: u8, make: bool, set: ScanCodeSet) -> std::vec::Vec<u8> {
        translate(usage, make, set).iter().copied().collect()
    }

    #[test]
    fn test_letter_a() {
        assert_eq!(bytes(0x04, true, ScanCodeSet::Set2), [0x1C]);
        assert_eq!(bytes(0x04, false, ScanCodeSet::Set2), [0xF0, 0x1C]);
        assert_eq!(bytes(0x04, true, ScanCodeSet::Set1), [0x1E]);
        assert_eq!(bytes(0x04, false, ScanCodeSet::Set1), [0x9E]);
        // set 3 falls back to set 2
        assert_eq!(bytes(0x04, false, ScanCodeSet::Set3), [0xF0, 0x1C]);
    }

    #[test]
    fn test_extended_keys() {
        assert_eq!(bytes(0x52, true, ScanCodeSet::Set2), [0xE0, 0x75]);
        assert_eq!(bytes(0x52, false, ScanCodeSet::Set2), [0xE0, 0xF0, 0x75]);
        assert_eq!(bytes(0x52, false, ScanCodeSet::Set1), [0xE0, 0xC8]);
        // right alt
        assert_eq!(bytes(0xE6, true, ScanCodeSet::Set2), [0xE0, 0x11]);
        assert_eq!(bytes(0xE6, false, ScanCodeSet::Set1), [0xE0, 0xB8]);
    }

    #[test]
    fn test_pause_has_no_break() {
        assert_eq!(
            bytes(USAGE_PAUSE, true, ScanCodeSet::Set2),
            [0xE1, 0x14, 0x77, 0xE1, 0xF0, 0x14, 0xF0, 0x77]
        );
        assert_eq!(
            bytes(USAGE_PAUSE, true, ScanCodeSet::Set1),
            [0xE1, 0x1D, 0x45, 0xE1, 0x9D, 0xC5]
        );
        assert!(translate(USAGE_PAUSE, false, ScanCodeSet::Set2).is_empty());
    }

    #[test]
    fn test_print_screen() {
        assert_eq!(
            bytes(USAGE_PRINT_SCREEN, false, ScanCodeSet::Set2),
            [0xE0, 0xF0, 0x7C, 0xE0, 0xF0, 0x12]
        );
        assert_eq!(
            bytes(USAGE_PRINT_SCREEN, true, ScanCodeSet::Set1),
            [0xE0, 0x2A, 0xE0, 0x37]
        );
    }

    #[test]
    fn test_unknown_usages_are_silent() {
        for usage in [0x00u8, 0x01, 0x74, 0xA5, 0xDF, 0xE8, 0xFF] {
            assert!(translate(usage, true, ScanCodeSet::Set2).is_empty(), "{usage:#x}");
        }
    }
}
