//! Byte layout of one settings page.
//!
//! ```text
//! offset  mouse record             offset  keyboard record
//!   0     first-run marker (0)       128   first-run marker (0)
//!   1..3  firmware major/minor/rev   129   keyboard type
//!   4..6  travel xy / x / y          130   XT clone flag
//!   7     mouse type                 131   scan code set preference
//!   8     two stop bits
//!   9     baud / 1200
//!  10..14 swap, side, swap side, invert x, invert y
//!  15..20 DIP snapshot: three, wheel, 75, 50, 7N2, 19200
//!  21     movement mode
//!  22     cosine level
//!  23     language
//! ```
//!
//! An erased page reads 0xFF everywhere, so a first-run marker of 0xFF
//! means no record was ever written.

use crate::settings::{
    clamp_travel, DipSwitches, FirmwareVersion, KeyboardSettings, MouseSettings, Settings,
};
use crate::types::{BaudRate, CodeSetPreference, CosineLevel, KeyboardType, MouseType, MovementMode};

/// Flash program granule and wear-levelling slot.
pub const PAGE_SIZE: usize = 256;

/// Value of erased flash.
pub const ERASED: u8 = 0xFF;

const WRITTEN: u8 = 0;
const KEYBOARD_OFFSET: usize = 128;

/// A decoded page, with the raw markers kept for first-run detection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StoredRecord {
    pub mouse_first_run: u8,
    pub keyboard_first_run: u8,
    pub settings: Settings,
}

impl StoredRecord {
    /// Either half of the record was never written.
    #[inline]
    #[must_use]
    pub const fn is_blank(&self) -> bool {
        self.mouse_first_run == ERASED || self.keyboard_first_run == ERASED
    }
}

/// Serialize `settings` into a full page.
#[must_use]
pub fn encode(settings: &Settings) -> [u8; PAGE_SIZE] {
    let mut page = [ERASED; PAGE_SIZE];
    let m = &settings.mouse;
    let k = &settings.keyboard;
    let v = &settings.version;
    let d = &settings.dip;

    page[..24].copy_from_slice(&[
        WRITTEN,
        v.major,
        v.minor,
        v.revision,
        m.travel_xy,
        m.travel_x,
        m.travel_y,
        m.mouse_type as u8,
        u8::from(m.double_stop_bit),
        m.baud.ratio(),
        u8::from(m.swap_left_right),
        u8::from(m.use_side_buttons),
        u8::from(m.swap_side_buttons),
        u8::from(m.invert_x),
        u8::from(m.invert_y),
        u8::from(d.three_button),
        u8::from(d.wheel),
        u8::from(d.speed_75),
        u8::from(d.speed_50),
        u8::from(d.two_stop_bits),
        u8::from(d.baud_19200),
        m.movement as u8,
        m.cosine.level(),
        m.language,
    ]);

    page[KEYBOARD_OFFSET..KEYBOARD_OFFSET + 4].copy_from_slice(&[
        WRITTEN,
        k.kind as u8,
        u8::from(k.xt_clone),
        k.code_set as u8,
    ]);

    page
}

/// Parse a page, replacing anything out of range with a safe value.
#[must_use]
pub fn decode(page: &[u8; PAGE_SIZE]) -> StoredRecord {
    let flag = |i: usize| page[i] != 0;
    let kb = KEYBOARD_OFFSET;

    let mouse = MouseSettings {
        travel_xy: clamp_travel(page[4]),
        travel_x: clamp_travel(page[5]),
        travel_y: clamp_travel(page[6]),
        mouse_type: MouseType::from_u8(page[7]).unwrap_or(MouseType::TwoButton),
        double_stop_bit: flag(8),
        baud: BaudRate::from_ratio(page[9]).unwrap_or(BaudRate::B1200),
        swap_left_right: flag(10),
        use_side_buttons: flag(11),
        swap_side_buttons: flag(12),
        invert_x: flag(13),
        invert_y: flag(14),
        movement: MovementMode::from_u8(page[21]).unwrap_or(MovementMode::Additive),
        cosine: CosineLevel::new(page[22]).unwrap_or(CosineLevel::OFF),
        language: if page[23] <= 1 { page[23] } else { 0 },
    };

    let keyboard = KeyboardSettings {
        kind: KeyboardType::from_u8(page[kb + 1]).unwrap_or(KeyboardType::At),
        xt_clone: flag(kb + 2),
        code_set: CodeSetPreference::from_u8(page[kb + 3]).unwrap_or(CodeSetPreference::Auto),
    };

    StoredRecord {
        mouse_first_run: page[0],
        keyboard_first_run: page[kb],
        settings: Settings {
            version: FirmwareVersion::new(page[1], page[2], page[3]),
            mouse,
            keyboard,
            dip: DipSwitches {
                three_button: flag(15),
                wheel: flag(16),
                speed_75: flag(17),
                speed_50: flag(18),
                two_stop_bits: flag(19),
                baud_19200: flag(20),
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_offsets() {
        let mut s = Settings::DEFAULT;
        s.mouse.travel_xy = 75;
        s.mouse.baud = BaudRate::B9600;
        s.mouse.mouse_type = MouseType::Wheel;
        s.mouse.movement = MovementMode::Coast;
        s.mouse.cosine = CosineLevel::new(3).unwrap();
        s.mouse.language = 1;
        s.dip.speed_50 = false;
        s.keyboard.kind = KeyboardType::Xt;
        s.keyboard.code_set = CodeSetPreference::Set3;

        let page = encode(&s);
        assert_eq!(page[0], 0);
        assert_eq!(&page[1..4], &[1, 2, 0]);
        assert_eq!(page[4], 75);
        assert_eq!(page[7], 2);
        assert_eq!(page[9], 8);
        assert_eq!(page[18], 0);
        assert_eq!(page[20], 1);
        assert_eq!(&page[21..24], &[2, 3, 1]);
        assert_eq!(page[24], ERASED);
        assert_eq!(&page[128..132], &[0, 0, 1, 3]);

        let rec = decode(&page);
        assert!(!rec.is_blank());
        assert_eq!(rec.settings, s);
    }

    #[test]
    fn test_erased_page_is_blank_and_sane() {
        let rec = decode(&[ERASED; PAGE_SIZE]);
        assert!(rec.is_blank());
        let m = rec.settings.mouse;
        assert_eq!(m.travel_xy, 200);
        assert_eq!(m.mouse_type, MouseType::TwoButton);
        assert_eq!(m.baud, BaudRate::B1200);
        assert_eq!(m.movement, MovementMode::Additive);
        assert!(m.cosine.is_off());
        assert_eq!(m.language, 0);
        assert_eq!(rec.settings.keyboard.kind, KeyboardType::At);
        assert_eq!(rec.settings.keyboard.code_set, CodeSetPreference::Auto);
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let mut page = encode(&Settings::DEFAULT);
        page[5] = 0;
        page[9] = 3;
        page[22] = 9;
        page[129] = 7;
        let rec = decode(&page);
        assert_eq!(rec.settings.mouse.travel_x, 1);
        assert_eq!(rec.settings.mouse.baud, BaudRate::B1200);
        assert!(rec.settings.mouse.cosine.is_off());
        assert_eq!(rec.settings.keyboard.kind, KeyboardType::At);
    }

    #[test]
    fn test_every_legal_record_survives_a_page() {
        let mouse_types = [MouseType::TwoButton, MouseType::ThreeButton, MouseType::Wheel];
        let movements = [MovementMode::Additive, MovementMode::Average, MovementMode::Coast];
        let kinds = [KeyboardType::Xt, KeyboardType::At];
        let code_sets = [
            CodeSetPreference::Auto,
            CodeSetPreference::Set1,
            CodeSetPreference::Set2,
            CodeSetPreference::Set3,
        ];

        let mut checked = 0u32;
        for mouse_type in mouse_types {
            for baud in BaudRate::ALL {
                for movement in movements {
                    for level in 0..=4 {
                        for kind in kinds {
                            for code_set in code_sets {
                                for pattern in 0..4u8 {
                                    let flag = |i: u8| match pattern {
                                        0 => false,
                                        1 => true,
                                        2 => i % 2 == 0,
                                        _ => i % 2 == 1,
                                    };
                                    let (low, high) = if flag(0) { (1, 200) } else { (200, 1) };
                                    let s = Settings {
                                        version: FirmwareVersion::new(1, 2, 0),
                                        mouse: MouseSettings {
                                            travel_xy: low,
                                            travel_x: high,
                                            travel_y: low,
                                            mouse_type,
                                            double_stop_bit: flag(1),
                                            baud,
                                            swap_left_right: flag(2),
                                            use_side_buttons: flag(3),
                                            swap_side_buttons: flag(4),
                                            invert_x: flag(5),
                                            invert_y: flag(6),
                                            movement,
                                            cosine: CosineLevel::new(level).unwrap(),
                                            language: u8::from(flag(7)),
                                        },
                                        keyboard: KeyboardSettings {
                                            kind,
                                            xt_clone: flag(8),
                                            code_set,
                                        },
                                        dip: DipSwitches {
                                            three_button: flag(9),
                                            wheel: flag(10),
                                            speed_75: flag(11),
                                            speed_50: flag(12),
                                            two_stop_bits: flag(13),
                                            baud_19200: flag(14),
                                        },
                                    };
                                    let rec = decode(&encode(&s));
                                    assert!(!rec.is_blank());
                                    assert_eq!(rec.settings, s);
                                    checked += 1;
                                }
                            }
                        }
                    }
                }
            }
        }
        assert_eq!(checked, 3 * 5 * 3 * 5 * 2 * 4 * 4);
    }
}
