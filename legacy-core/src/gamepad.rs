//! Game controller report decoding.
//!
//! Every supported controller is normalized into a [`GamepadReport`]: the
//! XInput-layout button mask plus four deadzoned stick axes. Only the left
//! stick and the face buttons reach the serial mouse.

use crate::types::GamepadButtons;

/// Axis movement below this is treated as jitter when comparing reports.
pub const DIFF_TOLERANCE: i16 = 2;

const DS4_REPORT_ID: u8 = 1;
const DS4_REPORT_LEN: usize = 7;
const PSC_REPORT_LEN: usize = 2;
const TRIGGER_THRESHOLD: u8 = 200;

/// Controllers accepted on the USB side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GamepadKind {
    /// DualShock 4 and compatible clones.
    DualShock4,
    /// PlayStation Classic controller.
    PsClassic,
    XInput,
}

impl GamepadKind {
    /// Whitelist lookup for HID gamepads. XInput pads enumerate through
    /// their own driver and are always accepted.
    #[must_use]
    pub const fn from_ids(vid: u16, pid: u16) -> Option<Self> {
        match (vid, pid) {
            (0x054C, 0x09CC) | (0x054C, 0x05C4) | (0x0F0D, 0x005E) | (0x0F0D, 0x00EE)
            | (0x1F4F, 0x1002) => Some(Self::DualShock4),
            (0x054C, 0x0CDA) => Some(Self::PsClassic),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    /// Not the input report this decoder understands.
    WrongReportId,
    TooShort,
}

/// Normalized controller state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GamepadReport {
    pub buttons: GamepadButtons,
    /// Left X, left Y, right X, right Y, clamped to ±127.
    pub sticks: [i8; 4],
    /// Deadzoned axes before scaling, used for change detection.
    pub raw: [i16; 4],
}

impl GamepadReport {
    /// Left stick as mouse motion.
    #[inline]
    #[must_use]
    pub const fn pointer(&self) -> (i8, i8) {
        (self.sticks[0], self.sticks[1])
    }

    /// Whether `self` is different enough from `previous` to replace it.
    #[must_use]
    pub fn differs_from(&self, previous: &Self) -> bool {
        let axis_moved = self.raw.iter().zip(previous.raw.iter()).any(|(&new, &old)| {
            (i32::from(new) - i32::from(old)).abs() > i32::from(DIFF_TOLERANCE)
                || (new < 0) != (old < 0)
        });
        axis_moved || self.buttons != previous.buttons
    }

    /// Left, middle and right mouse buttons driven by the face buttons.
    #[must_use]
    pub const fn mouse_buttons(&self) -> [bool; 3] {
        [
            self.buttons.contains(GamepadButtons::BTN_1),
            self.buttons.contains(GamepadButtons::BTN_3),
            self.buttons.contains(GamepadButtons::BTN_2),
        ]
    }
}

/// Zero `value` when its magnitude is under `percent` of `range`.
fn deadzone(value: i32, range: i32, percent: i32) -> i32 {
    let area = range * percent / 100;
    if value.abs() < area {
        0
    } else {
        value
    }
}

#[inline]
fn clamp_axis(value: i32) -> i8 {
    value.clamp(-127, 127) as i8
}

fn dpad(buttons: &mut GamepadButtons, up: bool, down: bool, left: bool, right: bool) {
    buttons.set(GamepadButtons::DPAD_UP, up);
    buttons.set(GamepadButtons::DPAD_DOWN, down);
    buttons.set(GamepadButtons::DPAD_LEFT, left);
    buttons.set(GamepadButtons::DPAD_RIGHT, right);
}

#[inline]
fn bit(byte: u8, n: u8) -> bool {
    (byte >> n) & 1 != 0
}

/// DualShock 4 input report, report id included.
pub fn decode_ds4(report: &[u8]) -> Result<GamepadReport, DecodeError> {
    if report.first() != Some(&DS4_REPORT_ID) {
        return Err(DecodeError::WrongReportId);
    }
    if report.len() < DS4_REPORT_LEN {
        return Err(DecodeError::TooShort);
    }

    let mut out = GamepadReport::default();
    for axis in 0..4 {
        let raw = deadzone(i32::from(report[1 + axis]) - 128, 256, 10);
        out.raw[axis] = raw as i16;
        out.sticks[axis] = clamp_axis(raw);
    }

    let face = report[5];
    let b = &mut out.buttons;
    // hat switch: 0 is north, clockwise, 8 released
    let (up, down, left, right) = match face & 0x0F {
        0 => (true, false, false, false),
        1 => (true, false, false, true),
        2 => (false, false, false, true),
        3 => (false, true, false, true),
        4 => (false, true, false, false),
        5 => (false, true, true, false),
        6 => (false, false, true, false),
        7 => (true, false, true, false),
        _ => (false, false, false, false),
    };
    dpad(b, up, down, left, right);
    b.set(GamepadButtons::BTN_1, bit(face, 4));
    b.set(GamepadButtons::BTN_3, bit(face, 5));
    b.set(GamepadButtons::BTN_2, bit(face, 6));
    b.set(GamepadButtons::BTN_4, bit(face, 7));

    let misc = report[6];
    b.set(GamepadButtons::L_SHOULDER, bit(misc, 0));
    b.set(GamepadButtons::R_SHOULDER, bit(misc, 1));
    b.set(GamepadButtons::L_SHOULDER_2, bit(misc, 2));
    b.set(GamepadButtons::R_SHOULDER_2, bit(misc, 3));
    b.set(GamepadButtons::SELECT, bit(misc, 4));
    b.set(GamepadButtons::START, bit(misc, 5));
    b.set(GamepadButtons::L_STICK, bit(misc, 6));
    b.set(GamepadButtons::R_STICK, bit(misc, 7));

    Ok(out)
}

/// PlayStation Classic report. The pad has no sticks.
pub fn decode_ps_classic(report: &[u8]) -> Result<GamepadReport, DecodeError> {
    if report.len() < PSC_REPORT_LEN {
        return Err(DecodeError::TooShort);
    }
    let mut out = GamepadReport::default();
    let b = &mut out.buttons;

    let face = report[0];
    b.set(GamepadButtons::BTN_4, bit(face, 0));
    b.set(GamepadButtons::BTN_2, bit(face, 1));
    b.set(GamepadButtons::BTN_3, bit(face, 2));
    b.set(GamepadButtons::BTN_1, bit(face, 3));
    b.set(GamepadButtons::L_SHOULDER_2, bit(face, 4));
    b.set(GamepadButtons::R_SHOULDER_2, bit(face, 5));
    b.set(GamepadButtons::L_SHOULDER, bit(face, 6));
    b.set(GamepadButtons::R_SHOULDER, bit(face, 7));

    let misc = report[1];
    b.set(GamepadButtons::SELECT, bit(misc, 0));
    b.set(GamepadButtons::START, bit(misc, 1));
    // d-pad as a 3x3 grid, 1 is centre on both axes
    let pad = (misc >> 2) & 0x0F;
    let (x, y) = (pad & 0x03, pad >> 2);
    dpad(b, y == 0, y == 2, x == 0, x == 2);

    Ok(out)
}

/// Fields of an XInput gamepad packet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct XInputPad {
    pub buttons: u16,
    pub left_trigger: u8,
    pub right_trigger: u8,
    pub thumb_lx: i16,
    pub thumb_ly: i16,
    pub thumb_rx: i16,
    pub thumb_ry: i16,
}

#[must_use]
pub fn decode_xinput(pad: &XInputPad) -> GamepadReport {
    let mut out = GamepadReport {
        buttons: GamepadButtons(pad.buttons),
        ..GamepadReport::default()
    };
    let axes = [pad.thumb_lx, pad.thumb_ly, pad.thumb_rx, pad.thumb_ry];
    for (i, axis) in axes.into_iter().enumerate() {
        let raw = deadzone(i32::from(axis), 65535, 10);
        out.raw[i] = raw as i16;
        // XInput Y points up, the mouse Y points down
        let scaled = if i == 1 { -(raw / 256) } else { raw / 256 };
        out.sticks[i] = clamp_axis(scaled);
    }
    if pad.left_trigger > TRIGGER_THRESHOLD {
        out.buttons |= GamepadButtons::L_SHOULDER_2;
    }
    if pad.right_trigger > TRIGGER_THRESHOLD {
        out.buttons |= GamepadButtons::R_SHOULDER_2;
    }
    out
}
