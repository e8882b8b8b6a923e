//! Shared value types: mouse/keyboard configuration enums and the gamepad button mask.

use core::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};

/// Serial mouse flavour presented to the host.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum MouseType {
    /// Microsoft two-button mouse, 3-byte packets.
    #[default]
    TwoButton = 0,
    /// Logitech three-button extension.
    ThreeButton = 1,
    /// Microsoft wheel mouse, 4-byte packets.
    Wheel = 2,
}

impl MouseType {
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::TwoButton),
            1 => Some(Self::ThreeButton),
            2 => Some(Self::Wheel),
            _ => None,
        }
    }

    /// Whether the middle button is reported at all.
    #[inline]
    #[must_use]
    pub const fn has_middle(self) -> bool {
        !matches!(self, Self::TwoButton)
    }

    /// Number of bytes in a full packet, used for cadence.
    #[inline]
    #[must_use]
    pub const fn packet_bytes(self) -> u32 {
        match self {
            Self::TwoButton => 3,
            Self::ThreeButton | Self::Wheel => 4,
        }
    }
}

/// How buffered USB motion becomes per-cycle serial motion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum MovementMode {
    /// Everything accumulated this cycle is sent.
    #[default]
    Additive = 0,
    /// Accumulated motion divided by the number of USB samples.
    Average = 1,
    /// At most 127 counts per cycle, the rest carries over.
    Coast = 2,
}

impl MovementMode {
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Additive),
            1 => Some(Self::Average),
            2 => Some(Self::Coast),
            _ => None,
        }
    }
}

/// Cosine smoothing strength, 0 (off) through 4 (very high).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CosineLevel(u8);

impl CosineLevel {
    pub const OFF: Self = Self(0);
    pub const MAX: u8 = 4;

    #[must_use]
    pub const fn new(level: u8) -> Option<Self> {
        if level <= Self::MAX {
            Some(Self(level))
        } else {
            None
        }
    }

    #[inline]
    #[must_use]
    pub const fn level(self) -> u8 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn is_off(self) -> bool {
        self.0 == 0
    }
}

/// Legal serial mouse baud rates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BaudRate {
    #[default]
    B1200,
    B2400,
    B4800,
    B9600,
    B19200,
}

impl BaudRate {
    pub const ALL: [Self; 5] = [Self::B1200, Self::B2400, Self::B4800, Self::B9600, Self::B19200];

    #[must_use]
    pub const fn bps(self) -> u32 {
        match self {
            Self::B1200 => 1200,
            Self::B2400 => 2400,
            Self::B4800 => 4800,
            Self::B9600 => 9600,
            Self::B19200 => 19200,
        }
    }

    #[must_use]
    pub const fn from_bps(bps: u32) -> Option<Self> {
        match bps {
            1200 => Some(Self::B1200),
            2400 => Some(Self::B2400),
            4800 => Some(Self::B4800),
            9600 => Some(Self::B9600),
            19200 => Some(Self::B19200),
            _ => None,
        }
    }

    /// Multiple of 1200, the form stored in flash.
    #[inline]
    #[must_use]
    pub const fn ratio(self) -> u8 {
        (self.bps() / 1200) as u8
    }

    #[must_use]
    pub const fn from_ratio(ratio: u8) -> Option<Self> {
        Self::from_bps(ratio as u32 * 1200)
    }
}

/// Which legacy keyboard the DIN port emulates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum KeyboardType {
    Xt = 0,
    #[default]
    At = 1,
}

impl KeyboardType {
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Xt),
            1 => Some(Self::At),
            _ => None,
        }
    }
}

/// Persisted scan code set preference for AT mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum CodeSetPreference {
    #[default]
    Auto = 0,
    Set1 = 1,
    Set2 = 2,
    Set3 = 3,
}

impl CodeSetPreference {
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Auto),
            1 => Some(Self::Set1),
            2 => Some(Self::Set2),
            3 => Some(Self::Set3),
            _ => None,
        }
    }
}

/// Scan code set in use for the current host session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScanCodeSet {
    Set1,
    #[default]
    Set2,
    Set3,
}

impl ScanCodeSet {
    /// Number reported to the host by `SetScanCodeSet 0`.
    #[inline]
    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            Self::Set1 => 1,
            Self::Set2 => 2,
            Self::Set3 => 3,
        }
    }

    #[must_use]
    pub const fn from_number(number: u8) -> Option<Self> {
        match number {
            1 => Some(Self::Set1),
            2 => Some(Self::Set2),
            3 => Some(Self::Set3),
            _ => None,
        }
    }
}

/// Serial mouse buttons, indexed for the flip-flop slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MouseButton {
    Left = 0,
    Middle = 1,
    Right = 2,
}

/// Normalized gamepad button mask.
///
/// The layout matches the XInput `wButtons` word, so XInput reports copy
/// straight in; the two trigger bits are synthesized.
///
/// ```
/// use legacy_core::GamepadButtons;
///
/// let buttons = GamepadButtons::BTN_1 | GamepadButtons::DPAD_UP;
/// assert!(buttons.contains(GamepadButtons::BTN_1));
/// assert!(!buttons.contains(GamepadButtons::START));
/// ```
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GamepadButtons(pub u16);

impl GamepadButtons {
    pub const DPAD_UP: Self = Self(0x0001);
    pub const DPAD_DOWN: Self = Self(0x0002);
    pub const DPAD_LEFT: Self = Self(0x0004);
    pub const DPAD_RIGHT: Self = Self(0x0008);
    pub const START: Self = Self(0x0010);
    pub const SELECT: Self = Self(0x0020);
    pub const L_STICK: Self = Self(0x0040);
    pub const R_STICK: Self = Self(0x0080);
    pub const L_SHOULDER: Self = Self(0x0100);
    pub const R_SHOULDER: Self = Self(0x0200);
    pub const L_SHOULDER_2: Self = Self(0x0400);
    pub const R_SHOULDER_2: Self = Self(0x0800);
    pub const BTN_1: Self = Self(0x1000);
    pub const BTN_2: Self = Self(0x2000);
    pub const BTN_3: Self = Self(0x4000);
    pub const BTN_4: Self = Self(0x8000);

    pub const NONE: Self = Self(0);

    #[inline]
    #[must_use]
    pub const fn contains(self, button: GamepadButtons) -> bool {
        (self.0 & button.0) == button.0
    }

    #[inline]
    pub fn set(&mut self, button: GamepadButtons, pressed: bool) {
        if pressed {
            self.0 |= button.0;
        } else {
            self.0 &= !button.0;
        }
    }

    #[inline]
    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for GamepadButtons {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for GamepadButtons {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for GamepadButtons {
    type Output = Self;

    #[inline]
    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0)
    }
}

impl BitAndAssign for GamepadButtons {
    #[inline]
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl Not for GamepadButtons {
    type Output = Self;

    #[inline]
    fn not(self) -> Self::Output {
        Self(!self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baud_ratio_round_trip() {
        for baud in BaudRate::ALL {
            assert_eq!(BaudRate::from_ratio(baud.ratio()), Some(baud));
        }
        assert_eq!(BaudRate::from_ratio(0), None);
        assert_eq!(BaudRate::from_ratio(3), None);
    }

    #[test]
    fn test_mouse_type_packet_size() {
        assert_eq!(MouseType::TwoButton.packet_bytes(), 3);
        assert_eq!(MouseType::ThreeButton.packet_bytes(), 4);
        assert_eq!(MouseType::Wheel.packet_bytes(), 4);
        assert!(!MouseType::TwoButton.has_middle());
        assert!(MouseType::Wheel.has_middle());
    }

    #[test]
    fn test_cosine_level_range() {
        assert_eq!(CosineLevel::new(4).map(CosineLevel::level), Some(4));
        assert!(CosineLevel::new(5).is_none());
        assert!(CosineLevel::OFF.is_off());
    }

    #[test]
    fn test_gamepad_buttons_set_and_clear() {
        let mut buttons = GamepadButtons::NONE;
        buttons.set(GamepadButtons::START, true);
        buttons |= GamepadButtons::BTN_4;
        assert_eq!(buttons.raw(), 0x8010);
        buttons.set(GamepadButtons::START, false);
        assert_eq!(buttons, GamepadButtons::BTN_4);
        assert!((buttons & !GamepadButtons::BTN_4).is_empty());
    }
}
