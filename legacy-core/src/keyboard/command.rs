//! Host-to-keyboard command bytes and the typematic argument tables.

use embassy_time::Duration;

pub const ACK: u8 = 0xFA;
pub const ECHO_REPLY: u8 = 0xEE;
pub const KEYBOARD_ID: [u8; 2] = [0xAB, 0x83];

/// Commands an AT/PS2 controller can send.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum HostCommand {
    Reset = 0xFF,
    Resend = 0xFE,
    SetKeyTypeMake = 0xFD,
    SetKeyTypeMakeBreak = 0xFC,
    SetKeyTypeTypematic = 0xFB,
    SetAllKeysTypematicMakeBreak = 0xFA,
    SetAllKeysMake = 0xF9,
    SetAllKeysMakeBreak = 0xF8,
    SetAllKeysTypematic = 0xF7,
    SetDefault = 0xF6,
    Disable = 0xF5,
    Enable = 0xF4,
    SetTypematicRateDelay = 0xF3,
    ReadId = 0xF2,
    SetScanCodeSet = 0xF0,
    Echo = 0xEE,
    SetLeds = 0xED,
}

impl HostCommand {
    #[must_use]
    pub const fn from_u8(byte: u8) -> Option<Self> {
        Some(match byte {
            0xFF => Self::Reset,
            0xFE => Self::Resend,
            0xFD => Self::SetKeyTypeMake,
            0xFC => Self::SetKeyTypeMakeBreak,
            0xFB => Self::SetKeyTypeTypematic,
            0xFA => Self::SetAllKeysTypematicMakeBreak,
            0xF9 => Self::SetAllKeysMake,
            0xF8 => Self::SetAllKeysMakeBreak,
            0xF7 => Self::SetAllKeysTypematic,
            0xF6 => Self::SetDefault,
            0xF5 => Self::Disable,
            0xF4 => Self::Enable,
            0xF3 => Self::SetTypematicRateDelay,
            0xF2 => Self::ReadId,
            0xF0 => Self::SetScanCodeSet,
            0xEE => Self::Echo,
            0xED => Self::SetLeds,
            _ => return None,
        })
    }

    /// Whether the host follows the command with an argument byte.
    #[must_use]
    pub const fn takes_argument(self) -> bool {
        matches!(
            self,
            Self::SetTypematicRateDelay | Self::SetScanCodeSet | Self::SetLeds
        )
    }
}

/// Which key transitions are reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyMode(u8);

impl KeyMode {
    pub const TYPEMATIC: u8 = 0x01;
    pub const BREAK: u8 = 0x02;
    pub const MAKE: u8 = 0x04;

    pub const ALL: Self = Self(Self::TYPEMATIC | Self::BREAK | Self::MAKE);
    pub const MAKE_ONLY: Self = Self(Self::MAKE);
    pub const MAKE_BREAK: Self = Self(Self::MAKE | Self::BREAK);
    pub const MAKE_TYPEMATIC: Self = Self(Self::MAKE | Self::TYPEMATIC);

    #[inline]
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn typematic(self) -> bool {
        self.0 & Self::TYPEMATIC != 0
    }

    #[inline]
    #[must_use]
    pub const fn sends_break(self) -> bool {
        self.0 & Self::BREAK != 0
    }

    #[inline]
    #[must_use]
    pub const fn sends_make(self) -> bool {
        self.0 & Self::MAKE != 0
    }
}

impl Default for KeyMode {
    fn default() -> Self {
        Self::ALL
    }
}

const TYPEMATIC_RATE_MS: [u16; 32] = [
    33, 37, 42, 46, 48, 54, 58, 63, 67, 75, 83, 92, 100, 109, 116, 125, 133, 149, 167, 182, 200,
    217, 233, 250, 270, 303, 333, 370, 400, 435, 476, 500,
];

const TYPEMATIC_DELAY_MS: [u16; 4] = [250, 500, 750, 1000];

pub const DEFAULT_TYPEMATIC_DELAY: Duration = Duration::from_millis(500);
pub const DEFAULT_TYPEMATIC_RATE: Duration = Duration::from_millis(100);

/// Decode a `SetTypematicRateDelay` argument into `(delay, repeat period)`.
#[must_use]
pub fn typematic_arg(arg: u8) -> (Duration, Duration) {
    let delay = TYPEMATIC_DELAY_MS[usize::from((arg & 0x60) >> 5)];
    let rate = TYPEMATIC_RATE_MS[usize::from(arg & 0x1F)];
    (
        Duration::from_millis(u64::from(delay)),
        Duration::from_millis(u64::from(rate)),
    )
}
