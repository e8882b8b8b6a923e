//! Persistent settings: the record, its flash page store and DIP-switch reconciliation.
//!
//! The record is created from [`Settings::DEFAULT`] on first boot, loaded at
//! every boot, mutated by DIP switches and the serial terminal, and written
//! back only on explicit save events.

pub mod dip;
pub mod record;
pub mod store;

pub use dip::{DipGroup, DipSnapshotOrder, DipSwitches, HeldDipChanges};
pub use record::{StoredRecord, PAGE_SIZE};
pub use store::{LoadOutcome, SettingsStore, StoreError};

use crate::types::{BaudRate, CodeSetPreference, CosineLevel, KeyboardType, MouseType, MovementMode};

/// Travel percentages are kept within this range.
pub const TRAVEL_MIN: u8 = 1;
pub const TRAVEL_MAX: u8 = 200;

/// Version of the running firmware, stored alongside the settings.
pub const FIRMWARE_VERSION: FirmwareVersion = FirmwareVersion::new(1, 2, 0);

/// `major.minor.revision` triple.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FirmwareVersion {
    pub major: u8,
    pub minor: u8,
    pub revision: u8,
}

impl FirmwareVersion {
    #[must_use]
    pub const fn new(major: u8, minor: u8, revision: u8) -> Self {
        Self {
            major,
            minor,
            revision,
        }
    }
}

/// Serial mouse configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MouseSettings {
    /// Combined travel percentage, applied last and clamped to a packet.
    pub travel_xy: u8,
    pub travel_x: u8,
    pub travel_y: u8,
    pub mouse_type: MouseType,
    /// 7N2 instead of 7N1.
    pub double_stop_bit: bool,
    pub baud: BaudRate,
    pub swap_left_right: bool,
    /// Use the back/forward side buttons as alternate left/right.
    pub use_side_buttons: bool,
    pub swap_side_buttons: bool,
    pub invert_x: bool,
    pub invert_y: bool,
    pub movement: MovementMode,
    pub cosine: CosineLevel,
    /// Terminal language selector, 0 or 1.
    pub language: u8,
}

impl MouseSettings {
    pub const DEFAULT: Self = Self {
        travel_xy: 100,
        travel_x: 100,
        travel_y: 100,
        mouse_type: MouseType::TwoButton,
        double_stop_bit: false,
        baud: BaudRate::B1200,
        swap_left_right: false,
        use_side_buttons: false,
        swap_side_buttons: false,
        invert_x: false,
        invert_y: false,
        movement: MovementMode::Additive,
        cosine: CosineLevel::OFF,
        language: 0,
    };
}

impl Default for MouseSettings {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// DIN keyboard configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyboardSettings {
    pub kind: KeyboardType,
    /// Clone XT timing; a genuine IBM XT expects the data line held low at power up.
    pub xt_clone: bool,
    pub code_set: CodeSetPreference,
}

impl KeyboardSettings {
    pub const DEFAULT: Self = Self {
        kind: KeyboardType::At,
        xt_clone: true,
        code_set: CodeSetPreference::Auto,
    };
}

impl Default for KeyboardSettings {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// The full persisted record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Settings {
    pub version: FirmwareVersion,
    pub mouse: MouseSettings,
    pub keyboard: KeyboardSettings,
    /// Switch positions seen when the record was last reconciled.
    pub dip: DipSwitches,
}

impl Settings {
    pub const DEFAULT: Self = Self {
        version: FIRMWARE_VERSION,
        mouse: MouseSettings::DEFAULT,
        keyboard: KeyboardSettings::DEFAULT,
        dip: DipSwitches::ALL_OPEN,
    };
}

impl Default for Settings {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Clamp a travel percentage into its legal range.
#[inline]
#[must_use]
pub const fn clamp_travel(value: u8) -> u8 {
    if value < TRAVEL_MIN {
        TRAVEL_MIN
    } else if value > TRAVEL_MAX {
        TRAVEL_MAX
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_shipped_configuration() {
        let s = Settings::DEFAULT;
        assert_eq!(s.mouse.travel_xy, 100);
        assert_eq!(s.mouse.baud, BaudRate::B1200);
        assert_eq!(s.mouse.mouse_type, MouseType::TwoButton);
        assert_eq!(s.keyboard.kind, KeyboardType::At);
        assert!(s.keyboard.xt_clone);
        assert_eq!(s.dip, DipSwitches::ALL_OPEN);
        assert_eq!(s.version, FIRMWARE_VERSION);
    }

    #[test]
    fn test_clamp_travel() {
        assert_eq!(clamp_travel(0), 1);
        assert_eq!(clamp_travel(150), 150);
        assert_eq!(clamp_travel(255), 200);
    }
}
