//! DIP-switch reconciliation.
//!
//! Switch levels are stored as read from the pins: `true` means open
//! (pulled up), `false` means closed. A closed switch selects its option.

use crate::settings::{MouseSettings, Settings};
use crate::types::{BaudRate, MouseType};

/// Snapshot of the six mouse DIP switches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DipSwitches {
    pub three_button: bool,
    pub wheel: bool,
    pub speed_75: bool,
    pub speed_50: bool,
    pub two_stop_bits: bool,
    pub baud_19200: bool,
}

impl DipSwitches {
    pub const ALL_OPEN: Self = Self {
        three_button: true,
        wheel: true,
        speed_75: true,
        speed_50: true,
        two_stop_bits: true,
        baud_19200: true,
    };

    /// Whether `self` and `other` agree on every switch of `group`.
    #[must_use]
    pub const fn group_matches(&self, other: &Self, group: DipGroup) -> bool {
        match group {
            DipGroup::MouseType => {
                self.three_button == other.three_button && self.wheel == other.wheel
            }
            DipGroup::Speed => self.speed_75 == other.speed_75 && self.speed_50 == other.speed_50,
            DipGroup::Format => self.two_stop_bits == other.two_stop_bits,
            DipGroup::Baud => self.baud_19200 == other.baud_19200,
        }
    }

    /// Set the settings controlled by `group` from these switch levels.
    pub fn apply_group(&self, group: DipGroup, mouse: &mut MouseSettings) {
        match group {
            DipGroup::MouseType => {
                mouse.mouse_type = if !self.wheel {
                    MouseType::Wheel
                } else if !self.three_button {
                    MouseType::ThreeButton
                } else {
                    MouseType::TwoButton
                };
            }
            DipGroup::Speed => {
                mouse.travel_xy = match (self.speed_75, self.speed_50) {
                    (false, false) => 25,
                    (_, false) => 50,
                    (false, true) => 75,
                    (true, true) => 100,
                };
            }
            DipGroup::Format => mouse.double_stop_bit = !self.two_stop_bits,
            DipGroup::Baud => {
                mouse.baud = if self.baud_19200 {
                    BaudRate::B1200
                } else {
                    BaudRate::B19200
                };
            }
        }
    }
}

impl Default for DipSwitches {
    fn default() -> Self {
        Self::ALL_OPEN
    }
}

/// Switches that change one setting together and share a debounce timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DipGroup {
    MouseType,
    Speed,
    Format,
    Baud,
}

impl DipGroup {
    pub const ALL: [Self; 4] = [Self::MouseType, Self::Speed, Self::Format, Self::Baud];
}

/// How a runtime change records the mouse-type switches.
///
/// `Swapped` stores the wheel switch in the three-button slot and vice
/// versa, which older firmware did; the next boot then sees a mismatch and
/// re-applies the mouse type from the switches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DipSnapshotOrder {
    #[default]
    Straight,
    Swapped,
}

/// Boot-time check: apply every group whose switches moved since the last
/// snapshot. Returns `true` when the record changed and must be saved.
pub fn reconcile_boot(settings: &mut Settings, live: DipSwitches) -> bool {
    let mut changed = false;
    for group in DipGroup::ALL {
        if !settings.dip.group_matches(&live, group) {
            live.apply_group(group, &mut settings.mouse);
            changed = true;
        }
    }
    if changed {
        settings.dip = live;
    }
    changed
}

/// Debounced runtime change of `group`: apply it and snapshot every switch.
pub fn apply_runtime_change(
    settings: &mut Settings,
    live: DipSwitches,
    group: DipGroup,
    order: DipSnapshotOrder,
) {
    live.apply_group(group, &mut settings.mouse);
    settings.dip = match order {
        DipSnapshotOrder::Straight => live,
        DipSnapshotOrder::Swapped => DipSwitches {
            three_button: live.wheel,
            wheel: live.three_button,
            ..live
        },
    };
}

/// Runtime changes held back while a terminal session owns the serial
/// port. Applied together, with the latest switch levels, once the bus core
/// can be stopped again.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HeldDipChanges {
    live: Option<DipSwitches>,
    groups: [bool; 4],
}

impl HeldDipChanges {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            live: None,
            groups: [false; 4],
        }
    }

    pub fn hold(&mut self, group: DipGroup, live: DipSwitches) {
        self.live = Some(live);
        self.groups[group as usize] = true;
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.live.is_none()
    }

    /// Apply every held group to `settings` and clear. Returns `false` when
    /// nothing was held.
    pub fn apply(&mut self, settings: &mut Settings, order: DipSnapshotOrder) -> bool {
        let Some(live) = self.live.take() else {
            return false;
        };
        for group in DipGroup::ALL {
            if core::mem::take(&mut self.groups[group as usize]) {
                apply_runtime_change(settings, live, group, order);
            }
        }
        true
    }
}
