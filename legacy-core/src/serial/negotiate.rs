//! CTS-driven identification handshake.
//!
//! The host drops RTS (seen here as CTS asserted through the level shifter)
//! and raises it again to reset the mouse; the mouse answers with its
//! identity once the line is released.

use embassy_time::Duration;

use crate::serial::timing::SerialTiming;
use crate::types::MouseType;

/// Where the host handshake stands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PcState {
    /// Nothing seen since boot.
    #[default]
    Uninit,
    /// Host is holding the line, identify on release.
    LowInit,
    /// Identity sent.
    Toggled,
}

/// What the caller has to do after feeding a CTS sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CtsAction {
    Idle,
    /// Sample again after the given delay and report through [`CtsTracker::confirm`].
    Recheck(Duration),
    /// Send the identity string now.
    Negotiate,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct CtsTracker {
    state: PcState,
}

impl CtsTracker {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: PcState::Uninit,
        }
    }

    #[inline]
    #[must_use]
    pub const fn state(&self) -> PcState {
        self.state
    }

    /// Feed the current CTS level.
    pub fn sample(&mut self, asserted: bool, mouse_type: MouseType, timing: &SerialTiming) -> CtsAction {
        match (asserted, self.state) {
            (true, PcState::Toggled) => {
                // Logitech drivers pulse the line while games load; give a
                // connected three-button mouse a packet's time to settle.
                let wait = if mouse_type == MouseType::ThreeButton {
                    Duration::from_micros(u64::from(timing.packet3_us))
                } else {
                    Duration::from_ticks(0)
                };
                CtsAction::Recheck(wait)
            }
            (true, _) => {
                self.state = PcState::LowInit;
                CtsAction::Idle
            }
            // CTMouse never pulls the line after losing the mouse, so a
            // released line before any handshake also identifies.
            (false, PcState::LowInit | PcState::Uninit) => {
                self.state = PcState::Toggled;
                CtsAction::Negotiate
            }
            (false, PcState::Toggled) => CtsAction::Idle,
        }
    }

    /// Result of the re-sample requested by [`CtsAction::Recheck`].
    pub fn confirm(&mut self, asserted: bool) {
        if asserted {
            self.state = PcState::LowInit;
        }
    }

    /// Forget the handshake, used when the mouse protocol changes.
    pub fn reset(&mut self) {
        self.state = PcState::Uninit;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BaudRate;

    fn timing() -> SerialTiming {
        SerialTiming::new(BaudRate::B1200, false)
    }

    #[test]
    fn test_identifies_once_after_toggle() {
        let t = timing();
        let mut cts = CtsTracker::new();
        assert_eq!(cts.sample(true, MouseType::TwoButton, &t), CtsAction::Idle);
        assert_eq!(cts.state(), PcState::LowInit);
        assert_eq!(cts.sample(false, MouseType::TwoButton, &t), CtsAction::Negotiate);
        assert_eq!(cts.state(), PcState::Toggled);
        assert_eq!(cts.sample(false, MouseType::TwoButton, &t), CtsAction::Idle);
    }

    #[test]
    fn test_released_line_at_boot_identifies() {
        let t = timing();
        let mut cts = CtsTracker::new();
        assert_eq!(cts.sample(false, MouseType::Wheel, &t), CtsAction::Negotiate);
    }

    #[test]
    fn test_spurious_pulse_is_filtered() {
        let t = timing();
        let mut cts = CtsTracker::new();
        cts.sample(false, MouseType::ThreeButton, &t);

        let action = cts.sample(true, MouseType::ThreeButton, &t);
        assert_eq!(action, CtsAction::Recheck(Duration::from_micros(22_224)));
        cts.confirm(false);
        assert_eq!(cts.state(), PcState::Toggled);
        assert_eq!(cts.sample(false, MouseType::ThreeButton, &t), CtsAction::Idle);
    }

    #[test]
    fn test_held_line_reidentifies() {
        let t = timing();
        let mut cts = CtsTracker::new();
        cts.sample(false, MouseType::TwoButton, &t);

        assert_eq!(
            cts.sample(true, MouseType::TwoButton, &t),
            CtsAction::Recheck(Duration::from_ticks(0))
        );
        cts.confirm(true);
        assert_eq!(cts.state(), PcState::LowInit);
        assert_eq!(cts.sample(false, MouseType::TwoButton, &t), CtsAction::Negotiate);
    }
}
