//! Lock-key LED state and the idle animation shown on USB keyboards.

use embassy_time::Duration;

/// Num/Caps/Scroll combination.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LockLeds {
    pub num: bool,
    pub caps: bool,
    pub scroll: bool,
}

impl LockLeds {
    pub const NONE: Self = Self::new(false, false, false);
    pub const N: Self = Self::new(true, false, false);
    pub const NC: Self = Self::new(true, true, false);
    pub const NCS: Self = Self::new(true, true, true);
    pub const CS: Self = Self::new(false, true, true);
    pub const S: Self = Self::new(false, false, true);

    #[must_use]
    pub const fn new(num: bool, caps: bool, scroll: bool) -> Self {
        Self { num, caps, scroll }
    }

    /// Decode the argument of the host `SetLEDs` command.
    #[must_use]
    pub const fn from_host(arg: u8) -> Self {
        Self {
            scroll: arg & 0x01 != 0,
            num: arg & 0x02 != 0,
            caps: arg & 0x04 != 0,
        }
    }

    #[must_use]
    pub const fn to_host(self) -> u8 {
        (self.scroll as u8) | (self.num as u8) << 1 | (self.caps as u8) << 2
    }

    /// Boot keyboard output report byte.
    #[must_use]
    pub const fn to_usb(self) -> u8 {
        (self.num as u8) | (self.caps as u8) << 1 | (self.scroll as u8) << 2
    }
}

const START_STEP: u8 = 13;

/// Lock-LED chase shown while a USB keyboard is plugged in but no host is
/// on the DIN port.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IdleLedAnimation {
    step: u8,
}

impl IdleLedAnimation {
    #[must_use]
    pub const fn new() -> Self {
        Self { step: START_STEP }
    }

    pub fn restart(&mut self) {
        self.step = START_STEP;
    }

    /// Advance one frame: the LEDs to show and how long to hold them.
    pub fn next_frame(&mut self) -> (LockLeds, Duration) {
        let step = if self.step == 12 { 0 } else { self.step };
        let (leds, ms, next) = match step {
            0 | 6 => (LockLeds::NONE, 2000, step + 1),
            1 | 11 => (LockLeds::N, 400, step + 1),
            2 | 10 => (LockLeds::NC, 400, step + 1),
            3 | 9 => (LockLeds::NCS, 800, step + 1),
            4 | 8 => (LockLeds::CS, 400, step + 1),
            5 | 7 => (LockLeds::S, 400, step + 1),
            // first frame after a restart
            _ => (LockLeds::NCS, 2000, 1),
        };
        self.step = next;
        (leds, Duration::from_millis(ms))
    }
}

impl Default for IdleLedAnimation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_and_usb_bit_orders() {
        let leds = LockLeds::from_host(0x01);
        assert_eq!(leds, LockLeds::S);
        assert_eq!(leds.to_usb(), 0x04);

        let leds = LockLeds::from_host(0x06);
        assert_eq!(leds, LockLeds::NC);
        assert_eq!(leds.to_usb(), 0x03);
        assert_eq!(leds.to_host(), 0x06);
    }

    #[test]
    fn test_idle_animation_sequence() {
        let mut anim = IdleLedAnimation::new();
        let frames: [(LockLeds, u64); 14] = [
            (LockLeds::NCS, 2000),
            (LockLeds::N, 400),
            (LockLeds::NC, 400),
            (LockLeds::NCS, 800),
            (LockLeds::CS, 400),
            (LockLeds::S, 400),
            (LockLeds::NONE, 2000),
            (LockLeds::S, 400),
            (LockLeds::CS, 400),
            (LockLeds::NCS, 800),
            (LockLeds::NC, 400),
            (LockLeds::N, 400),
            // wraps through step 0
            (LockLeds::NONE, 2000),
            (LockLeds::N, 400),
        ];
        for (leds, ms) in frames {
            assert_eq!(anim.next_frame(), (leds, Duration::from_millis(ms)));
        }

        anim.restart();
        assert_eq!(anim.next_frame().0, LockLeds::NCS);
    }
}
