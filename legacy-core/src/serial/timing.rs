//! Serial mouse cadence derived from baud rate and frame format.

use embassy_time::{Duration, Instant};
use fixed::types::U32F32;
use fixed_macro::fixed;

use crate::settings::MouseSettings;
use crate::types::{BaudRate, MovementMode};

/// A 200 baud 8N1 byte takes 50 ms.
const REFERENCE_BYTE_US: U32F32 = fixed!(50000: U32F32);
const REFERENCE_BAUD: U32F32 = fixed!(200: U32F32);

/// Extra time allowed per byte.
const TX_GUARD_US: U32F32 = fixed!(0: U32F32);

/// Character pacing for terminal output on the auxiliary UART.
pub const AUX_TERMINAL_CHAR_DELAY: Duration = Duration::from_micros(1500);

/// Derived serial timing for one mouse configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SerialTiming {
    /// One byte including start and stop bits, microseconds.
    pub byte_us: u32,
    pub packet3_us: u32,
    pub packet4_us: u32,
}

impl SerialTiming {
    #[must_use]
    pub fn new(baud: BaudRate, double_stop_bit: bool) -> Self {
        let bits: u64 = if double_stop_bit { 9 } else { 8 };
        let bit = REFERENCE_BYTE_US / (U32F32::from_num(baud.bps()) / REFERENCE_BAUD) / 9u64;
        let byte = (bit * bits + TX_GUARD_US).ceil();
        let byte_us = byte.to_num::<u32>();

        Self {
            byte_us,
            packet3_us: byte_us * 3,
            packet4_us: byte_us * 4,
        }
    }

    #[must_use]
    pub fn for_settings(settings: &MouseSettings) -> Self {
        Self::new(settings.baud, settings.double_stop_bit)
    }

    /// Time between packet requests for the given packet length in bytes.
    #[inline]
    #[must_use]
    pub fn packet_us(&self, bytes: u32) -> u32 {
        if bytes <= 3 {
            self.packet3_us
        } else {
            self.packet4_us
        }
    }

    #[must_use]
    pub fn cycle(&self, settings: &MouseSettings) -> Duration {
        Duration::from_micros(u64::from(self.packet_us(settings.mouse_type.packet_bytes())))
    }
}

/// Minimum spacing between USB mouse polls. Only Average mode throttles.
#[must_use]
pub fn usb_poll_throttle(settings: &MouseSettings) -> Option<Duration> {
    if settings.movement != MovementMode::Average {
        return None;
    }
    let ms = match settings.baud {
        BaudRate::B19200 => 1,
        BaudRate::B9600 => 2,
        _ => 4,
    };
    Some(Duration::from_millis(ms))
}

/// Character pacing for terminal output sharing the mouse UART.
#[must_use]
pub fn mouse_terminal_char_delay(baud: BaudRate) -> Duration {
    Duration::from_micros(u64::from(10_000 / u32::from(baud.ratio())))
}

/// Start of the serial cycle after the one due at `due`. Cycles keep a
/// fixed start-to-start period; a deadline already behind `now` restarts the
/// cadence from `now` instead of firing a burst.
#[must_use]
pub fn next_cycle(due: Instant, cycle: Duration, now: Instant) -> Instant {
    let next = due + cycle;
    if next <= now {
        now + cycle
    } else {
        next
    }
}
