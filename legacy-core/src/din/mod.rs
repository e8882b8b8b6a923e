//! DIN keyboard port: line access and the bit-banged AT/XT transport.
//!
//! The port is wired through open-collector drivers, so each line has a
//! separate input and output pin and the output sense is inverted: setting
//! the output pin high pulls the bus line low.

pub mod transport;

use core::convert::Infallible;

use embedded_hal::digital::{InputPin, OutputPin};

pub use transport::DinTransport;

/// Basic assurance test passed, sent after power-up and reset.
pub const BAT_OK: u8 = 0xAA;

/// Attempts made by [`KeyboardBus::announce`] before giving up.
pub const ANNOUNCE_ATTEMPTS: u8 = 5;

/// Transport failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DinError {
    /// Clock line was held low by the host when a transmit started.
    ClockLine,
    /// Data line was held low by the host when a transmit started.
    DataLine,
    /// No start condition from the host within the read window.
    Timeout,
    /// Received parity did not match the data bits.
    Parity,
}

/// Wire protocol spoken on the port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Protocol {
    /// 11-bit frames, host clocked requests, odd parity.
    At,
    /// 9-bit frames with two start bits, device to host only.
    Xt,
}

/// Combined level of the clock and data lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineState {
    /// Both lines released.
    Idle,
    /// Exactly one line pulled low: the host is inhibiting or requesting to send.
    Requesting,
    /// Both lines low, the host is most likely powered off.
    Dead,
}

impl LineState {
    #[must_use]
    pub const fn from_levels(clock: bool, data: bool) -> Self {
        match (clock, data) {
            (true, true) => Self::Idle,
            (false, false) => Self::Dead,
            _ => Self::Requesting,
        }
    }

    /// Something other than an idle bus, the trigger for a host read.
    #[inline]
    #[must_use]
    pub const fn is_available(self) -> bool {
        !matches!(self, Self::Idle)
    }
}

/// The two bus lines as seen by the device.
///
/// `true` is a released (high) line. Reads report the bus level, which is
/// low whenever either side pulls it down.
pub trait DinLines {
    fn clock(&mut self) -> bool;
    fn data(&mut self) -> bool;
    fn set_clock(&mut self, high: bool);
    fn set_data(&mut self, high: bool);

    /// Snapshot of both lines. Has no side effects.
    fn line_state(&mut self) -> LineState {
        let clock = self.clock();
        let data = self.data();
        LineState::from_levels(clock, data)
    }
}

impl<T: DinLines + ?Sized> DinLines for &mut T {
    #[inline]
    fn clock(&mut self) -> bool {
        (**self).clock()
    }

    #[inline]
    fn data(&mut self) -> bool {
        (**self).data()
    }

    #[inline]
    fn set_clock(&mut self, high: bool) {
        (**self).set_clock(high)
    }

    #[inline]
    fn set_data(&mut self, high: bool) {
        (**self).set_data(high)
    }
}

/// [`DinLines`] over four GPIOs behind NPN line drivers.
pub struct GpioDinLines<CI, CO, DI, DO> {
    clock_in: CI,
    clock_out: CO,
    data_in: DI,
    data_out: DO,
}

impl<CI, CO, DI, DO> GpioDinLines<CI, CO, DI, DO>
where
    CI: InputPin<Error = Infallible>,
    DI: InputPin<Error = Infallible>,
    CO: OutputPin<Error = Infallible>,
    DO: OutputPin<Error = Infallible>,
{
    /// Takes the pins and releases both lines.
    pub fn new(clock_in: CI, clock_out: CO, data_in: DI, data_out: DO) -> Self {
        let mut lines = Self {
            clock_in,
            clock_out,
            data_in,
            data_out,
        };
        lines.set_clock(true);
        lines.set_data(true);
        lines
    }

    /// Clock input, for waiting on the host powering the port.
    pub fn clock_in_mut(&mut self) -> &mut CI {
        &mut self.clock_in
    }
}

#[inline]
fn level<P: InputPin<Error = Infallible>>(pin: &mut P) -> bool {
    match pin.is_high() {
        Ok(high) => high,
        Err(never) => match never {},
    }
}

#[inline]
fn drive<P: OutputPin<Error = Infallible>>(pin: &mut P, high: bool) {
    // the driver transistor inverts
    let result = if high { pin.set_low() } else { pin.set_high() };
    if let Err(never) = result {
        match never {}
    }
}

impl<CI, CO, DI, DO> DinLines for GpioDinLines<CI, CO, DI, DO>
where
    CI: InputPin<Error = Infallible>,
    DI: InputPin<Error = Infallible>,
    CO: OutputPin<Error = Infallible>,
    DO: OutputPin<Error = Infallible>,
{
    fn clock(&mut self) -> bool {
        level(&mut self.clock_in)
    }

    fn data(&mut self) -> bool {
        level(&mut self.data_in)
    }

    fn set_clock(&mut self, high: bool) {
        drive(&mut self.clock_out, high);
    }

    fn set_data(&mut self, high: bool) {
        drive(&mut self.data_out, high);
    }
}

/// Byte-level access to the keyboard port used by the protocol engine.
pub trait KeyboardBus {
    /// Send one byte. Fails fast if the host is holding either line.
    fn transmit(&mut self, protocol: Protocol, byte: u8) -> Result<(), DinError>;

    /// Read one host-to-device byte (AT only).
    fn receive(&mut self) -> Result<u8, DinError>;

    fn line_state(&mut self) -> LineState;

    /// XT hosts request a reset by holding clock low for 10 ms or more.
    fn reset_requested(&mut self) -> bool;

    /// Hold the data line low while waiting for an IBM XT to start.
    fn hold_data_low(&mut self, hold: bool);

    fn pause_ms(&mut self, ms: u32);

    /// Announce the keyboard with [`BAT_OK`], retrying 10 ms apart.
    fn announce(&mut self, protocol: Protocol) -> bool {
        for attempt in 0..ANNOUNCE_ATTEMPTS {
            if self.transmit(protocol, BAT_OK).is_ok() {
                return true;
            }
            if attempt + 1 < ANNOUNCE_ATTEMPTS {
                self.pause_ms(10);
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_state_classification() {
        assert_eq!(LineState::from_levels(true, true), LineState::Idle);
        assert_eq!(LineState::from_levels(false, false), LineState::Dead);
        assert_eq!(LineState::from_levels(true, false), LineState::Requesting);
        assert_eq!(LineState::from_levels(false, true), LineState::Requesting);
        assert!(!LineState::Idle.is_available());
        assert!(LineState::Dead.is_available());
        assert!(LineState::Requesting.is_available());
    }
}
