//! Bit timing for the AT and XT keyboard protocols.
//!
//! The device always generates the clock. Every routine busy-waits through
//! the blocking [`DelayNs`] so the phase lengths stay exact; none of them
//! yields.

use embassy_time::{Duration, Instant};
use embedded_hal::delay::DelayNs;

use crate::clock::Clock;
use crate::din::{DinError, DinLines, KeyboardBus, LineState, Protocol};

/// AT clock phase, µs.
const CLK_FULL: u32 = 40;
/// Offset into a phase where the data line changes, µs.
const CLK_HALF: u32 = 20;

/// Data low before the XT start bits, µs.
const XT_CLK_INIT: u32 = 50;
const XT_CLK_FULL: u32 = 66;
const XT_CLK_HALF: u32 = 30;

/// Minimum gap between two transmitted bytes.
const BYTE_GAP: Duration = Duration::from_micros(1000);
/// Window for the host to present a start bit.
const READ_TIMEOUT: Duration = Duration::from_millis(30);
/// Clock-low time that an XT host uses to request a reset.
const XT_RESET_HOLD: Duration = Duration::from_millis(10);

/// Sampling interval while waiting on the host.
const POLL_US: u32 = 5;

pub struct DinTransport<L, D, C> {
    lines: L,
    delay: D,
    clock: C,
    not_before: Instant,
}

impl<L, D, C> DinTransport<L, D, C>
where
    L: DinLines,
    D: DelayNs,
    C: Clock,
{
    pub fn new(mut lines: L, delay: D, clock: C) -> Self {
        lines.set_clock(true);
        lines.set_data(true);
        Self {
            lines,
            delay,
            clock,
            not_before: Instant::from_ticks(0),
        }
    }

    pub fn lines_mut(&mut self) -> &mut L {
        &mut self.lines
    }

    pub fn into_inner(self) -> (L, D, C) {
        (self.lines, self.delay, self.clock)
    }

    fn wait_byte_gap(&mut self) {
        let now = self.clock.now();
        if now < self.not_before {
            let wait = (self.not_before - now).as_micros();
            self.delay.delay_us(u32::try_from(wait).unwrap_or(u32::MAX));
        }
    }

    fn check_released(&mut self) -> Result<(), DinError> {
        if !self.lines.clock() {
            return Err(DinError::ClockLine);
        }
        if !self.lines.data() {
            return Err(DinError::DataLine);
        }
        Ok(())
    }

    /// One AT clock cycle: half, low for a full phase, high, half.
    fn at_clock_pulse(&mut self) {
        self.delay.delay_us(CLK_HALF);
        self.lines.set_clock(false);
        self.delay.delay_us(CLK_FULL);
        self.lines.set_clock(true);
        self.delay.delay_us(CLK_HALF);
    }

    /// Send `byte` as an AT frame: start 0, eight data bits LSB first,
    /// odd parity, stop 1. The host samples on the falling clock edge.
    pub fn at_write(&mut self, byte: u8) -> Result<(), DinError> {
        self.wait_byte_gap();
        self.check_released()?;

        let mut parity = 1u8;
        for bit in 0..11u8 {
            let level = match bit {
                0 => false,
                9 => parity != 0,
                10 => true,
                _ => {
                    let b = (byte >> (bit - 1)) & 1;
                    parity ^= b;
                    b != 0
                }
            };
            self.lines.set_data(level);
            self.at_clock_pulse();
        }

        self.not_before = self.clock.now() + BYTE_GAP;
        #[cfg(feature = "defmt")]
        defmt::trace!("din at tx {=u8:#x}", byte);
        Ok(())
    }

    /// Read one host-to-device AT frame and acknowledge it.
    ///
    /// The acknowledge is clocked even on a parity error; the byte is then
    /// discarded.
    pub fn at_read(&mut self) -> Result<u8, DinError> {
        let start = self.clock.now();
        while self.lines.data() || !self.lines.clock() {
            if self.clock.now() - start >= READ_TIMEOUT {
                return Err(DinError::Timeout);
            }
            self.delay.delay_us(POLL_US);
        }

        let mut value = 0u8;
        let mut parity = 1u8;
        let mut received_parity = 0u8;
        for bit in 0..10u8 {
            match bit {
                0 => {}
                9 => received_parity = u8::from(self.lines.data()),
                _ => {
                    let b = u8::from(self.lines.data());
                    value |= b << (bit - 1);
                    parity ^= b;
                }
            }
            self.at_clock_pulse();
        }

        // ack: data low across one more clock
        self.delay.delay_us(CLK_HALF);
        self.lines.set_data(false);
        self.lines.set_clock(false);
        self.delay.delay_us(CLK_FULL);
        self.lines.set_clock(true);
        self.delay.delay_us(CLK_HALF);
        self.lines.set_data(true);

        #[cfg(feature = "defmt")]
        defmt::trace!("din at rx {=u8:#x}", value);

        if received_parity != parity {
            return Err(DinError::Parity);
        }
        Ok(value)
    }

    /// Send `byte` as an XT frame: an attention pulse on data, a long start
    /// clock, then a 1 start bit and eight data bits LSB first.
    pub fn xt_write(&mut self, byte: u8) -> Result<(), DinError> {
        self.wait_byte_gap();
        self.check_released()?;

        self.lines.set_data(false);
        self.delay.delay_us(XT_CLK_INIT);

        self.lines.set_clock(false);
        self.lines.set_data(true);
        self.delay.delay_us(XT_CLK_FULL);
        self.lines.set_clock(true);

        for bit in 0..9u8 {
            let level = bit == 0 || (byte >> (bit - 1)) & 1 != 0;
            self.lines.set_data(level);
            self.delay.delay_us(XT_CLK_FULL);
            self.lines.set_clock(false);
            self.delay.delay_us(XT_CLK_HALF);
            self.lines.set_clock(true);
        }

        self.not_before = self.clock.now() + BYTE_GAP;
        #[cfg(feature = "defmt")]
        defmt::trace!("din xt tx {=u8:#x}", byte);
        Ok(())
    }

    /// Measure a clock-low period from an XT host.
    ///
    /// Returns `true` once the clock has been low for the reset hold time.
    /// Waiting is capped at the read timeout so a stuck line cannot stall
    /// the caller.
    pub fn xt_reset_requested(&mut self) -> bool {
        if self.lines.clock() {
            return false;
        }
        let start = self.clock.now();
        while !self.lines.clock() {
            if self.clock.now() - start >= READ_TIMEOUT {
                break;
            }
            self.delay.delay_us(POLL_US);
        }
        self.clock.now() - start >= XT_RESET_HOLD
    }
}

impl<L, D, C> KeyboardBus for DinTransport<L, D, C>
where
    L: DinLines,
    D: DelayNs,
    C: Clock,
{
    fn transmit(&mut self, protocol: Protocol, byte: u8) -> Result<(), DinError> {
        match protocol {
            Protocol::At => self.at_write(byte),
            Protocol::Xt => self.xt_write(byte),
        }
    }

    fn receive(&mut self) -> Result<u8, DinError> {
        self.at_read()
    }

    fn line_state(&mut self) -> LineState {
        self.lines.line_state()
    }

    fn reset_requested(&mut self) -> bool {
        self.xt_reset_requested()
    }

    fn hold_data_low(&mut self, hold: bool) {
        self.lines.set_data(!hold);
    }

    fn pause_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }
}
