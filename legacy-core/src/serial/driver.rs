//! Serial mouse output over an abstract UART with a CTS input.

use core::future::Future;

use embassy_time::Duration;
use embedded_hal_async::delay::DelayNs;

use crate::mouse::MousePacket;
use crate::serial::encode::{identity, SerialMouseEncoder};
use crate::serial::negotiate::{CtsAction, CtsTracker, PcState};
use crate::serial::timing::SerialTiming;
use crate::settings::MouseSettings;

/// Serial port errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SerialError {
    /// The UART rejected a write.
    Write,
    /// Nothing arrived in time.
    Timeout,
    /// Framing, parity or overrun on receive.
    Read,
}

/// The UART and CTS line a serial mouse is attached to.
pub trait MousePort {
    /// Write every byte, returning once the UART has accepted them.
    fn write(&mut self, bytes: &[u8]) -> impl Future<Output = Result<(), SerialError>>;

    /// Whether the host is currently asserting CTS (RTS low on its side).
    fn cts_asserted(&mut self) -> bool;
}

/// Drives one serial mouse: packet posting and the identity handshake.
pub struct SerialMouse<P, D> {
    port: P,
    delay: D,
    settings: MouseSettings,
    encoder: SerialMouseEncoder,
    cts: CtsTracker,
    timing: SerialTiming,
}

impl<P: MousePort, D: DelayNs> SerialMouse<P, D> {
    pub fn new(port: P, delay: D, settings: MouseSettings) -> Self {
        Self {
            port,
            delay,
            settings,
            encoder: SerialMouseEncoder::new(settings.mouse_type),
            cts: CtsTracker::new(),
            timing: SerialTiming::for_settings(&settings),
        }
    }

    /// Apply new settings. A different mouse type forces a fresh handshake.
    pub fn reconfigure(&mut self, settings: MouseSettings) {
        if settings.mouse_type != self.settings.mouse_type {
            self.encoder.set_mouse_type(settings.mouse_type);
            self.cts.reset();
        }
        self.timing = SerialTiming::for_settings(&settings);
        self.settings = settings;
    }

    #[must_use]
    pub fn settings(&self) -> &MouseSettings {
        &self.settings
    }

    #[must_use]
    pub fn timing(&self) -> &SerialTiming {
        &self.timing
    }

    /// Time between packet requests.
    #[must_use]
    pub fn cycle(&self) -> Duration {
        self.timing.cycle(&self.settings)
    }

    #[must_use]
    pub fn pc_state(&self) -> PcState {
        self.cts.state()
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    /// Encode and send one packet.
    pub async fn post(&mut self, pkt: &MousePacket) -> Result<(), SerialError> {
        let frame = self.encoder.encode(pkt);
        self.port.write(&frame).await
    }

    /// Sample CTS and identify if the host asked for it. Returns `true` when
    /// the identity was sent.
    pub async fn service_cts(&mut self) -> Result<bool, SerialError> {
        let asserted = self.port.cts_asserted();
        match self.cts.sample(asserted, self.settings.mouse_type, &self.timing) {
            CtsAction::Idle => Ok(false),
            CtsAction::Recheck(wait) => {
                if wait.as_micros() > 0 {
                    self.delay
                        .delay_us(u32::try_from(wait.as_micros()).unwrap_or(u32::MAX))
                        .await;
                }
                let asserted = self.port.cts_asserted();
                self.cts.confirm(asserted);
                Ok(false)
            }
            CtsAction::Negotiate => {
                self.port.write(identity(self.settings.mouse_type)).await?;
                Ok(true)
            }
        }
    }
}
