//! UART adapters for the serial mouse and the setup terminal.

use embassy_rp::gpio::Input;
use embassy_rp::uart::{Async, Config, DataBits, Parity, StopBits, UartRx, UartTx};
use legacy_core::serial::TerminalError;
use legacy_core::{MousePort, MouseSettings, SerialError, TerminalIo};

/// Baud rate of the auxiliary terminal on UART0.
pub const AUX_BAUD: u32 = 115_200;

/// 7 data bits, no parity, one or two stop bits at the configured rate.
pub fn mouse_config(settings: &MouseSettings) -> Config {
    let mut config = Config::default();
    config.baudrate = settings.baud.bps();
    config.data_bits = DataBits::DataBits7;
    config.parity = Parity::ParityNone;
    config.stop_bits = if settings.double_stop_bit {
        StopBits::STOP2
    } else {
        StopBits::STOP1
    };
    config
}

pub fn aux_config() -> Config {
    let mut config = Config::default();
    config.baudrate = AUX_BAUD;
    config
}

/// Mouse side of UART1 plus the CTS input.
pub struct UartMousePort<'d> {
    tx: UartTx<'d, Async>,
    cts: Input<'d>,
}

impl<'d> UartMousePort<'d> {
    pub fn new(tx: UartTx<'d, Async>, cts: Input<'d>) -> Self {
        Self { tx, cts }
    }

    /// The transmitter, lent to a terminal session on the same UART.
    pub fn tx_mut(&mut self) -> &mut UartTx<'d, Async> {
        &mut self.tx
    }

    /// Resolve on the next CTS transition.
    pub async fn cts_changed(&mut self) {
        self.cts.wait_for_any_edge().await;
    }
}

impl MousePort for UartMousePort<'_> {
    async fn write(&mut self, bytes: &[u8]) -> Result<(), SerialError> {
        self.tx.write(bytes).await.map_err(|_| SerialError::Write)
    }

    // The MAX232 inverts the line: the host asserting RTS reads high here.
    fn cts_asserted(&mut self) -> bool {
        self.cts.is_high()
    }
}

/// Byte-at-a-time terminal over a borrowed UART pair.
pub struct UartTerminalIo<'a, 'd> {
    tx: &'a mut UartTx<'d, Async>,
    rx: &'a mut UartRx<'d, Async>,
}

impl<'a, 'd> UartTerminalIo<'a, 'd> {
    pub fn new(tx: &'a mut UartTx<'d, Async>, rx: &'a mut UartRx<'d, Async>) -> Self {
        Self { tx, rx }
    }
}

impl TerminalIo for UartTerminalIo<'_, '_> {
    async fn read_byte(&mut self) -> Result<u8, TerminalError> {
        let mut byte = [0u8; 1];
        self.rx
            .read(&mut byte)
            .await
            .map_err(|_| TerminalError::Io)?;
        Ok(byte[0])
    }

    async fn write_byte(&mut self, byte: u8) -> Result<(), TerminalError> {
        self.tx.write(&[byte]).await.map_err(|_| TerminalError::Io)
    }
}
