//! USB HID to serial mouse and AT/XT keyboard adapter for RP2040.
//!
//! # Overview
//!
//! The firmware runs on a Raspberry Pi Pico (RP2040) behind a MAX232 and:
//! 1. Takes USB mice, keyboards and supported gamepads from the USB host stack
//! 2. Emulates a Microsoft-compatible serial mouse on UART1 (7N1/7N2, 1200 to 19200 baud)
//! 3. Emulates an AT, PS/2 or XT keyboard on the DIN port
//! 4. Offers a setup terminal on either UART, with settings kept in flash
//!
//! # Hardware Configuration
//!
//! See [`board`] for the full pin map.
//!
//! | Function   | GPIO     | Description                         |
//! |------------|----------|-------------------------------------|
//! | UART1 TX   | 8        | Serial mouse transmit               |
//! | UART1 RX   | 9        | Terminal input                      |
//! | CTS        | 6        | Host RTS, triggers identification   |
//! | DIN        | 18 .. 21 | Keyboard clock and data, in and out |
//! | DIP        | 10 .. 15 | Mouse type, speed, format, baud     |
//!
//! # Architecture
//!
//! Two cores, one executor each:
//!
//! - **Bus core** (core 1, [`bus`]): serial mouse cadence, CTS handshake and the terminal
//! - **Poll core** (core 0, [`poll`]): USB input, mouse pipeline, DIN keyboard, flash
//! - **DIP task** (core 0, [`dip`]): debounces the switch bank and reports changes
//!
//! The cores talk through [`CoreChannels`]: the bus core asks for one
//! [`MousePacket`] per serial cycle, and the poll core halts it around
//! flash writes.
//!
//! # Features
//!
//! - **`dev-panic`** (default): Use `panic-probe` for development (prints panic info via RTT)
//! - **`prod-panic`**: Use `panic-reset` for production (silent watchdog reset)
//! - **`keyboard`** (default): DIN keyboard emulation
//! - **`always-post`**: Post a packet every cycle, even with no mouse attached
//! - **`legacy-dip-snapshot`**: Store the three-button and wheel switch snapshot swapped
//!
//! # Re-exports
//!
//! This crate re-exports the public items of [`legacy_core`] that the
//! firmware wires together.

#![no_std]

pub use legacy_core::{
    BootKeyboardReport, BootMouseReport, BusLink, CoreChannels, DeviceRegistry, HidHandle,
    KeyboardEngine, MousePacket, MousePipeline, PollLink, SerialMouse, SerialState, Settings,
    SettingsStore, SharedStatus, FIRMWARE_VERSION,
};

pub mod board;
pub mod bus;
pub mod din;
pub mod dip;
pub mod flash;
pub mod leds;
pub mod poll;
pub mod serial_port;
pub mod usb_host;

pub use bus::BusCore;
pub use poll::{PollChannels, PollCore};
