//! Platform-agnostic core of a USB HID to legacy PC peripheral adapter.
//!
//! USB mice, keyboards and a few game controllers go in; a serial mouse and
//! an AT/PS2 or XT keyboard come out. Everything here is free of hardware
//! dependencies and runs both on the microcontroller and on the host for
//! testing.
//!
//! # Overview
//!
//! - [`mouse`]: per-cycle accumulation and shaping of USB motion ([`MousePipeline`])
//! - [`serial`]: serial mouse wire format, cadence, CTS identification and
//!   the setup terminal ([`SerialMouse`], [`Terminal`])
//! - [`din`]: bit-banged AT/XT transport over four GPIOs ([`DinTransport`])
//! - [`keyboard`]: scan code tables, host command set and session state
//!   ([`KeyboardEngine`])
//! - [`gamepad`]: DualShock 4, PS Classic and XInput report decoding
//! - [`devices`]: connected USB devices and indicator LEDs ([`DeviceRegistry`])
//! - [`coord`]: request/reply protocol between the two cores
//! - [`settings`]: persisted record, wear-levelled flash store, DIP switches
//!
//! # Cores
//!
//! The bus core owns the serial mouse UARTs and keeps the packet cadence.
//! Once per cycle it asks the poll core for a packet; the poll core owns USB,
//! the [`MousePipeline`], the keyboard port and flash. Flash writes and
//! timing changes stop the bus core first through [`coord::PollLink::stop_bus`].
//!
//! # Example
//!
//! ```rust
//! use legacy_core::{BootMouseReport, MousePipeline, MouseSettings, SerialMouseEncoder};
//!
//! let mut pipeline = MousePipeline::new(MouseSettings::DEFAULT);
//! pipeline.record_report(&BootMouseReport { buttons: 0, x: 5, y: -3, wheel: 0 });
//!
//! let pkt = pipeline.finalize_cycle(None);
//! assert!(pkt.update);
//! assert_eq!((pkt.x, pkt.y), (5, -3));
//!
//! let mut encoder = SerialMouseEncoder::new(MouseSettings::DEFAULT.mouse_type);
//! assert_eq!(encoder.encode(&pkt).len(), 3);
//! ```
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: Enable defmt formatting and trace logging (for embedded targets)
//!
//! # No-std Support
//!
//! This crate is `#![no_std]` by default and uses no heap allocations.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

pub mod clock;
pub mod coord;
pub mod devices;
pub mod din;
pub mod gamepad;
pub mod keyboard;
pub mod mouse;
pub mod serial;
pub mod settings;
pub mod types;

// Re-export main types at crate root
pub use clock::Clock;
pub use coord::{BusLink, BusRequest, CoreChannels, CoreMessage, PacketReply, PollLink, SharedStatus};
pub use devices::{DeviceRegistry, HidHandle, Indicators, RegistryError};
pub use din::{DinError, DinLines, DinTransport, GpioDinLines, KeyboardBus, LineState, Protocol};
pub use gamepad::{GamepadKind, GamepadReport, XInputPad};
pub use keyboard::{BootKeyboardReport, DinStatus, KeyboardEngine, LinkEvent, LockLeds};
pub use mouse::{BootMouseReport, MousePacket, MousePipeline};
pub use serial::{
    MousePort, SerialError, SerialMouse, SerialMouseEncoder, SerialState, SerialTiming, Terminal,
    TerminalExit, TerminalIo, TerminalUart,
};
pub use settings::{
    FirmwareVersion, KeyboardSettings, MouseSettings, Settings, SettingsStore, StoreError,
    FIRMWARE_VERSION,
};
pub use types::{
    BaudRate, CodeSetPreference, CosineLevel, GamepadButtons, KeyboardType, MouseButton, MouseType,
    MovementMode, ScanCodeSet,
};
