//! Keyboard side: scan code tables, host command set, lock LEDs and the engine.

pub mod command;
pub mod engine;
pub mod leds;
pub mod report;
pub mod scancodes;

pub use command::{HostCommand, KeyMode};
pub use engine::{DinStatus, KeyboardEngine, LinkEvent, Session, Typematic};
pub use leds::{IdleLedAnimation, LockLeds};
pub use report::BootKeyboardReport;
pub use scancodes::{translate, ScanSequence};
