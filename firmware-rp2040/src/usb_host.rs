//! Boundary to the USB host stack.
//!
//! The host driver publishes mount, unmount and report events on
//! [`HidEventChannel`] and drains keyboard LED requests from
//! [`HidCommandChannel`]. Mouse and keyboard reports arrive in the
//! boot-protocol layouts from `usbd-hid`.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use legacy_core::gamepad::XInputPad;
use legacy_core::{BootKeyboardReport, BootMouseReport, HidHandle};
use usbd_hid::descriptor::{KeyboardReport, MouseReport};

pub const HID_EVENT_DEPTH: usize = 16;
pub const HID_COMMAND_DEPTH: usize = 4;
/// Largest gamepad input report forwarded.
pub const GAMEPAD_REPORT_LEN: usize = 64;

pub enum HidEvent {
    MouseMounted(HidHandle),
    MouseUnmounted(HidHandle),
    MouseReport(HidHandle, MouseReport),
    KeyboardMounted(HidHandle),
    KeyboardUnmounted(HidHandle),
    KeyboardReport(HidHandle, KeyboardReport),
    /// Generic HID device that is neither a boot mouse nor a boot keyboard.
    GamepadMounted { handle: HidHandle, vid: u16, pid: u16 },
    XInputMounted(HidHandle),
    GamepadUnmounted(HidHandle),
    GamepadReport(HidHandle, heapless::Vec<u8, GAMEPAD_REPORT_LEN>),
    XInputReport(HidHandle, XInputPad),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, defmt::Format)]
pub enum HidCommand {
    /// Output report for a keyboard, in USB LED bit order.
    SetKeyboardLeds { handle: HidHandle, leds: u8 },
}

pub type HidEventChannel = Channel<CriticalSectionRawMutex, HidEvent, HID_EVENT_DEPTH>;
pub type HidCommandChannel = Channel<CriticalSectionRawMutex, HidCommand, HID_COMMAND_DEPTH>;

#[must_use]
pub fn boot_mouse_report(report: &MouseReport) -> BootMouseReport {
    BootMouseReport {
        buttons: report.buttons,
        x: report.x,
        y: report.y,
        wheel: report.wheel,
    }
}

#[must_use]
pub fn boot_keyboard_report(report: &KeyboardReport) -> BootKeyboardReport {
    BootKeyboardReport::new(report.modifier, report.keycodes)
}
