//! Connected USB devices and the indicator LEDs they drive.
//!
//! Mount and unmount events arrive from the USB host stack. The registry
//! keeps the last report of every keyboard so key releases can be derived,
//! and the last normalized report of the one supported gamepad.

use heapless::Vec;

use crate::gamepad::{GamepadKind, GamepadReport};
use crate::keyboard::BootKeyboardReport;

/// Keyboards tracked at once.
pub const MAX_KEYBOARDS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegistryError {
    /// No free slot for another device of this kind.
    Full,
    /// Gamepad not on the supported list.
    Unsupported,
}

/// USB device address plus HID interface instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HidHandle {
    pub address: u8,
    pub instance: u8,
}

impl HidHandle {
    #[must_use]
    pub const fn new(address: u8, instance: u8) -> Self {
        Self { address, instance }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyboardSlot {
    pub handle: HidHandle,
    pub previous: BootKeyboardReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GamepadSlot {
    pub handle: HidHandle,
    pub kind: GamepadKind,
    pub previous: GamepadReport,
}

/// Mouse and keyboard presence LEDs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Indicators {
    pub mouse: bool,
    pub keyboard: bool,
}

#[derive(Debug, Default)]
pub struct DeviceRegistry {
    keyboards: Vec<KeyboardSlot, MAX_KEYBOARDS>,
    gamepad: Option<GamepadSlot>,
    mouse_count: u8,
}

impl DeviceRegistry {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            keyboards: Vec::new(),
            gamepad: None,
            mouse_count: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn mouse_count(&self) -> u8 {
        self.mouse_count
    }

    #[must_use]
    pub fn keyboard_count(&self) -> usize {
        self.keyboards.len()
    }

    #[must_use]
    pub fn gamepad(&self) -> Option<&GamepadSlot> {
        self.gamepad.as_ref()
    }

    /// Where host lock LED updates are sent.
    #[must_use]
    pub fn first_keyboard(&self) -> Option<HidHandle> {
        self.keyboards.first().map(|slot| slot.handle)
    }

    /// Something that moves the serial mouse is connected.
    #[must_use]
    pub fn has_pointer(&self) -> bool {
        self.mouse_count > 0 || self.gamepad.is_some()
    }

    #[must_use]
    pub fn indicators(&self) -> Indicators {
        Indicators {
            mouse: self.has_pointer(),
            keyboard: !self.keyboards.is_empty() || self.gamepad.is_some(),
        }
    }

    pub fn mount_mouse(&mut self) {
        self.mouse_count = self.mouse_count.saturating_add(1);
    }

    pub fn unmount_mouse(&mut self) {
        self.mouse_count = self.mouse_count.saturating_sub(1);
    }

    /// Register a keyboard. Returns `true` for the first one connected.
    pub fn mount_keyboard(&mut self, handle: HidHandle) -> Result<bool, RegistryError> {
        if self.keyboards.iter().any(|slot| slot.handle == handle) {
            return Ok(false);
        }
        let first = self.keyboards.is_empty();
        self.keyboards
            .push(KeyboardSlot {
                handle,
                previous: BootKeyboardReport::EMPTY,
            })
            .map_err(|_| RegistryError::Full)?;
        Ok(first)
    }

    /// Drop a keyboard and hand back its last report so held keys can be
    /// released. Remaining slots keep their order.
    pub fn unmount_keyboard(&mut self, handle: HidHandle) -> Option<BootKeyboardReport> {
        let index = self.keyboards.iter().position(|slot| slot.handle == handle)?;
        Some(self.keyboards.remove(index).previous)
    }

    /// Store a new report from a registered keyboard, returning the one it
    /// replaces. Unknown keyboards and rollover errors yield `None` and
    /// leave the stored report alone.
    pub fn swap_keyboard_report(
        &mut self,
        handle: HidHandle,
        report: BootKeyboardReport,
    ) -> Option<BootKeyboardReport> {
        if report.is_rollover_error() {
            return None;
        }
        let slot = self.keyboards.iter_mut().find(|slot| slot.handle == handle)?;
        Some(core::mem::replace(&mut slot.previous, report))
    }

    pub fn mount_gamepad(&mut self, handle: HidHandle, kind: GamepadKind) -> Result<(), RegistryError> {
        if self.gamepad.is_some() {
            return Err(RegistryError::Full);
        }
        self.gamepad = Some(GamepadSlot {
            handle,
            kind,
            previous: GamepadReport::default(),
        });
        Ok(())
    }

    /// Whitelist check on the vendor and product ids, then mount.
    pub fn mount_hid_gamepad(
        &mut self,
        handle: HidHandle,
        vid: u16,
        pid: u16,
    ) -> Result<GamepadKind, RegistryError> {
        let kind = GamepadKind::from_ids(vid, pid).ok_or(RegistryError::Unsupported)?;
        self.mount_gamepad(handle, kind)?;
        Ok(kind)
    }

    pub fn unmount_gamepad(&mut self, handle: HidHandle) -> bool {
        match self.gamepad {
            Some(slot) if slot.handle == handle => {
                self.gamepad = None;
                true
            }
            _ => false,
        }
    }

    /// Keep `report` if it differs enough from the stored one. Returns the
    /// report it replaced.
    pub fn update_gamepad(
        &mut self,
        handle: HidHandle,
        report: GamepadReport,
    ) -> Option<GamepadReport> {
        let slot = self.gamepad.as_mut().filter(|slot| slot.handle == handle)?;
        if !report.differs_from(&slot.previous) {
            return None;
        }
        Some(core::mem::replace(&mut slot.previous, report))
    }

    /// Left stick of the connected gamepad, added to every mouse cycle.
    #[must_use]
    pub fn gamepad_pointer(&self) -> Option<(i8, i8)> {
        self.gamepad.map(|slot| slot.previous.pointer())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GamepadButtons;

    const KB: [HidHandle; 5] = [
        HidHandle::new(1, 0),
        HidHandle::new(2, 0),
        HidHandle::new(3, 0),
        HidHandle::new(4, 0),
        HidHandle::new(5, 0),
    ];

    #[test]
    fn test_mouse_count_never_negative() {
        let mut reg = DeviceRegistry::new();
        reg.unmount_mouse();
        assert_eq!(reg.mouse_count(), 0);
        reg.mount_mouse();
        reg.mount_mouse();
        assert!(reg.indicators().mouse);
        reg.unmount_mouse();
        reg.unmount_mouse();
        reg.unmount_mouse();
        assert_eq!(reg.mouse_count(), 0);
        assert_eq!(reg.indicators(), Indicators::default());
    }

    #[test]
    fn test_fifth_keyboard_rejected() {
        let mut reg = DeviceRegistry::new();
        assert_eq!(reg.mount_keyboard(KB[0]), Ok(true));
        for handle in &KB[1..4] {
            assert_eq!(reg.mount_keyboard(*handle), Ok(false));
        }
        assert_eq!(reg.mount_keyboard(KB[4]), Err(RegistryError::Full));
        assert_eq!(reg.keyboard_count(), MAX_KEYBOARDS);
        assert!(reg.indicators().keyboard);
    }

    #[test]
    fn test_unmount_compacts_and_returns_last_report() {
        let mut reg = DeviceRegistry::new();
        for handle in &KB[..3] {
            reg.mount_keyboard(*handle).unwrap();
        }
        let held = BootKeyboardReport::new(0x02, [0x04, 0, 0, 0, 0, 0]);
        assert_eq!(reg.swap_keyboard_report(KB[0], held), Some(BootKeyboardReport::EMPTY));

        assert_eq!(reg.unmount_keyboard(KB[0]), Some(held));
        assert_eq!(reg.first_keyboard(), Some(KB[1]));
        assert_eq!(reg.keyboard_count(), 2);
        assert_eq!(reg.unmount_keyboard(KB[0]), None);

        // the freed slot is usable again
        assert_eq!(reg.mount_keyboard(KB[4]), Ok(false));
    }

    #[test]
    fn test_keyboard_reports_filtered() {
        let mut reg = DeviceRegistry::new();
        reg.mount_keyboard(KB[0]).unwrap();
        let report = BootKeyboardReport::new(0, [0x05, 0, 0, 0, 0, 0]);
        assert_eq!(reg.swap_keyboard_report(KB[1], report), None);

        let rollover = BootKeyboardReport::new(0, [0x01; 6]);
        assert_eq!(reg.swap_keyboard_report(KB[0], rollover), None);
        assert_eq!(
            reg.swap_keyboard_report(KB[0], report),
            Some(BootKeyboardReport::EMPTY)
        );
    }

    #[test]
    fn test_single_whitelisted_gamepad() {
        let mut reg = DeviceRegistry::new();
        let pad = HidHandle::new(7, 0);
        assert_eq!(
            reg.mount_hid_gamepad(pad, 0x046D, 0xC21D),
            Err(RegistryError::Unsupported)
        );
        assert_eq!(reg.mount_hid_gamepad(pad, 0x054C, 0x05C4), Ok(GamepadKind::DualShock4));
        assert_eq!(
            reg.mount_gamepad(HidHandle::new(8, 0), GamepadKind::XInput),
            Err(RegistryError::Full)
        );
        // a gamepad lights both indicators
        assert_eq!(reg.indicators(), Indicators { mouse: true, keyboard: true });

        assert!(!reg.unmount_gamepad(HidHandle::new(8, 0)));
        assert!(reg.unmount_gamepad(pad));
        assert_eq!(reg.gamepad_pointer(), None);
    }

    #[test]
    fn test_gamepad_jitter_ignored() {
        let mut reg = DeviceRegistry::new();
        let pad = HidHandle::new(7, 0);
        reg.mount_gamepad(pad, GamepadKind::XInput).unwrap();

        let mut moved = GamepadReport::default();
        moved.raw[0] = 40;
        moved.sticks[0] = 40;
        assert!(reg.update_gamepad(pad, moved).is_some());
        assert_eq!(reg.gamepad_pointer(), Some((40, 0)));

        let mut jitter = moved;
        jitter.raw[0] = 42;
        jitter.sticks[0] = 42;
        assert!(reg.update_gamepad(pad, jitter).is_none());
        assert_eq!(reg.gamepad_pointer(), Some((40, 0)));

        let mut pressed = moved;
        pressed.buttons = GamepadButtons::BTN_1;
        assert!(reg.update_gamepad(pad, pressed).is_some());
        assert!(reg.update_gamepad(HidHandle::new(9, 0), GamepadReport::default()).is_none());
    }
}
