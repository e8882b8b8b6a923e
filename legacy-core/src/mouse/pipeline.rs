//! Per-cycle mouse state: button flip-flops, motion buffer and packet finalization.

use crate::mouse::shaping::{self, PACKET_AXIS_LIMIT};
use crate::settings::MouseSettings;
use crate::types::{MouseButton, MouseType, MovementMode};

/// Largest wheel delta carried into a finalized packet.
pub const WHEEL_LIMIT: i16 = 15;

/// USB boot-protocol mouse report, the fields the pipeline consumes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BootMouseReport {
    pub buttons: u8,
    pub x: i8,
    pub y: i8,
    pub wheel: i8,
}

impl BootMouseReport {
    pub const LEFT: u8 = 0x01;
    pub const RIGHT: u8 = 0x02;
    pub const MIDDLE: u8 = 0x04;
    pub const BACK: u8 = 0x08;
    pub const FORWARD: u8 = 0x10;
}

/// One debounced button slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct FlipFlop {
    state: bool,
    pending_toggle: bool,
    updated: bool,
}

impl FlipFlop {
    fn record(&mut self, pressed: bool) {
        if !self.updated {
            if self.state != pressed {
                self.state = pressed;
                self.updated = true;
            }
        } else if pressed && !self.state {
            // a press wins over anything else seen this cycle
            self.state = true;
        } else if !pressed && self.state {
            self.pending_toggle = true;
        }
    }

    fn roll_over(&mut self) {
        self.updated = false;
        if self.pending_toggle {
            self.state = !self.state;
            self.pending_toggle = false;
            self.updated = true;
        }
    }
}

/// Motion and button input buffered since the last finalized packet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RawMouseAccumulator {
    pub x: i16,
    pub y: i16,
    pub wheel: i16,
    /// USB samples folded in this cycle, used by [`MovementMode::Average`].
    pub samples: u16,
    buttons: [FlipFlop; 3],
}

impl RawMouseAccumulator {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            x: 0,
            y: 0,
            wheel: 0,
            samples: 0,
            buttons: [FlipFlop {
                state: false,
                pending_toggle: false,
                updated: false,
            }; 3],
        }
    }

    #[inline]
    #[must_use]
    pub fn button(&self, button: MouseButton) -> bool {
        self.buttons[button as usize].state
    }

    fn any_updated(&self) -> bool {
        self.buttons.iter().any(|b| b.updated)
    }

    fn reset_cycle(&mut self, movement: MovementMode) {
        for slot in &mut self.buttons {
            slot.roll_over();
        }
        // coast keeps its remaining x/y for the next cycle
        if movement != MovementMode::Coast {
            self.x = 0;
            self.y = 0;
        }
        self.wheel = 0;
        self.samples = 0;
    }
}

/// Packet handed to the serial encoder, one per cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MousePacket {
    pub left: bool,
    pub middle: bool,
    pub right: bool,
    pub x: i16,
    pub y: i16,
    pub wheel: i16,
    /// Something changed and the packet should be posted.
    pub update: bool,
}

/// Turns USB mouse and gamepad input into one [`MousePacket`] per serial cycle.
///
/// Lives on the poll core. The bus core drives the cycle boundary by asking
/// for a packet, which calls [`MousePipeline::finalize_cycle`].
#[derive(Clone, Debug)]
pub struct MousePipeline {
    settings: MouseSettings,
    acc: RawMouseAccumulator,
    last: MousePacket,
}

impl MousePipeline {
    #[must_use]
    pub const fn new(settings: MouseSettings) -> Self {
        Self {
            settings,
            acc: RawMouseAccumulator::new(),
            last: MousePacket {
                left: false,
                middle: false,
                right: false,
                x: 0,
                y: 0,
                wheel: 0,
                update: false,
            },
        }
    }

    pub fn set_settings(&mut self, settings: MouseSettings) {
        self.settings = settings;
    }

    #[must_use]
    pub fn settings(&self) -> &MouseSettings {
        &self.settings
    }

    #[must_use]
    pub fn accumulator(&self) -> &RawMouseAccumulator {
        &self.acc
    }

    /// The packet produced by the most recent [`finalize_cycle`](Self::finalize_cycle).
    #[must_use]
    pub fn last_packet(&self) -> MousePacket {
        self.last
    }

    /// Feed one button observation through its flip-flop.
    pub fn record_button(&mut self, button: MouseButton, pressed: bool) {
        self.acc.buttons[button as usize].record(pressed);
    }

    /// Add raw deltas to the running buffer and count the sample.
    pub fn record_motion(&mut self, dx: i16, dy: i16, dwheel: i16) {
        self.acc.x = shaping::accumulate(self.acc.x, dx);
        self.acc.y = shaping::accumulate(self.acc.y, dy);
        self.acc.wheel = shaping::accumulate(self.acc.wheel, dwheel);
        self.acc.samples = self.acc.samples.saturating_add(1);
    }

    /// Fold a boot-protocol report in, honouring the button mapping and axis inversion.
    pub fn record_report(&mut self, report: &BootMouseReport) {
        let s = self.settings;

        let (mut left_mask, mut right_mask) = if s.swap_left_right {
            (BootMouseReport::RIGHT, BootMouseReport::LEFT)
        } else {
            (BootMouseReport::LEFT, BootMouseReport::RIGHT)
        };
        if s.use_side_buttons {
            let (l, r) = if s.swap_side_buttons {
                (BootMouseReport::FORWARD, BootMouseReport::BACK)
            } else {
                (BootMouseReport::BACK, BootMouseReport::FORWARD)
            };
            left_mask |= l;
            right_mask |= r;
        }

        self.record_button(MouseButton::Left, report.buttons & left_mask != 0);
        self.record_button(MouseButton::Right, report.buttons & right_mask != 0);

        let dx = apply_invert(i16::from(report.x), s.invert_x);
        let dy = apply_invert(i16::from(report.y), s.invert_y);

        // Only the wheel mouse buffers the wheel, but both it and the
        // three-button mouse report the middle button.
        let dwheel = if s.mouse_type == MouseType::Wheel {
            i16::from(report.wheel)
        } else {
            0
        };
        self.record_motion(dx, dy, dwheel);

        if s.mouse_type.has_middle() {
            self.record_button(MouseButton::Middle, report.buttons & BootMouseReport::MIDDLE != 0);
        }
    }

    /// Close the cycle and produce its packet.
    ///
    /// `stick` is the connected gamepad's left thumbstick, injected into the
    /// motion buffer before the movement transform.
    pub fn finalize_cycle(&mut self, stick: Option<(i8, i8)>) -> MousePacket {
        let s = self.settings;

        if let Some((sx, sy)) = stick {
            let sx = apply_invert(i16::from(sx), s.invert_x);
            let sy = apply_invert(i16::from(sy), s.invert_y);
            self.acc.x = shaping::accumulate(self.acc.x, sx);
            self.acc.y = shaping::accumulate(self.acc.y, sy);
            self.acc.samples = self.acc.samples.saturating_add(1);
        }

        let mut pkt = MousePacket {
            left: self.acc.button(MouseButton::Left),
            middle: self.acc.button(MouseButton::Middle),
            right: self.acc.button(MouseButton::Right),
            wheel: self.acc.wheel.clamp(-WHEEL_LIMIT, WHEEL_LIMIT),
            ..MousePacket::default()
        };

        let (x, y) = match s.movement {
            MovementMode::Additive => (self.acc.x, self.acc.y),
            MovementMode::Coast => (
                shaping::coast_take(&mut self.acc.x),
                shaping::coast_take(&mut self.acc.y),
            ),
            MovementMode::Average => (
                shaping::average(self.acc.x, self.acc.samples),
                shaping::average(self.acc.y, self.acc.samples),
            ),
        };

        let limit = PACKET_AXIS_LIMIT as u16;
        let x = shaping::travel_limit(shaping::travel_limit(x, s.travel_x, 0), s.travel_xy, limit);
        let y = shaping::travel_limit(shaping::travel_limit(y, s.travel_y, 0), s.travel_xy, limit);

        pkt.x = shaping::cosine_smooth(x, s.cosine);
        pkt.y = shaping::cosine_smooth(y, s.cosine);

        let released = (self.last.left && !pkt.left)
            || (self.last.middle && !pkt.middle)
            || (self.last.right && !pkt.right);
        pkt.update = self.acc.any_updated()
            || released
            || pkt.x != 0
            || pkt.y != 0
            || pkt.wheel != 0;

        self.acc.reset_cycle(s.movement);
        self.last = pkt;
        pkt
    }
}

#[inline]
fn apply_invert(v: i16, invert: bool) -> i16 {
    if invert {
        -v
    } else {
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CosineLevel;

    fn pipeline(f: impl FnOnce(&mut MouseSettings)) -> MousePipeline {
        let mut s = MouseSettings::DEFAULT;
        f(&mut s);
        MousePipeline::new(s)
    }

    fn report(buttons: u8, x: i8, y: i8, wheel: i8) -> BootMouseReport {
        BootMouseReport {
            buttons,
            x,
            y,
            wheel,
        }
    }

    #[test]
    fn test_motion_only_cycle() {
        let mut p = pipeline(|_| {});
        p.record_report(&report(0, 5, -3, 0));
        let pkt = p.finalize_cycle(None);
        assert_eq!(
            pkt,
            MousePacket {
                left: false,
                middle: false,
                right: false,
                x: 5,
                y: -3,
                wheel: 0,
                update: true,
            }
        );
        assert_eq!(p.last_packet(), pkt);
    }

    #[test]
    fn test_second_finalize_without_input_is_quiet() {
        let mut p = pipeline(|_| {});
        p.record_report(&report(0, 20, 20, 0));
        assert!(p.finalize_cycle(None).update);
        let pkt = p.finalize_cycle(None);
        assert!(!pkt.update);
        assert_eq!((pkt.x, pkt.y, pkt.wheel), (0, 0, 0));
    }

    #[test]
    fn test_click_and_release_in_one_cycle_is_not_lost() {
        let mut p = pipeline(|_| {});
        p.record_report(&report(BootMouseReport::LEFT, 0, 0, 0));
        p.record_report(&report(0, 0, 0, 0));

        let first = p.finalize_cycle(None);
        assert!(first.left);
        assert!(first.update);

        let second = p.finalize_cycle(None);
        assert!(!second.left);
        assert!(second.update);

        let third = p.finalize_cycle(None);
        assert!(!third.update);
    }

    #[test]
    fn test_press_overrides_release_within_cycle() {
        let mut p = pipeline(|_| {});
        p.record_button(MouseButton::Right, true);
        let pkt = p.finalize_cycle(None);
        assert!(pkt.right);

        // release is taken first, then a press arrives in the same cycle
        p.record_button(MouseButton::Right, false);
        p.record_button(MouseButton::Right, true);
        let pkt = p.finalize_cycle(None);
        assert!(pkt.right);
        assert!(pkt.update);
    }

    #[test]
    fn test_swapped_and_side_buttons() {
        let mut p = pipeline(|s| {
            s.swap_left_right = true;
            s.use_side_buttons = true;
        });
        p.record_report(&report(BootMouseReport::LEFT, 0, 0, 0));
        let pkt = p.finalize_cycle(None);
        assert!(pkt.right);
        assert!(!pkt.left);

        p.record_report(&report(BootMouseReport::BACK, 0, 0, 0));
        let pkt = p.finalize_cycle(None);
        assert!(pkt.left);
        assert!(!pkt.right);
    }

    #[test]
    fn test_middle_only_for_three_button_and_wheel() {
        let mut two = pipeline(|_| {});
        two.record_report(&report(BootMouseReport::MIDDLE, 0, 0, 3));
        let pkt = two.finalize_cycle(None);
        assert!(!pkt.middle);
        assert_eq!(pkt.wheel, 0);

        let mut wheel = pipeline(|s| s.mouse_type = MouseType::Wheel);
        wheel.record_report(&report(BootMouseReport::MIDDLE, 0, 0, 3));
        let pkt = wheel.finalize_cycle(None);
        assert!(pkt.middle);
        assert_eq!(pkt.wheel, 3);

        let mut three = pipeline(|s| s.mouse_type = MouseType::ThreeButton);
        three.record_report(&report(BootMouseReport::MIDDLE, 0, 0, 3));
        let pkt = three.finalize_cycle(None);
        assert!(pkt.middle);
        assert_eq!(pkt.wheel, 0);
    }

    #[test]
    fn test_wheel_is_clamped() {
        let mut p = pipeline(|s| s.mouse_type = MouseType::Wheel);
        p.record_report(&report(0, 0, 0, 12));
        p.record_report(&report(0, 0, 0, 12));
        assert_eq!(p.finalize_cycle(None).wheel, WHEEL_LIMIT);
    }

    #[test]
    fn test_inverted_axes() {
        let mut p = pipeline(|s| {
            s.invert_x = true;
            s.invert_y = true;
        });
        p.record_report(&report(0, 4, -9, 0));
        let pkt = p.finalize_cycle(None);
        assert_eq!((pkt.x, pkt.y), (-4, 9));
    }

    #[test]
    fn test_additive_clamps_to_packet_range() {
        let mut p = pipeline(|_| {});
        for _ in 0..4 {
            p.record_report(&report(0, 100, -100, 0));
        }
        let pkt = p.finalize_cycle(None);
        assert_eq!((pkt.x, pkt.y), (127, -127));
        // the excess is dropped
        assert_eq!(p.finalize_cycle(None).x, 0);
    }

    #[test]
    fn test_average_of_constant_samples() {
        for n in 1..=9 {
            let mut p = pipeline(|s| s.movement = MovementMode::Average);
            for _ in 0..n {
                p.record_report(&report(0, 7, -2, 0));
            }
            let pkt = p.finalize_cycle(None);
            assert_eq!((pkt.x, pkt.y), (7, -2));
        }

        let mut idle = pipeline(|s| s.movement = MovementMode::Average);
        let pkt = idle.finalize_cycle(None);
        assert_eq!((pkt.x, pkt.y), (0, 0));
    }

    #[test]
    fn test_coast_emits_whole_burst() {
        let mut p = pipeline(|s| s.movement = MovementMode::Coast);
        for _ in 0..4 {
            p.record_motion(100, -25, 0);
        }
        let mut total_x = 0;
        let mut total_y = 0;
        let mut cycles = 0;
        loop {
            let pkt = p.finalize_cycle(None);
            if !pkt.update {
                break;
            }
            assert!(pkt.x.abs() <= 127);
            total_x += pkt.x;
            total_y += pkt.y;
            cycles += 1;
        }
        assert_eq!(total_x, 400);
        assert_eq!(total_y, -100);
        assert_eq!(cycles, 4);
    }

    #[test]
    fn test_travel_percentages() {
        let mut p = pipeline(|s| {
            s.travel_x = 50;
            s.travel_y = 200;
            s.travel_xy = 50;
        });
        p.record_motion(40, 10, 0);
        let pkt = p.finalize_cycle(None);
        assert_eq!((pkt.x, pkt.y), (10, 10));
    }

    #[test]
    fn test_cosine_applied_after_travel() {
        let mut p = pipeline(|s| s.cosine = CosineLevel::new(4).unwrap());
        p.record_motion(120, 1, 0);
        let pkt = p.finalize_cycle(None);
        assert!(pkt.x < 120);
        assert_eq!(pkt.y, 1);
    }

    #[test]
    fn test_gamepad_stick_is_injected_and_inverted() {
        let mut p = pipeline(|s| s.invert_y = true);
        let pkt = p.finalize_cycle(Some((30, 40)));
        assert_eq!((pkt.x, pkt.y), (30, -40));
        assert!(pkt.update);

        let pkt = p.finalize_cycle(Some((0, 0)));
        assert!(!pkt.update);
    }

    #[test]
    fn test_settings_change_takes_effect() {
        let mut p = pipeline(|_| {});
        p.set_settings(MouseSettings {
            invert_x: true,
            ..MouseSettings::DEFAULT
        });
        assert!(p.settings().invert_x);
        p.record_report(&report(0, 1, 0, 0));
        assert_eq!(p.finalize_cycle(None).x, -1);
    }
}
