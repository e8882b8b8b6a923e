//! Microsoft / Logitech / wheel serial mouse wire format.
//!
//! Every frame starts with a byte that has bit 6 set; the following bytes
//! carry the low six bits of each axis:
//!
//! ```text
//!         D6  D5  D4  D3  D2  D1  D0
//! byte 0   1  LB  RB  Y7  Y6  X7  X6
//! byte 1   0  X5  X4  X3  X2  X1  X0
//! byte 2   0  Y5  Y4  Y3  Y2  Y1  Y0
//! byte 3   0  --  MB  Z3  Z2  Z1  Z0    (wheel)
//! byte 3   0  MB  --  --  --  --  --    (Logitech, only around middle clicks)
//! ```

use core::ops::Deref;

use crate::mouse::MousePacket;
use crate::types::MouseType;

/// Logitech middle button flag in the optional fourth byte.
const LOGITECH_MIDDLE: u8 = 0x20;
/// Wheel mouse middle button flag.
const WHEEL_MIDDLE: u8 = 0x10;

/// Identification sent after the host toggles CTS.
#[must_use]
pub const fn identity(mouse_type: MouseType) -> &'static [u8] {
    match mouse_type {
        MouseType::TwoButton => b"M",
        MouseType::ThreeButton => b"M3",
        MouseType::Wheel => b"MZ@\0\0\0",
    }
}

/// Up to four encoded bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SerialFrame {
    buf: [u8; 4],
    len: usize,
}

impl SerialFrame {
    fn push(&mut self, byte: u8) {
        if self.len < self.buf.len() {
            self.buf[self.len] = byte;
            self.len += 1;
        }
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

impl Deref for SerialFrame {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

/// Packet encoder. Keeps the middle-button state the Logitech extension needs.
#[derive(Clone, Copy, Debug, Default)]
pub struct SerialMouseEncoder {
    mouse_type: MouseType,
    last_middle: bool,
}

impl SerialMouseEncoder {
    #[must_use]
    pub const fn new(mouse_type: MouseType) -> Self {
        Self {
            mouse_type,
            last_middle: false,
        }
    }

    #[inline]
    #[must_use]
    pub const fn mouse_type(&self) -> MouseType {
        self.mouse_type
    }

    /// Switch protocol, forgetting any middle-button state.
    pub fn set_mouse_type(&mut self, mouse_type: MouseType) {
        self.mouse_type = mouse_type;
        self.last_middle = false;
    }

    pub fn encode(&mut self, pkt: &MousePacket) -> SerialFrame {
        let x = axis_byte(pkt.x);
        let y = axis_byte(pkt.y);

        let mut frame = SerialFrame::default();
        frame.push(
            0x40 | (u8::from(pkt.left) << 5)
                | (u8::from(pkt.right) << 4)
                | (((y >> 6) & 0x03) << 2)
                | ((x >> 6) & 0x03),
        );
        frame.push(x & 0x3F);
        frame.push(y & 0x3F);

        match self.mouse_type {
            MouseType::TwoButton => {}
            MouseType::ThreeButton => {
                // The extra byte is only sent while the middle button is
                // down, plus once on release.
                if pkt.middle {
                    frame.push(LOGITECH_MIDDLE);
                } else if self.last_middle {
                    frame.push(0x00);
                }
            }
            MouseType::Wheel => {
                let middle = if pkt.middle { WHEEL_MIDDLE } else { 0 };
                frame.push(middle | wheel_nibble(pkt.wheel));
            }
        }

        self.last_middle = pkt.middle;
        frame
    }
}

#[inline]
fn axis_byte(v: i16) -> u8 {
    v.clamp(-128, 127) as i8 as u8
}

/// Wheel travel as a 4-bit two's complement value, scrolling away from the user positive.
#[inline]
fn wheel_nibble(wheel: i16) -> u8 {
    ((-wheel).clamp(-8, 7) as i8 as u8) & 0x0F
}
