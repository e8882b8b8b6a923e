/// Boot-protocol keyboard input report.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BootKeyboardReport {
    /// Bit `i` is usage `0xE0 + i`.
    pub modifier: u8,
    pub keycodes: [u8; 6],
}

/// Keycode reported in every slot on a rollover error.
const ERROR_ROLLOVER: u8 = 0x01;

impl BootKeyboardReport {
    pub const EMPTY: Self = Self {
        modifier: 0,
        keycodes: [0; 6],
    };

    #[must_use]
    pub const fn new(modifier: u8, keycodes: [u8; 6]) -> Self {
        Self {
            modifier,
            keycodes,
        }
    }

    /// Too many keys down for the keyboard matrix; the report carries no key state.
    #[must_use]
    pub fn is_rollover_error(&self) -> bool {
        self.keycodes.iter().all(|&k| k == ERROR_ROLLOVER)
    }

    #[must_use]
    pub fn contains(&self, usage: u8) -> bool {
        self.keycodes.contains(&usage)
    }

    #[inline]
    #[must_use]
    pub const fn modifier_down(&self, bit: u8) -> bool {
        (self.modifier >> bit) & 1 != 0
    }
}
