//! What the serial side of the adapter is currently doing.

/// Which UART a terminal session was opened on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TerminalUart {
    /// UART0, the auxiliary header.
    Uart0,
    /// UART1, shared with the mouse.
    Uart1,
}

/// Serial port mode, stored as a byte so the poll core can read it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SerialState {
    #[default]
    Mouse,
    Terminal(TerminalUart),
    /// Settings are being changed; nothing is sent.
    Paused,
}

impl SerialState {
    #[must_use]
    pub const fn to_u8(self) -> u8 {
        match self {
            Self::Mouse => 0,
            Self::Terminal(TerminalUart::Uart0) => 1,
            Self::Terminal(TerminalUart::Uart1) => 2,
            Self::Paused => 3,
        }
    }

    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Mouse),
            1 => Some(Self::Terminal(TerminalUart::Uart0)),
            2 => Some(Self::Terminal(TerminalUart::Uart1)),
            3 => Some(Self::Paused),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_mouse(self) -> bool {
        matches!(self, Self::Mouse)
    }

    #[inline]
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Terminal(_))
    }

    /// A line terminator arrived on `uart`. Only a mouse-mode port opens a terminal.
    #[must_use]
    pub const fn enter_terminal(self, uart: TerminalUart) -> Self {
        match self {
            Self::Mouse => Self::Terminal(uart),
            other => other,
        }
    }

    /// Leave the terminal. A save pauses the port until the bus core restarts.
    #[must_use]
    pub const fn exit_terminal(self, save: bool) -> Self {
        match self {
            Self::Terminal(_) if save => Self::Paused,
            Self::Terminal(_) => Self::Mouse,
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_encoding() {
        for state in [
            SerialState::Mouse,
            SerialState::Terminal(TerminalUart::Uart0),
            SerialState::Terminal(TerminalUart::Uart1),
            SerialState::Paused,
        ] {
            assert_eq!(SerialState::from_u8(state.to_u8()), Some(state));
        }
        assert_eq!(SerialState::Terminal(TerminalUart::Uart1).to_u8(), 2);
        assert_eq!(SerialState::from_u8(4), None);
    }

    #[test]
    fn test_terminal_transitions() {
        let s = SerialState::Mouse.enter_terminal(TerminalUart::Uart0);
        assert!(s.is_terminal());
        // a second terminator on the other port does not switch sessions
        assert_eq!(s.enter_terminal(TerminalUart::Uart1), s);
        assert_eq!(s.exit_terminal(false), SerialState::Mouse);
        assert_eq!(s.exit_terminal(true), SerialState::Paused);
        assert_eq!(SerialState::Paused.enter_terminal(TerminalUart::Uart0), SerialState::Paused);
    }
}
