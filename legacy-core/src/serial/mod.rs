//! Serial mouse side: wire encoding, cadence, CTS handshake and the setup terminal.

pub mod driver;
pub mod encode;
pub mod negotiate;
pub mod state;
pub mod terminal;
pub mod timing;

pub use driver::{MousePort, SerialError, SerialMouse};
pub use encode::{identity, SerialFrame, SerialMouseEncoder};
pub use negotiate::{CtsAction, CtsTracker, PcState};
pub use state::{SerialState, TerminalUart};
pub use terminal::{Terminal, TerminalError, TerminalExit, TerminalIo};
pub use timing::{
    mouse_terminal_char_delay, next_cycle, usb_poll_throttle, SerialTiming, AUX_TERMINAL_CHAR_DELAY,
};
