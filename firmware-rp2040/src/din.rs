//! DIN keyboard port wiring.

use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_time::{Delay, Instant};
use legacy_core::{Clock, DinTransport, GpioDinLines, KeyboardEngine, KeyboardSettings};

use crate::board::DinPins;

/// [`Clock`] backed by the embassy time driver.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }
}

pub type DinLinesRp = GpioDinLines<Input<'static>, Output<'static>, Input<'static>, Output<'static>>;
pub type DinBus = DinTransport<DinLinesRp, Delay, EmbassyClock>;
pub type DinKeyboard = KeyboardEngine<DinBus>;

/// Set up the four line pins with both lines released.
pub fn keyboard_port(pins: DinPins, settings: KeyboardSettings) -> DinKeyboard {
    let lines = GpioDinLines::new(
        Input::new(pins.clock_in, Pull::Down),
        Output::new(pins.clock_out, Level::Low),
        Input::new(pins.data_in, Pull::Down),
        Output::new(pins.data_out, Level::Low),
    );
    KeyboardEngine::new(DinTransport::new(lines, Delay, EmbassyClock), settings)
}

/// Resolve when a host powers the port. Pends forever while one is
/// already present or keyboard support is off.
pub async fn host_powered(keyboard: Option<&mut DinKeyboard>) {
    match keyboard {
        Some(engine) if !engine.is_present() => {
            engine
                .bus_mut()
                .lines_mut()
                .clock_in_mut()
                .wait_for_rising_edge()
                .await;
        }
        _ => core::future::pending().await,
    }
}
