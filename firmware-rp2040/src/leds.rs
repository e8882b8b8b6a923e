//! Status LEDs.

use embassy_rp::gpio::{Level, Output};
use embassy_rp::peripherals::{PIN_2, PIN_3, PIN_4};
use embassy_rp::Peri;
use embassy_time::{Duration, Timer};
use legacy_core::Indicators;

/// Half period of the terminal and factory reset blink.
pub const BLINK: Duration = Duration::from_millis(800);

/// Power LED, owned by the bus core.
pub struct PowerLed {
    pin: Output<'static>,
}

impl PowerLed {
    /// Takes the pin and lights it.
    pub fn new(pin: Peri<'static, PIN_2>) -> Self {
        Self {
            pin: Output::new(pin, Level::High),
        }
    }

    #[inline]
    pub fn on(&mut self) {
        self.pin.set_high();
    }

    /// Blink until the future is dropped.
    pub async fn blink(&mut self) -> ! {
        loop {
            self.pin.toggle();
            Timer::after(BLINK).await;
        }
    }
}

/// Mouse and keyboard presence LEDs, owned by the poll core.
pub struct IndicatorLeds {
    mouse: Output<'static>,
    keyboard: Output<'static>,
}

impl IndicatorLeds {
    pub fn new(mouse: Peri<'static, PIN_3>, keyboard: Peri<'static, PIN_4>) -> Self {
        Self {
            mouse: Output::new(mouse, Level::Low),
            keyboard: Output::new(keyboard, Level::Low),
        }
    }

    pub fn show(&mut self, indicators: Indicators) {
        self.mouse.set_level(Level::from(indicators.mouse));
        self.keyboard.set_level(Level::from(indicators.keyboard));
    }
}
