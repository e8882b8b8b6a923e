//! Pin assignment.
//!
//! | Function            | GPIO      | Notes                                   |
//! |---------------------|-----------|-----------------------------------------|
//! | UART0 TX / RX       | 0 / 1     | Auxiliary terminal header, 115200 8N1   |
//! | Power LED           | 2         | Blinks while a terminal is open         |
//! | Mouse LED           | 3         |                                         |
//! | Keyboard LED        | 4         |                                         |
//! | CTS                 | 6         | Inverted by the MAX232                  |
//! | UART1 TX / RX       | 8 / 9     | Serial mouse through the MAX232         |
//! | DIP switches 1-6    | 10 .. 15  | Pulled up, closed selects the option    |
//! | Reset button        | 17        | Held at power-up restores defaults      |
//! | DIN data out        | 18        | Drives an NPN, high pulls the line low  |
//! | DIN clock in        | 19        |                                         |
//! | DIN data in         | 20        |                                         |
//! | DIN clock out       | 21        | Drives an NPN, high pulls the line low  |
//! | On-board LED        | 25        | Heartbeat and factory reset feedback    |

use embassy_rp::peripherals::{
    CORE1, DMA_CH0, DMA_CH1, DMA_CH2, DMA_CH3, FLASH, PIN_0, PIN_1, PIN_10, PIN_11, PIN_12,
    PIN_13, PIN_14, PIN_15, PIN_17, PIN_18, PIN_19, PIN_2, PIN_20, PIN_21, PIN_25, PIN_3, PIN_4,
    PIN_6, PIN_8, PIN_9, UART0, UART1,
};
use embassy_rp::{bind_interrupts, Peri, Peripherals};

bind_interrupts!(pub struct Irqs {
    UART0_IRQ => embassy_rp::uart::InterruptHandler<UART0>;
    UART1_IRQ => embassy_rp::uart::InterruptHandler<UART1>;
});

pub struct LedPins {
    pub power: Peri<'static, PIN_2>,
    pub mouse: Peri<'static, PIN_3>,
    pub keyboard: Peri<'static, PIN_4>,
    pub onboard: Peri<'static, PIN_25>,
}

/// In switch order, 1 to 6.
pub struct DipPins {
    pub three_button: Peri<'static, PIN_10>,
    pub wheel: Peri<'static, PIN_11>,
    pub speed_75: Peri<'static, PIN_12>,
    pub speed_50: Peri<'static, PIN_13>,
    pub two_stop_bits: Peri<'static, PIN_14>,
    pub baud_19200: Peri<'static, PIN_15>,
}

pub struct MouseUartPins {
    pub uart: Peri<'static, UART1>,
    pub tx: Peri<'static, PIN_8>,
    pub rx: Peri<'static, PIN_9>,
    pub cts: Peri<'static, PIN_6>,
    pub tx_dma: Peri<'static, DMA_CH0>,
    pub rx_dma: Peri<'static, DMA_CH1>,
}

pub struct AuxUartPins {
    pub uart: Peri<'static, UART0>,
    pub tx: Peri<'static, PIN_0>,
    pub rx: Peri<'static, PIN_1>,
    pub tx_dma: Peri<'static, DMA_CH2>,
    pub rx_dma: Peri<'static, DMA_CH3>,
}

pub struct DinPins {
    pub clock_in: Peri<'static, PIN_19>,
    pub clock_out: Peri<'static, PIN_21>,
    pub data_in: Peri<'static, PIN_20>,
    pub data_out: Peri<'static, PIN_18>,
}

/// The peripherals the adapter uses, grouped by function.
pub struct Board {
    pub core1: Peri<'static, CORE1>,
    pub flash: Peri<'static, FLASH>,
    pub reset_button: Peri<'static, PIN_17>,
    pub leds: LedPins,
    pub dip: DipPins,
    pub mouse_uart: MouseUartPins,
    pub aux_uart: AuxUartPins,
    pub din: DinPins,
}

impl Board {
    #[must_use]
    pub fn new(p: Peripherals) -> Self {
        Self {
            core1: p.CORE1,
            flash: p.FLASH,
            reset_button: p.PIN_17,
            leds: LedPins {
                power: p.PIN_2,
                mouse: p.PIN_3,
                keyboard: p.PIN_4,
                onboard: p.PIN_25,
            },
            dip: DipPins {
                three_button: p.PIN_10,
                wheel: p.PIN_11,
                speed_75: p.PIN_12,
                speed_50: p.PIN_13,
                two_stop_bits: p.PIN_14,
                baud_19200: p.PIN_15,
            },
            mouse_uart: MouseUartPins {
                uart: p.UART1,
                tx: p.PIN_8,
                rx: p.PIN_9,
                cts: p.PIN_6,
                tx_dma: p.DMA_CH0,
                rx_dma: p.DMA_CH1,
            },
            aux_uart: AuxUartPins {
                uart: p.UART0,
                tx: p.PIN_0,
                rx: p.PIN_1,
                tx_dma: p.DMA_CH2,
                rx_dma: p.DMA_CH3,
            },
            din: DinPins {
                clock_in: p.PIN_19,
                clock_out: p.PIN_21,
                data_in: p.PIN_20,
                data_out: p.PIN_18,
            },
        }
    }
}
