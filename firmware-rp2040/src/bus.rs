//! Bus core: the serial mouse cadence, CTS identification and the setup
//! terminal. Runs alone on core 1.
//!
//! Each session builds both UARTs for the current settings and runs until
//! the poll core stops it; the settings it is resumed with start the next
//! session. A CR or LF on either UART opens the terminal.

use defmt::{info, warn};
use embassy_futures::select::{select, select3, select4, Either, Either3, Either4};
use embassy_rp::gpio::{Input, Pull};
use embassy_rp::uart::Uart;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Delay, Duration, Instant, Timer};
use legacy_core::serial::{
    mouse_terminal_char_delay, next_cycle, TerminalError, AUX_TERMINAL_CHAR_DELAY,
};
use legacy_core::{
    BusLink, MousePacket, PacketReply, SerialMouse, SerialState, Settings, SharedStatus, Terminal,
    TerminalExit, TerminalIo, TerminalUart,
};

use crate::board::{AuxUartPins, Irqs, MouseUartPins};
use crate::leds::PowerLed;
use crate::serial_port::{aux_config, mouse_config, UartMousePort, UartTerminalIo};

const ALWAYS_POST: bool = cfg!(feature = "always-post");

enum Wake {
    Cycle,
    Line(TerminalUart, u8),
    Cts,
    Stop,
}

enum TerminalOutcome {
    Closed(Result<TerminalExit, TerminalError>),
    Stopped,
}

pub struct BusCore {
    mouse: MouseUartPins,
    aux: AuxUartPins,
    power: PowerLed,
    link: BusLink<'static, CriticalSectionRawMutex>,
    status: &'static SharedStatus,
}

impl BusCore {
    pub fn new(
        mouse: MouseUartPins,
        aux: AuxUartPins,
        power: PowerLed,
        link: BusLink<'static, CriticalSectionRawMutex>,
        status: &'static SharedStatus,
    ) -> Self {
        Self {
            mouse,
            aux,
            power,
            link,
            status,
        }
    }

    pub async fn run(mut self, mut settings: Settings) -> ! {
        let mut saved_on = None;
        loop {
            (settings, saved_on) = self.session(settings, saved_on).await;
        }
    }

    /// One UART configuration. Returns the settings to resume with and,
    /// after a terminal save, the UART to confirm the save on.
    async fn session(
        &mut self,
        settings: Settings,
        announce: Option<TerminalUart>,
    ) -> (Settings, Option<TerminalUart>) {
        let Self {
            mouse: pins,
            aux,
            power,
            link,
            status,
        } = self;

        let uart = Uart::new(
            pins.uart.reborrow(),
            pins.tx.reborrow(),
            pins.rx.reborrow(),
            Irqs,
            pins.tx_dma.reborrow(),
            pins.rx_dma.reborrow(),
            mouse_config(&settings.mouse),
        );
        let (tx, mut rx) = uart.split();
        let cts = Input::new(pins.cts.reborrow(), Pull::None);
        let mut mouse = SerialMouse::new(UartMousePort::new(tx, cts), Delay, settings.mouse);

        let aux_uart = Uart::new(
            aux.uart.reborrow(),
            aux.tx.reborrow(),
            aux.rx.reborrow(),
            Irqs,
            aux.tx_dma.reborrow(),
            aux.rx_dma.reborrow(),
            aux_config(),
        );
        let (mut aux_tx, mut aux_rx) = aux_uart.split();

        power.on();
        let confirmed = match announce {
            Some(TerminalUart::Uart1) => {
                let io = UartTerminalIo::new(mouse.port_mut().tx_mut(), &mut rx);
                Terminal::new(io, Delay, mouse_terminal_char_delay(settings.mouse.baud))
                    .announce_saved()
                    .await
            }
            Some(TerminalUart::Uart0) => {
                let io = UartTerminalIo::new(&mut aux_tx, &mut aux_rx);
                Terminal::new(io, Delay, AUX_TERMINAL_CHAR_DELAY)
                    .announce_saved()
                    .await
            }
            None => Ok(()),
        };
        if let Err(e) = confirmed {
            warn!("save confirmation failed: {}", e);
        }

        status.set_serial_state(SerialState::Mouse);
        let cycle = mouse.cycle();
        info!(
            "serial mouse {} at {} baud, cycle {} us",
            settings.mouse.mouse_type,
            settings.mouse.baud.bps(),
            cycle.as_micros()
        );

        let mut next = Instant::now() + cycle;
        loop {
            match mouse.service_cts().await {
                Ok(true) => info!("identified as {}", settings.mouse.mouse_type),
                Ok(false) => {}
                Err(e) => warn!("identity write failed: {}", e),
            }

            let mut mouse_byte = [0u8; 1];
            let mut aux_byte = [0u8; 1];
            let woke = select4(
                Timer::at(next),
                select(rx.read(&mut mouse_byte), aux_rx.read(&mut aux_byte)),
                mouse.port_mut().cts_changed(),
                link.stop_requested(),
            )
            .await;
            let wake = match woke {
                Either4::First(()) => Wake::Cycle,
                Either4::Second(Either::First(Ok(()))) => Wake::Line(TerminalUart::Uart1, mouse_byte[0]),
                Either4::Second(Either::Second(Ok(()))) => Wake::Line(TerminalUart::Uart0, aux_byte[0]),
                // line noise while the host switches the port around
                Either4::Second(_) => continue,
                Either4::Third(()) => Wake::Cts,
                Either4::Fourth(()) => Wake::Stop,
            };

            match wake {
                Wake::Cycle => {
                    next = next_cycle(next, cycle, Instant::now());
                    if !ALWAYS_POST && status.mouse_count() == 0 {
                        continue;
                    }
                    let pkt = match link.request_packet().await {
                        PacketReply::Update(pkt) => pkt,
                        PacketReply::NoUpdate if ALWAYS_POST => MousePacket::default(),
                        PacketReply::NoUpdate => continue,
                        PacketReply::Resumed(settings) => return (settings, None),
                    };
                    if let Err(e) = mouse.post(&pkt).await {
                        warn!("packet write failed: {}", e);
                    }
                }
                Wake::Line(uart, byte) if byte == b'\r' || byte == b'\n' => {
                    status.set_serial_state(SerialState::Terminal(uart));
                    info!("terminal opened on {}", uart);
                    let outcome = match uart {
                        TerminalUart::Uart1 => {
                            let io = UartTerminalIo::new(mouse.port_mut().tx_mut(), &mut rx);
                            let delay = mouse_terminal_char_delay(settings.mouse.baud);
                            run_terminal(io, delay, &settings, power, link).await
                        }
                        TerminalUart::Uart0 => {
                            let io = UartTerminalIo::new(&mut aux_tx, &mut aux_rx);
                            run_terminal(io, AUX_TERMINAL_CHAR_DELAY, &settings, power, link).await
                        }
                    };
                    power.on();
                    match outcome {
                        TerminalOutcome::Closed(Ok(TerminalExit::Save(edited))) => {
                            info!("terminal closed, saving");
                            status.set_serial_state(SerialState::Paused);
                            return (link.request_save(edited).await, Some(uart));
                        }
                        TerminalOutcome::Closed(Ok(TerminalExit::Discard)) => {
                            info!("terminal closed");
                        }
                        TerminalOutcome::Closed(Err(e)) => warn!("terminal aborted: {}", e),
                        TerminalOutcome::Stopped => return (link.acknowledge_stop().await, None),
                    }
                    status.set_serial_state(SerialState::Mouse);
                    next = Instant::now() + cycle;
                }
                Wake::Line(..) => {}
                // sampled at the top of the loop
                Wake::Cts => {}
                Wake::Stop => return (link.acknowledge_stop().await, None),
            }
        }
    }
}

/// Run a terminal session with the power LED blinking. A stop from the poll
/// core abandons the session.
async fn run_terminal<IO: TerminalIo>(
    io: IO,
    char_delay: Duration,
    settings: &Settings,
    power: &mut PowerLed,
    link: &BusLink<'static, CriticalSectionRawMutex>,
) -> TerminalOutcome {
    let mut terminal = Terminal::new(io, Delay, char_delay);
    match select3(terminal.run(settings), power.blink(), link.stop_requested()).await {
        Either3::First(exit) => TerminalOutcome::Closed(exit),
        Either3::Second(never) => match never {},
        Either3::Third(()) => TerminalOutcome::Stopped,
    }
}
