#![no_std]
#![no_main]

use cortex_m::peripheral::SCB;
use defmt::{error, info, warn};
use defmt_rtt as _;
use embassy_executor::{Executor, Spawner};
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::multicore::{spawn_core1, Stack};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Sender};
use embassy_time::{Duration, Instant, Timer};
use legacy_core::settings::dip::reconcile_boot;
use legacy_core::settings::LoadOutcome;
use static_cell::StaticCell;
use usb2legacy_rp2040::board::Board;
use usb2legacy_rp2040::din::keyboard_port;
use usb2legacy_rp2040::dip::{DipChange, DipChannel, DipSwitchBank, DIP_CHANGE_DEPTH, SETTLE};
use usb2legacy_rp2040::flash::{settings_store, SettingsPartition};
use usb2legacy_rp2040::leds::{IndicatorLeds, PowerLed, BLINK};
use usb2legacy_rp2040::usb_host::{HidCommandChannel, HidEventChannel};
use usb2legacy_rp2040::{
    BusCore, CoreChannels, PollChannels, PollCore, Settings, SettingsStore, SharedStatus,
    FIRMWARE_VERSION,
};

#[cfg(feature = "dev-panic")]
use panic_probe as _;
#[cfg(feature = "prod-panic")]
use panic_reset as _;

/// How long the reset button must stay down at power-up.
const FACTORY_RESET_HOLD: Duration = Duration::from_secs(3);

static CORE1_STACK: StaticCell<Stack<8192>> = StaticCell::new();
static EXECUTOR1: StaticCell<Executor> = StaticCell::new();

static CORE_CHANNELS: CoreChannels<CriticalSectionRawMutex> = CoreChannels::new();
static STATUS: SharedStatus = SharedStatus::new();
static HID_EVENTS: HidEventChannel = Channel::new();
static HID_COMMANDS: HidCommandChannel = Channel::new();
static DIP_CHANGES: DipChannel = Channel::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("usb2legacy {} starting...", FIRMWARE_VERSION);

    let p = embassy_rp::init(embassy_rp::config::Config::default());
    let board = Board::new(p);
    let leds = board.leds;

    let power = PowerLed::new(leds.power);
    let mut onboard = Output::new(leds.onboard, Level::Low);
    let mut store = settings_store(board.flash);

    // --- Factory reset ---
    let reset_button = Input::new(board.reset_button, Pull::Up);
    Timer::after_micros(500).await;
    if reset_button.is_low() {
        onboard.set_high();
        Timer::after(FACTORY_RESET_HOLD).await;
        if reset_button.is_low() {
            factory_reset(&mut store, &mut onboard).await;
        }
        onboard.set_low();
    }

    // --- Settings ---
    let mut dips = DipSwitchBank::new(board.dip);
    Timer::after(SETTLE).await;
    let live = dips.read();

    let mut settings = match store.load_or_default(FIRMWARE_VERSION) {
        Ok(LoadOutcome::Loaded { settings, upgraded }) => {
            if upgraded {
                info!("settings upgraded to {}", FIRMWARE_VERSION);
            }
            settings
        }
        Ok(LoadOutcome::DefaultsWritten(_)) => {
            info!("no usable settings, defaults written; restarting");
            SCB::sys_reset();
        }
        Err(e) => {
            error!("settings load failed: {}", e);
            Settings::DEFAULT
        }
    };
    if reconcile_boot(&mut settings, live) {
        info!("dip switches changed while off");
        if let Err(e) = store.save(&settings) {
            error!("settings save failed: {}", e);
        }
    }
    info!("settings: {}", settings);

    // --- DIN keyboard ---
    let keyboard = if cfg!(feature = "keyboard") {
        let mut engine = keyboard_port(board.din, settings.keyboard);
        if engine.probe_presence(Instant::now()) {
            info!("din host present");
        }
        Some(engine)
    } else {
        None
    };

    // --- Bus core ---
    let bus = BusCore::new(
        board.mouse_uart,
        board.aux_uart,
        power,
        CORE_CHANNELS.bus_link(),
        &STATUS,
    );
    spawn_core1(board.core1, CORE1_STACK.init(Stack::new()), move || {
        let executor1 = EXECUTOR1.init(Executor::new());
        executor1.run(|spawner| spawner.spawn(bus_task(bus, settings)).unwrap())
    });

    // --- Poll core ---
    let poll = PollCore::new(
        settings,
        store,
        keyboard,
        IndicatorLeds::new(leds.mouse, leds.keyboard),
        onboard,
        PollChannels {
            link: CORE_CHANNELS.poll_link(),
            status: &STATUS,
            events: HID_EVENTS.receiver(),
            commands: HID_COMMANDS.sender(),
            dip: DIP_CHANGES.receiver(),
        },
    );

    spawner.spawn(dip_task(dips, DIP_CHANGES.sender())).unwrap();
    spawner.spawn(poll_task(poll)).unwrap();

    info!("usb2legacy running");
}

/// Restore defaults and blink forever; a power cycle leaves this state.
async fn factory_reset(store: &mut SettingsStore<SettingsPartition>, led: &mut Output<'static>) -> ! {
    warn!("factory reset");
    if let Err(e) = store.save(&Settings::DEFAULT) {
        error!("settings save failed: {}", e);
    }
    loop {
        led.toggle();
        Timer::after(BLINK).await;
    }
}

/// Serial side, alone on core 1.
#[embassy_executor::task]
async fn bus_task(bus: BusCore, settings: Settings) {
    bus.run(settings).await
}

#[embassy_executor::task]
async fn poll_task(poll: PollCore) {
    poll.run().await
}

#[embassy_executor::task]
async fn dip_task(
    dips: DipSwitchBank,
    changes: Sender<'static, CriticalSectionRawMutex, DipChange, DIP_CHANGE_DEPTH>,
) {
    dips.run(changes).await
}
