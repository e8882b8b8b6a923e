//! Poll core: USB input, the mouse pipeline, the DIN keyboard port and the
//! settings store. Runs on core 0.

use defmt::{debug, error, info, warn};
use embassy_futures::select::{select, select4, Either, Either4};
use embassy_rp::gpio::Output;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Receiver, Sender};
use embassy_time::{Duration, Instant, Ticker, Timer};
use legacy_core::gamepad::{self, GamepadReport};
use legacy_core::keyboard::IdleLedAnimation;
use legacy_core::serial::usb_poll_throttle;
use legacy_core::settings::{DipSnapshotOrder, HeldDipChanges};
use legacy_core::{
    BusRequest, DeviceRegistry, DinStatus, GamepadKind, HidHandle, LinkEvent, LockLeds,
    MouseButton, MousePipeline, PollLink, RegistryError, Settings, SettingsStore, SharedStatus,
};

use crate::din::{self, DinKeyboard};
use crate::dip::{DipChange, DIP_CHANGE_DEPTH};
use crate::flash::SettingsPartition;
use crate::leds::IndicatorLeds;
use crate::usb_host::{
    boot_keyboard_report, boot_mouse_report, HidCommand, HidEvent, HID_COMMAND_DEPTH,
    HID_EVENT_DEPTH,
};

const ALWAYS_POST: bool = cfg!(feature = "always-post");
const SNAPSHOT_ORDER: DipSnapshotOrder = if cfg!(feature = "legacy-dip-snapshot") {
    DipSnapshotOrder::Swapped
} else {
    DipSnapshotOrder::Straight
};

/// Keyboard port service and LED animation granularity.
const HOUSEKEEPING: Duration = Duration::from_millis(1);
const HEARTBEAT: Duration = Duration::from_secs(1);

/// Gamepad face buttons in mouse button order.
const GAMEPAD_MOUSE_BUTTONS: [MouseButton; 3] =
    [MouseButton::Left, MouseButton::Middle, MouseButton::Right];

/// Channel ends the poll core owns.
pub struct PollChannels {
    pub link: PollLink<'static, CriticalSectionRawMutex>,
    pub status: &'static SharedStatus,
    pub events: Receiver<'static, CriticalSectionRawMutex, HidEvent, HID_EVENT_DEPTH>,
    pub commands: Sender<'static, CriticalSectionRawMutex, HidCommand, HID_COMMAND_DEPTH>,
    pub dip: Receiver<'static, CriticalSectionRawMutex, DipChange, DIP_CHANGE_DEPTH>,
}

/// Keyboard LED chase while no DIN host drives the LEDs.
struct IdleLeds {
    animation: IdleLedAnimation,
    next: Option<Instant>,
}

pub struct PollCore {
    settings: Settings,
    store: SettingsStore<SettingsPartition>,
    registry: DeviceRegistry,
    pipeline: MousePipeline,
    keyboard: Option<DinKeyboard>,
    held_dips: HeldDipChanges,
    idle: IdleLeds,
    leds: IndicatorLeds,
    heartbeat: Output<'static>,
    heartbeat_at: Instant,
    usb_ready_at: Instant,
    channels: PollChannels,
}

impl PollCore {
    pub fn new(
        settings: Settings,
        store: SettingsStore<SettingsPartition>,
        keyboard: Option<DinKeyboard>,
        leds: IndicatorLeds,
        heartbeat: Output<'static>,
        channels: PollChannels,
    ) -> Self {
        let now = Instant::now();
        Self {
            settings,
            store,
            registry: DeviceRegistry::new(),
            pipeline: MousePipeline::new(settings.mouse),
            keyboard,
            held_dips: HeldDipChanges::new(),
            idle: IdleLeds {
                animation: IdleLedAnimation::new(),
                next: None,
            },
            leds,
            heartbeat,
            heartbeat_at: now + HEARTBEAT,
            usb_ready_at: now,
            channels,
        }
    }

    pub async fn run(mut self) -> ! {
        let mut ticker = Ticker::every(HOUSEKEEPING);
        loop {
            let usb_ready_at = self.usb_ready_at;
            let events = &self.channels.events;
            let usb = async move {
                Timer::at(usb_ready_at).await;
                events.receive().await
            };
            let woke = select4(
                usb,
                self.channels.link.next_request(),
                self.channels.dip.receive(),
                select(ticker.next(), din::host_powered(self.keyboard.as_mut())),
            )
            .await;

            match woke {
                Either4::First(event) => self.handle_usb(event),
                Either4::Second(request) => self.handle_bus(request).await,
                Either4::Third(change) => self.handle_dip(change).await,
                Either4::Fourth(Either::First(())) => {
                    self.housekeeping(Instant::now());
                    if !self.held_dips.is_empty() && !self.channels.status.stop_deferred() {
                        info!("terminal closed, applying dip changes");
                        self.reconfigure(None).await;
                    }
                }
                Either4::Fourth(Either::Second(())) => {
                    if let Some(engine) = self.keyboard.as_mut() {
                        info!("din host powered");
                        engine.host_powered(Instant::now());
                    }
                }
            }
        }
    }

    async fn handle_bus(&mut self, request: BusRequest) {
        match request {
            BusRequest::MousePacket => {
                let pkt = self.pipeline.finalize_cycle(self.registry.gamepad_pointer());
                let reply = (pkt.update || ALWAYS_POST).then_some(pkt);
                self.channels.link.reply_packet(reply).await;
            }
            BusRequest::SaveSettings(edited) => self.reconfigure(Some(edited)).await,
        }
    }

    async fn handle_dip(&mut self, change: DipChange) {
        self.held_dips.hold(change.group, change.live);
        if self.channels.status.stop_deferred() {
            info!("dip {} changed, held until the terminal closes", change.group);
            return;
        }
        self.reconfigure(None).await;
    }

    /// Stop the bus core, apply `edited` and any held DIP changes, save and
    /// resume.
    async fn reconfigure(&mut self, edited: Option<Settings>) {
        let pending = self.channels.link.stop_bus().await;
        let mut settings = pending.or(edited).unwrap_or(self.settings);
        self.held_dips.apply(&mut settings, SNAPSHOT_ORDER);
        self.apply(settings);
        self.save();
        self.channels.link.resume_bus(self.settings).await;
    }

    fn apply(&mut self, settings: Settings) {
        self.settings = settings;
        self.pipeline.set_settings(settings.mouse);
        if let Some(engine) = self.keyboard.as_mut() {
            engine.set_settings(settings.keyboard);
        }
    }

    fn save(&mut self) {
        match self.store.save(&self.settings) {
            Ok(()) => info!("settings saved"),
            Err(e) => error!("settings save failed: {}", e),
        }
    }

    fn handle_usb(&mut self, event: HidEvent) {
        let now = Instant::now();
        match event {
            HidEvent::MouseMounted(handle) => {
                info!("mouse mounted: {}", handle);
                self.registry.mount_mouse();
                self.refresh_indicators();
            }
            HidEvent::MouseUnmounted(handle) => {
                info!("mouse unmounted: {}", handle);
                self.registry.unmount_mouse();
                self.refresh_indicators();
            }
            HidEvent::MouseReport(_, report) => {
                if self.channels.status.serial_state().is_terminal() {
                    return;
                }
                self.pipeline.record_report(&boot_mouse_report(&report));
                if let Some(throttle) = usb_poll_throttle(self.pipeline.settings()) {
                    self.usb_ready_at = now + throttle;
                }
            }
            HidEvent::KeyboardMounted(handle) => match self.registry.mount_keyboard(handle) {
                Ok(first) => {
                    info!("keyboard mounted: {}", handle);
                    if first {
                        self.start_idle_leds(now);
                    }
                    self.refresh_indicators();
                }
                Err(e) => warn!("keyboard {} not tracked: {}", handle, e),
            },
            HidEvent::KeyboardUnmounted(handle) => {
                if let Some(last) = self.registry.unmount_keyboard(handle) {
                    info!("keyboard unmounted: {}", handle);
                    if let Some(engine) = self.keyboard.as_mut() {
                        engine.release_all(&last);
                    }
                    self.refresh_indicators();
                }
            }
            HidEvent::KeyboardReport(handle, report) => {
                let report = boot_keyboard_report(&report);
                if let Some(prev) = self.registry.swap_keyboard_report(handle, report) {
                    if let Some(engine) = self.keyboard.as_mut() {
                        engine.process_report(&prev, &report, now);
                    }
                }
            }
            HidEvent::GamepadMounted { handle, vid, pid } => {
                match self.registry.mount_hid_gamepad(handle, vid, pid) {
                    Ok(kind) => info!("gamepad mounted: {} {}", handle, kind),
                    Err(RegistryError::Unsupported) => {
                        debug!("ignoring hid device {=u16:#06x}:{=u16:#06x}", vid, pid)
                    }
                    Err(e) => warn!("gamepad {} not tracked: {}", handle, e),
                }
                self.refresh_indicators();
            }
            HidEvent::XInputMounted(handle) => {
                match self.registry.mount_gamepad(handle, GamepadKind::XInput) {
                    Ok(()) => info!("xinput pad mounted: {}", handle),
                    Err(e) => warn!("xinput pad {} not tracked: {}", handle, e),
                }
                self.refresh_indicators();
            }
            HidEvent::GamepadUnmounted(handle) => {
                let held = self
                    .registry
                    .gamepad()
                    .filter(|slot| slot.handle == handle)
                    .map(|slot| slot.previous.mouse_buttons());
                if self.registry.unmount_gamepad(handle) {
                    info!("gamepad unmounted: {}", handle);
                    if let Some(held) = held {
                        self.gamepad_buttons(held, [false; 3]);
                    }
                    self.refresh_indicators();
                }
            }
            HidEvent::GamepadReport(handle, data) => {
                let Some(kind) = self
                    .registry
                    .gamepad()
                    .filter(|slot| slot.handle == handle)
                    .map(|slot| slot.kind)
                else {
                    return;
                };
                let decoded = match kind {
                    GamepadKind::DualShock4 => gamepad::decode_ds4(&data),
                    GamepadKind::PsClassic => gamepad::decode_ps_classic(&data),
                    GamepadKind::XInput => return,
                };
                match decoded {
                    Ok(report) => self.gamepad_input(handle, report),
                    Err(e) => debug!("gamepad report dropped: {}", e),
                }
            }
            HidEvent::XInputReport(handle, pad) => {
                self.gamepad_input(handle, gamepad::decode_xinput(&pad));
            }
        }
    }

    fn gamepad_input(&mut self, handle: HidHandle, report: GamepadReport) {
        if self.channels.status.serial_state().is_terminal() {
            return;
        }
        if let Some(prev) = self.registry.update_gamepad(handle, report) {
            self.gamepad_buttons(prev.mouse_buttons(), report.mouse_buttons());
        }
    }

    fn gamepad_buttons(&mut self, old: [bool; 3], new: [bool; 3]) {
        for ((button, was), is) in GAMEPAD_MOUSE_BUTTONS.into_iter().zip(old).zip(new) {
            if was != is {
                self.pipeline.record_button(button, is);
            }
        }
    }

    fn refresh_indicators(&mut self) {
        self.leds.show(self.registry.indicators());
        self.channels.status.set_mouse_count(self.registry.mouse_count());
    }

    fn send_keyboard_leds(&mut self, leds: LockLeds) {
        let Some(handle) = self.registry.first_keyboard() else {
            return;
        };
        let command = HidCommand::SetKeyboardLeds {
            handle,
            leds: leds.to_usb(),
        };
        if self.channels.commands.try_send(command).is_err() {
            debug!("keyboard led update dropped");
        }
    }

    fn din_present(&self) -> bool {
        self.keyboard.as_ref().is_some_and(|engine| engine.is_present())
    }

    fn start_idle_leds(&mut self, now: Instant) {
        if self.din_present() {
            return;
        }
        self.idle.animation.restart();
        self.idle.next = Some(now);
    }

    fn idle_leds(&mut self, now: Instant) {
        let Some(due) = self.idle.next else {
            return;
        };
        if now < due {
            return;
        }
        if self.registry.first_keyboard().is_none() || self.din_present() {
            self.idle.next = None;
            return;
        }
        let (leds, hold) = self.idle.animation.next_frame();
        self.send_keyboard_leds(leds);
        self.idle.next = Some(now + hold);
    }

    fn housekeeping(&mut self, now: Instant) {
        let mut host_leds = None;
        if let Some(engine) = self.keyboard.as_mut() {
            match engine.tick(now) {
                LinkEvent::Initialised => {
                    info!("din host initialised");
                    host_leds = Some(engine.session().leds);
                }
                LinkEvent::InitFailed => warn!("din host did not answer init"),
                LinkEvent::Polled(DinStatus::LedsChanged(leds)) => host_leds = Some(leds),
                LinkEvent::Polled(DinStatus::Failed(e)) => debug!("din read failed: {}", e),
                LinkEvent::HostLost => warn!("din host lost"),
                _ => {}
            }
        }
        if let Some(leds) = host_leds {
            self.idle.next = None;
            self.send_keyboard_leds(leds);
        }
        self.idle_leds(now);

        if now >= self.heartbeat_at {
            self.heartbeat.toggle();
            self.heartbeat_at += HEARTBEAT;
        }
    }
}
