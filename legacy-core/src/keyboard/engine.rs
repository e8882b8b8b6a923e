//! AT/XT keyboard emulation on the DIN port.
//!
//! [`KeyboardEngine`] owns the port and all per-host session state. The
//! poll core calls [`KeyboardEngine::tick`] from its main loop and feeds USB
//! keyboard reports through [`KeyboardEngine::process_report`].

use embassy_time::{Duration, Instant};

use crate::din::{DinError, KeyboardBus, LineState, Protocol, BAT_OK};
use crate::keyboard::command::{
    self, HostCommand, KeyMode, ACK, DEFAULT_TYPEMATIC_DELAY, DEFAULT_TYPEMATIC_RATE, ECHO_REPLY,
    KEYBOARD_ID,
};
use crate::keyboard::leds::LockLeds;
use crate::keyboard::report::BootKeyboardReport;
use crate::keyboard::scancodes::{self, USAGE_LEFT_CTRL};
use crate::settings::KeyboardSettings;
use crate::types::{CodeSetPreference, KeyboardType, ScanCodeSet};

/// A host that was already powering the port at boot gets this long to settle.
pub const BOOT_SETTLE: Duration = Duration::from_secs(3);
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);
pub const INIT_RETRY: Duration = Duration::from_millis(5);
/// Consecutive dead-line polls tolerated before the host is considered gone.
pub const DISCONNECT_THRESHOLD: u8 = 10;

/// Key being auto-repeated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Typematic {
    pub usage: u8,
    pub deadline: Instant,
}

/// Per-host state set up by the command set. Reset on power-up, `Reset`,
/// `SetDefault` and `Disable`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Session {
    pub enabled: bool,
    pub key_mode: KeyMode,
    pub typematic_delay: Duration,
    pub typematic_rate: Duration,
    pub typematic: Option<Typematic>,
    pub code_set: ScanCodeSet,
    pub leds: LockLeds,
}

impl Session {
    #[must_use]
    pub fn defaults(settings: &KeyboardSettings) -> Self {
        let code_set = match (settings.kind, settings.code_set) {
            (KeyboardType::Xt, _) => ScanCodeSet::Set1,
            (KeyboardType::At, CodeSetPreference::Auto | CodeSetPreference::Set2) => {
                ScanCodeSet::Set2
            }
            (KeyboardType::At, CodeSetPreference::Set1) => ScanCodeSet::Set1,
            (KeyboardType::At, CodeSetPreference::Set3) => ScanCodeSet::Set3,
        };
        Self {
            enabled: true,
            key_mode: KeyMode::ALL,
            typematic_delay: DEFAULT_TYPEMATIC_DELAY,
            typematic_rate: DEFAULT_TYPEMATIC_RATE,
            typematic: None,
            code_set,
            leds: LockLeds::NONE,
        }
    }
}

/// Outcome of one poll of the host line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DinStatus {
    /// Both lines low.
    Disconnected,
    /// Nothing requested by the host.
    Unavailable,
    /// A read started but failed; the byte was discarded.
    Failed(DinError),
    /// A command was received and answered.
    Handled,
    /// The host set new lock LEDs.
    LedsChanged(LockLeds),
}

/// What [`KeyboardEngine::tick`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkEvent {
    /// No host on the port.
    Absent,
    /// Nothing due yet.
    Waiting,
    Initialised,
    InitFailed,
    Polled(DinStatus),
    /// Too many dead polls; the session was reset. The caller should arm
    /// presence detection again.
    HostLost,
}

#[derive(Clone, Copy, Debug)]
struct DinLink {
    present: bool,
    initialised: bool,
    failures: u8,
    next_poll: Instant,
}

impl DinLink {
    const DOWN: Self = Self {
        present: false,
        initialised: false,
        failures: 0,
        next_poll: Instant::from_ticks(0),
    };
}

pub struct KeyboardEngine<B> {
    bus: B,
    settings: KeyboardSettings,
    session: Session,
    link: DinLink,
    last_sent: Option<u8>,
}

impl<B: KeyboardBus> KeyboardEngine<B> {
    pub fn new(bus: B, settings: KeyboardSettings) -> Self {
        Self {
            bus,
            session: Session::defaults(&settings),
            settings,
            link: DinLink::DOWN,
            last_sent: None,
        }
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn settings(&self) -> &KeyboardSettings {
        &self.settings
    }

    /// New persistent settings take effect with the next host session.
    pub fn set_settings(&mut self, settings: KeyboardSettings) {
        self.settings = settings;
    }

    #[must_use]
    pub fn is_present(&self) -> bool {
        self.link.present
    }

    #[must_use]
    pub fn is_initialised(&self) -> bool {
        self.link.initialised
    }

    fn protocol(&self) -> Protocol {
        match self.settings.kind {
            KeyboardType::Xt => Protocol::Xt,
            KeyboardType::At => Protocol::At,
        }
    }

    /// A genuine IBM XT expects the data line low until the keyboard starts.
    fn holds_data_while_presenting(&self) -> bool {
        self.settings.kind == KeyboardType::Xt && !self.settings.xt_clone
    }

    fn load_defaults(&mut self) {
        self.session = Session::defaults(&self.settings);
    }

    /// Boot-time presence check. A host that is powering the port shows
    /// both lines high; it is given [`BOOT_SETTLE`] before the first attempt.
    pub fn probe_presence(&mut self, now: Instant) -> bool {
        if self.bus.line_state() != LineState::Idle {
            return false;
        }
        if self.holds_data_while_presenting() {
            self.bus.hold_data_low(true);
        }
        self.link.present = true;
        self.link.next_poll = now + BOOT_SETTLE;
        true
    }

    /// The clock line rose: a host was powered on.
    pub fn host_powered(&mut self, now: Instant) {
        self.link.present = true;
        self.link.next_poll = now;
        self.load_defaults();
        if self.holds_data_while_presenting() {
            self.bus.hold_data_low(true);
        }
    }

    /// Forget the host and its session.
    pub fn reset_link(&mut self) {
        self.link = DinLink::DOWN;
        self.load_defaults();
    }

    /// Drive the link: initialisation, typematic repeat and host polling.
    pub fn tick(&mut self, now: Instant) -> LinkEvent {
        if !self.link.present {
            return LinkEvent::Absent;
        }

        if self.link.initialised {
            self.typematic_tick(now);
        }

        if now < self.link.next_poll {
            return LinkEvent::Waiting;
        }

        if !self.link.initialised {
            if self.holds_data_while_presenting() {
                self.bus.hold_data_low(false);
            }
            if self.bus.line_state() != LineState::Idle {
                return LinkEvent::Waiting;
            }
            let protocol = self.protocol();
            let ok = self.bus.announce(protocol);
            if ok {
                self.last_sent = Some(BAT_OK);
            }
            self.link.initialised = ok;
            self.link.next_poll = now + if ok { POLL_INTERVAL } else { INIT_RETRY };
            return if ok {
                LinkEvent::Initialised
            } else {
                LinkEvent::InitFailed
            };
        }

        let status = self.poll_host_line();
        match status {
            DinStatus::Disconnected => {
                self.link.failures = self.link.failures.saturating_add(1);
                if self.link.failures > DISCONNECT_THRESHOLD {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("din host gone after {} dead polls", self.link.failures);
                    self.reset_link();
                    return LinkEvent::HostLost;
                }
            }
            DinStatus::Handled | DinStatus::LedsChanged(_) => self.link.failures = 0,
            DinStatus::Unavailable | DinStatus::Failed(_) => {}
        }
        self.link.next_poll = now + POLL_INTERVAL;
        LinkEvent::Polled(status)
    }

    /// Classify the lines and answer one host request if there is one.
    pub fn poll_host_line(&mut self) -> DinStatus {
        let state = self.bus.line_state();
        if state == LineState::Dead {
            return DinStatus::Disconnected;
        }

        if self.protocol() == Protocol::Xt {
            if self.bus.reset_requested() {
                self.load_defaults();
                self.send(BAT_OK);
                return DinStatus::Handled;
            }
            return DinStatus::Unavailable;
        }

        if !state.is_available() {
            return DinStatus::Unavailable;
        }

        match self.bus.receive() {
            Ok(byte) => match self.handle_host_command(byte) {
                Some(leds) => DinStatus::LedsChanged(leds),
                None => DinStatus::Handled,
            },
            Err(e) => DinStatus::Failed(e),
        }
    }

    fn send(&mut self, byte: u8) -> bool {
        let protocol = self.protocol();
        match self.bus.transmit(protocol, byte) {
            Ok(()) => {
                self.last_sent = Some(byte);
                true
            }
            Err(_e) => {
                #[cfg(feature = "defmt")]
                defmt::trace!("din send {=u8:#x} failed: {}", byte, _e);
                false
            }
        }
    }

    /// Send until the host takes it.
    fn send_reliably(&mut self, byte: u8) {
        while !self.send(byte) {}
    }

    fn ack(&mut self) {
        self.send_reliably(ACK);
    }

    /// Execute one command byte from the host. Returns the new lock LEDs
    /// when the command was `SetLEDs`.
    pub fn handle_host_command(&mut self, byte: u8) -> Option<LockLeds> {
        let Some(cmd) = HostCommand::from_u8(byte) else {
            #[cfg(feature = "defmt")]
            defmt::debug!("ignoring host byte {=u8:#x}", byte);
            return None;
        };
        #[cfg(feature = "defmt")]
        defmt::debug!("host command {}", cmd);

        if cmd.takes_argument() {
            self.ack();
            return match self.bus.receive() {
                Ok(arg) => self.handle_argument(cmd, arg),
                // the host gave up; the second ack is skipped
                Err(_) => None,
            };
        }

        match cmd {
            HostCommand::Reset => {
                self.ack();
                self.load_defaults();
                self.send_reliably(BAT_OK);
            }
            HostCommand::Resend => match self.last_sent {
                Some(last) => self.send_reliably(last),
                None => self.ack(),
            },
            HostCommand::SetKeyTypeMake
            | HostCommand::SetKeyTypeMakeBreak
            | HostCommand::SetKeyTypeTypematic => self.ack(),
            HostCommand::SetAllKeysTypematicMakeBreak => self.set_key_mode(KeyMode::ALL),
            HostCommand::SetAllKeysMake => self.set_key_mode(KeyMode::MAKE_ONLY),
            HostCommand::SetAllKeysMakeBreak => self.set_key_mode(KeyMode::MAKE_BREAK),
            HostCommand::SetAllKeysTypematic => self.set_key_mode(KeyMode::MAKE_TYPEMATIC),
            HostCommand::SetDefault => {
                self.load_defaults();
                self.ack();
            }
            HostCommand::Disable => {
                self.load_defaults();
                self.session.enabled = false;
                self.ack();
            }
            HostCommand::Enable => {
                self.session.enabled = true;
                self.ack();
            }
            HostCommand::ReadId => {
                self.ack();
                for id in KEYBOARD_ID {
                    self.send(id);
                }
            }
            HostCommand::Echo => {
                self.send(ECHO_REPLY);
            }
            HostCommand::SetTypematicRateDelay
            | HostCommand::SetScanCodeSet
            | HostCommand::SetLeds => {}
        }
        None
    }

    /// Second half of a command that takes an argument byte.
    fn handle_argument(&mut self, cmd: HostCommand, arg: u8) -> Option<LockLeds> {
        let mut leds = None;
        match cmd {
            HostCommand::SetTypematicRateDelay => {
                let (delay, rate) = command::typematic_arg(arg);
                self.session.typematic_delay = delay;
                self.session.typematic_rate = rate;
            }
            HostCommand::SetScanCodeSet => match ScanCodeSet::from_number(arg) {
                Some(set) => self.session.code_set = set,
                None if arg == 0 => {
                    let number = self.session.code_set.number();
                    self.send(number);
                }
                None => {}
            },
            HostCommand::SetLeds => {
                let host = LockLeds::from_host(arg);
                self.session.leds = host;
                leds = Some(host);
            }
            _ => {}
        }
        self.ack();
        leds
    }

    fn set_key_mode(&mut self, mode: KeyMode) {
        self.session.key_mode = mode;
        self.ack();
    }

    /// Translate a USB usage and send it, subject to the key mode.
    /// Dropped while the host has scanning disabled or no host is up.
    pub fn translate_and_send(&mut self, usage: u8, make: bool) {
        if !self.session.enabled || !self.link.initialised {
            return;
        }
        let mode = self.session.key_mode;
        if (make && !mode.sends_make()) || (!make && !mode.sends_break()) {
            return;
        }
        for &byte in scancodes::translate(usage, make, self.session.code_set).iter() {
            self.send(byte);
        }
    }

    fn typematic_tick(&mut self, now: Instant) {
        if !self.session.enabled {
            return;
        }
        let Some(mut key) = self.session.typematic else {
            return;
        };
        if now < key.deadline {
            return;
        }
        self.translate_and_send(key.usage, true);
        key.deadline += self.session.typematic_rate;
        // more than a period behind after a stall: no catch-up burst
        if key.deadline <= now {
            key.deadline = now + self.session.typematic_rate;
        }
        self.session.typematic = Some(key);
    }

    /// Turn the difference between two reports from one keyboard into make
    /// and break codes. Returns `false` when the report was discarded.
    pub fn process_report(
        &mut self,
        previous: &BootKeyboardReport,
        report: &BootKeyboardReport,
        now: Instant,
    ) -> bool {
        if report.is_rollover_error() {
            #[cfg(feature = "defmt")]
            defmt::debug!("keyboard rollover error, report dropped");
            return false;
        }

        // any transition stops the repeat
        self.session.typematic = None;

        for bit in 0..8u8 {
            let down = report.modifier_down(bit);
            if down != previous.modifier_down(bit) {
                self.translate_and_send(USAGE_LEFT_CTRL + bit, down);
            }
        }

        for i in 0..report.keycodes.len() {
            let usage = report.keycodes[i];
            if usage != 0 && !previous.contains(usage) {
                if self.session.key_mode.typematic() {
                    self.session.typematic = Some(Typematic {
                        usage,
                        deadline: now + self.session.typematic_delay,
                    });
                }
                self.translate_and_send(usage, true);
            }

            let released = previous.keycodes[i];
            if released != 0 && !report.contains(released) {
                self.translate_and_send(released, false);
            }
        }
        true
    }

    /// Break every key still held in `last`, the final report of a keyboard
    /// that was unplugged.
    pub fn release_all(&mut self, last: &BootKeyboardReport) {
        self.session.typematic = None;
        for bit in 0..8u8 {
            if last.modifier_down(bit) {
                self.translate_and_send(USAGE_LEFT_CTRL + bit, false);
            }
        }
        for usage in last.keycodes {
            if usage != 0 {
                self.translate_and_send(usage, false);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use std::collections::VecDeque;
    use std::vec::Vec;

    #[derive(Default)]
    struct MockBus {
        sent: Vec<(Protocol, u8)>,
        incoming: VecDeque<Result<u8, DinError>>,
        state: Option<LineState>,
        fail_transmits: usize,
        reset_request: bool,
        holding: bool,
    }

    impl MockBus {
        fn bytes(&self) -> Vec<u8> {
            self.sent.iter().map(|(_, b)| *b).collect()
        }
    }

    impl KeyboardBus for MockBus {
        fn transmit(&mut self, protocol: Protocol, byte: u8) -> Result<(), DinError> {
            if self.fail_transmits > 0 {
                self.fail_transmits -= 1;
                return Err(DinError::ClockLine);
            }
            self.sent.push((protocol, byte));
            Ok(())
        }

        fn receive(&mut self) -> Result<u8, DinError> {
            self.incoming.pop_front().unwrap_or(Err(DinError::Timeout))
        }

        fn line_state(&mut self) -> LineState {
            if let Some(state) = self.state {
                return state;
            }
            if self.incoming.is_empty() {
                LineState::Idle
            } else {
                LineState::Requesting
            }
        }

        fn reset_requested(&mut self) -> bool {
            core::mem::take(&mut self.reset_request)
        }

        fn hold_data_low(&mut self, hold: bool) {
            self.holding = hold;
        }

        fn pause_ms(&mut self, _ms: u32) {}
    }

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    /// Engine with the host already up and the BAT code cleared from the log.
    fn engine_with(settings: KeyboardSettings) -> KeyboardEngine<MockBus> {
        let mut engine = KeyboardEngine::new(MockBus::default(), settings);
        engine.host_powered(at(0));
        assert_eq!(engine.tick(at(0)), LinkEvent::Initialised);
        engine.bus_mut().sent.clear();
        engine
    }

    fn engine() -> KeyboardEngine<MockBus> {
        engine_with(KeyboardSettings::DEFAULT)
    }

    fn keys(modifier: u8, codes: &[u8]) -> BootKeyboardReport {
        let mut keycodes = [0u8; 6];
        keycodes[..codes.len()].copy_from_slice(codes);
        BootKeyboardReport::new(modifier, keycodes)
    }

    fn host_sends(engine: &mut KeyboardEngine<MockBus>, bytes: &[u8]) -> DinStatus {
        engine.bus_mut().incoming.extend(bytes.iter().map(|b| Ok(*b)));
        engine.poll_host_line()
    }

    #[test]
    fn test_make_and_break_of_a() {
        let mut kb = engine();
        let empty = BootKeyboardReport::EMPTY;
        let a = keys(0, &[0x04]);

        assert!(kb.process_report(&empty, &a, at(100)));
        assert_eq!(kb.bus_mut().bytes(), [0x1C]);
        assert_eq!(kb.session().typematic.map(|t| t.usage), Some(0x04));

        kb.bus_mut().sent.clear();
        assert!(kb.process_report(&a, &empty, at(150)));
        assert_eq!(kb.bus_mut().bytes(), [0xF0, 0x1C]);
        assert_eq!(kb.session().typematic, None);
        assert!(kb.bus_mut().sent.iter().all(|(p, _)| *p == Protocol::At));
    }

    #[test]
    fn test_modifier_transitions() {
        let mut kb = engine();
        let empty = BootKeyboardReport::EMPTY;
        // left shift and right gui
        let held = keys(0x82, &[]);
        kb.process_report(&empty, &held, at(0));
        assert_eq!(kb.bus_mut().bytes(), [0x12, 0xE0, 0x27]);

        kb.bus_mut().sent.clear();
        kb.process_report(&held, &keys(0x02, &[]), at(10));
        assert_eq!(kb.bus_mut().bytes(), [0xE0, 0xF0, 0x27]);
        // modifiers do not repeat
        assert_eq!(kb.session().typematic, None);
    }

    #[test]
    fn test_rollover_report_discarded() {
        let mut kb = engine();
        let rollover = keys(0, &[1, 1, 1, 1, 1, 1]);
        assert!(!kb.process_report(&BootKeyboardReport::EMPTY, &rollover, at(0)));
        assert!(kb.bus_mut().sent.is_empty());
    }

    #[test]
    fn test_typematic_repeat_schedule() {
        let mut kb = engine();
        kb.process_report(&BootKeyboardReport::EMPTY, &keys(0, &[0x04]), at(1000));
        kb.bus_mut().sent.clear();

        kb.tick(at(1499));
        assert!(kb.bus_mut().sent.is_empty());
        kb.tick(at(1500));
        assert_eq!(kb.bus_mut().bytes(), [0x1C]);
        kb.tick(at(1599));
        assert_eq!(kb.bus_mut().bytes().len(), 1);
        kb.tick(at(1600));
        assert_eq!(kb.bus_mut().bytes(), [0x1C, 0x1C]);
    }

    #[test]
    fn test_typematic_stall_does_not_burst() {
        let mut kb = engine();
        kb.process_report(&BootKeyboardReport::EMPTY, &keys(0, &[0x04]), at(1000));
        kb.bus_mut().sent.clear();

        // nothing ticked for two seconds
        kb.tick(at(3500));
        assert_eq!(kb.bus_mut().bytes(), [0x1C]);
        kb.tick(at(3500));
        kb.tick(at(3599));
        assert_eq!(kb.bus_mut().bytes().len(), 1);
        kb.tick(at(3600));
        assert_eq!(kb.bus_mut().bytes(), [0x1C, 0x1C]);
    }

    #[test]
    fn test_argument_commands_wait_for_their_byte() {
        for cmd in [0xF3, 0xF0, 0xED] {
            let mut kb = engine();
            assert!(HostCommand::from_u8(cmd).is_some_and(HostCommand::takes_argument));
            host_sends(&mut kb, &[cmd]);
            assert_eq!(kb.bus_mut().bytes(), [ACK], "command {cmd:#x}");
        }
    }

    #[test]
    fn test_reset_command() {
        let mut kb = engine();
        kb.session.key_mode = KeyMode::MAKE_ONLY;
        assert_eq!(host_sends(&mut kb, &[0xFF]), DinStatus::Handled);
        assert_eq!(kb.bus_mut().bytes(), [ACK, BAT_OK]);
        assert_eq!(kb.session().key_mode, KeyMode::ALL);
    }

    #[test]
    fn test_ack_is_retried_until_sent() {
        let mut kb = engine();
        kb.bus_mut().fail_transmits = 3;
        host_sends(&mut kb, &[0xF4]);
        assert_eq!(kb.bus_mut().bytes(), [ACK]);
    }

    #[test]
    fn test_set_typematic_rate_delay() {
        let mut kb = engine();
        host_sends(&mut kb, &[0xF3, 0x2B]);
        assert_eq!(kb.bus_mut().bytes(), [ACK, ACK]);
        assert_eq!(kb.session().typematic_delay, Duration::from_millis(500));
        assert_eq!(kb.session().typematic_rate, Duration::from_millis(92));
    }

    #[test]
    fn test_argument_timeout_skips_second_ack() {
        let mut kb = engine();
        let status = host_sends(&mut kb, &[0xED]);
        assert_eq!(status, DinStatus::Handled);
        assert_eq!(kb.bus_mut().bytes(), [ACK]);
        assert_eq!(kb.session().leds, LockLeds::NONE);
    }

    #[test]
    fn test_set_leds() {
        let mut kb = engine();
        let status = host_sends(&mut kb, &[0xED, 0x02]);
        assert_eq!(status, DinStatus::LedsChanged(LockLeds::N));
        assert_eq!(kb.bus_mut().bytes(), [ACK, ACK]);
        assert_eq!(kb.session().leds, LockLeds::N);
    }

    #[test]
    fn test_scan_code_set_query_and_select() {
        let mut kb = engine();
        host_sends(&mut kb, &[0xF0, 0x00]);
        assert_eq!(kb.bus_mut().bytes(), [ACK, 0x02, ACK]);

        kb.bus_mut().sent.clear();
        host_sends(&mut kb, &[0xF0, 0x01]);
        assert_eq!(kb.session().code_set, ScanCodeSet::Set1);

        kb.bus_mut().sent.clear();
        kb.process_report(&BootKeyboardReport::EMPTY, &keys(0, &[0x04]), at(0));
        assert_eq!(kb.bus_mut().sent, [(Protocol::At, 0x1E)]);
    }

    #[test]
    fn test_echo_read_id_and_resend() {
        let mut kb = engine();
        host_sends(&mut kb, &[0xEE]);
        assert_eq!(kb.bus_mut().bytes(), [ECHO_REPLY]);

        kb.bus_mut().sent.clear();
        host_sends(&mut kb, &[0xF2]);
        assert_eq!(kb.bus_mut().bytes(), [ACK, 0xAB, 0x83]);

        kb.bus_mut().sent.clear();
        host_sends(&mut kb, &[0xFE]);
        assert_eq!(kb.bus_mut().bytes(), [0x83]);
    }

    #[test]
    fn test_unknown_command_is_ignored() {
        let mut kb = engine();
        assert_eq!(host_sends(&mut kb, &[0x42]), DinStatus::Handled);
        assert!(kb.bus_mut().sent.is_empty());
    }

    #[test]
    fn test_disable_drops_keys_until_enable() {
        let mut kb = engine();
        host_sends(&mut kb, &[0xF5]);
        kb.bus_mut().sent.clear();
        kb.process_report(&BootKeyboardReport::EMPTY, &keys(0, &[0x05]), at(0));
        assert!(kb.bus_mut().sent.is_empty());

        host_sends(&mut kb, &[0xF4]);
        kb.bus_mut().sent.clear();
        kb.process_report(&keys(0, &[0x05]), &BootKeyboardReport::EMPTY, at(10));
        assert_eq!(kb.bus_mut().bytes(), [0xF0, 0x32]);
    }

    #[test]
    fn test_make_only_mode() {
        let mut kb = engine();
        host_sends(&mut kb, &[0xF9]);
        kb.bus_mut().sent.clear();

        let a = keys(0, &[0x04]);
        kb.process_report(&BootKeyboardReport::EMPTY, &a, at(0));
        assert_eq!(kb.session().typematic, None);
        kb.process_report(&a, &BootKeyboardReport::EMPTY, at(10));
        assert_eq!(kb.bus_mut().bytes(), [0x1C]);
    }

    #[test]
    fn test_release_all_breaks_held_keys() {
        let mut kb = engine();
        let held = keys(0x01, &[0x04, 0x05]);
        kb.process_report(&BootKeyboardReport::EMPTY, &held, at(0));
        kb.bus_mut().sent.clear();

        kb.release_all(&held);
        assert_eq!(kb.bus_mut().bytes(), [0xF0, 0x14, 0xF0, 0x1C, 0xF0, 0x32]);
        assert_eq!(kb.session().typematic, None);
    }

    #[test]
    fn test_boot_presence_waits_to_settle() {
        let mut kb = KeyboardEngine::new(MockBus::default(), KeyboardSettings::DEFAULT);
        assert_eq!(kb.tick(at(0)), LinkEvent::Absent);
        assert!(kb.probe_presence(at(0)));
        assert_eq!(kb.tick(at(2999)), LinkEvent::Waiting);
        assert_eq!(kb.tick(at(3000)), LinkEvent::Initialised);
        assert_eq!(kb.bus_mut().bytes(), [BAT_OK]);
        assert_eq!(kb.tick(at(3005)), LinkEvent::Waiting);
        assert_eq!(
            kb.tick(at(3010)),
            LinkEvent::Polled(DinStatus::Unavailable)
        );
    }

    #[test]
    fn test_dead_port_at_boot_is_not_present() {
        let mut bus = MockBus::default();
        bus.state = Some(LineState::Dead);
        let mut kb = KeyboardEngine::new(bus, KeyboardSettings::DEFAULT);
        assert!(!kb.probe_presence(at(0)));
        assert!(!kb.is_present());
    }

    #[test]
    fn test_failed_init_retries_sooner() {
        let mut kb = KeyboardEngine::new(MockBus::default(), KeyboardSettings::DEFAULT);
        kb.host_powered(at(0));
        kb.bus_mut().fail_transmits = usize::from(crate::din::ANNOUNCE_ATTEMPTS);
        assert_eq!(kb.tick(at(0)), LinkEvent::InitFailed);
        assert_eq!(kb.tick(at(4)), LinkEvent::Waiting);
        assert_eq!(kb.tick(at(5)), LinkEvent::Initialised);
    }

    #[test]
    fn test_host_lost_after_dead_polls() {
        let mut kb = engine();
        kb.bus_mut().state = Some(LineState::Dead);
        let mut t = 10;
        for _ in 0..DISCONNECT_THRESHOLD {
            assert_eq!(kb.tick(at(t)), LinkEvent::Polled(DinStatus::Disconnected));
            t += 10;
        }
        assert_eq!(kb.tick(at(t)), LinkEvent::HostLost);
        assert!(!kb.is_present());
        assert!(!kb.is_initialised());
    }

    #[test]
    fn test_answered_command_clears_failure_count() {
        let mut kb = engine();
        kb.bus_mut().state = Some(LineState::Dead);
        for i in 1..=5 {
            kb.tick(at(i * 10));
        }
        kb.bus_mut().state = None;
        kb.bus_mut().incoming.push_back(Ok(0xF4));
        assert_eq!(kb.tick(at(60)), LinkEvent::Polled(DinStatus::Handled));

        kb.bus_mut().state = Some(LineState::Dead);
        for i in 7..=16 {
            assert_eq!(kb.tick(at(i * 10)), LinkEvent::Polled(DinStatus::Disconnected));
        }
    }

    #[test]
    fn test_ibm_xt_holds_data_and_answers_reset() {
        let settings = KeyboardSettings {
            kind: KeyboardType::Xt,
            xt_clone: false,
            ..KeyboardSettings::DEFAULT
        };
        let mut kb = KeyboardEngine::new(MockBus::default(), settings);
        assert!(kb.probe_presence(at(0)));
        assert!(kb.bus_mut().holding);

        assert_eq!(kb.tick(at(3000)), LinkEvent::Initialised);
        assert!(!kb.bus_mut().holding);
        assert_eq!(kb.bus_mut().sent, [(Protocol::Xt, BAT_OK)]);
        assert_eq!(kb.session().code_set, ScanCodeSet::Set1);

        kb.bus_mut().reset_request = true;
        assert_eq!(kb.tick(at(3010)), LinkEvent::Polled(DinStatus::Handled));
        assert_eq!(kb.bus_mut().sent.len(), 2);

        kb.bus_mut().sent.clear();
        kb.process_report(&BootKeyboardReport::EMPTY, &keys(0, &[0x04]), at(3020));
        kb.process_report(&keys(0, &[0x04]), &BootKeyboardReport::EMPTY, at(3030));
        assert_eq!(kb.bus_mut().sent, [(Protocol::Xt, 0x1E), (Protocol::Xt, 0x9E)]);
    }
}
