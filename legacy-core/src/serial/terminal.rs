//! Line-oriented configuration shell over a serial port.
//!
//! Opened when a line terminator shows up on either UART while the adapter
//! is acting as a mouse. Works on a copy of the settings; only `save`
//! hands the copy back for persisting.

use core::fmt::Write as _;
use core::future::Future;

use embassy_time::Duration;
use embedded_hal_async::delay::DelayNs;
use heapless::String;

use crate::settings::{clamp_travel, Settings};
use crate::types::{
    BaudRate, CodeSetPreference, CosineLevel, KeyboardType, MouseType, MovementMode,
};

/// Longest accepted command line.
pub const LINE_CAPACITY: usize = 48;

const PROMPT: &str = "\r\n> ";

const HELP: &[&str] = &[
    "Commands:",
    "  help                 this text",
    "  show                 current settings",
    "  set <field> <value>  change a setting",
    "  defaults             load factory settings",
    "  save                 save and restart",
    "  exit                 leave without saving",
    "Fields: xy x y (1-200), type (two|three|wheel), stop (1|2),",
    "  baud (1200-19200), swap, side, swapside, invx, invy (on|off),",
    "  movement (additive|average|coast), cosine (0-4), lang (0|1),",
    "  kbd (xt|at), xtclone (on|off), codeset (auto|1|2|3)",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TerminalError {
    /// The underlying port failed.
    Io,
    /// Output did not fit the formatting buffer.
    Format,
}

/// Byte stream the terminal talks over.
pub trait TerminalIo {
    fn read_byte(&mut self) -> impl Future<Output = Result<u8, TerminalError>>;
    fn write_byte(&mut self, byte: u8) -> impl Future<Output = Result<(), TerminalError>>;
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TerminalExit {
    /// Persist these settings and restart the bus core.
    Save(Settings),
    Discard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command<'a> {
    Help,
    Show,
    Set(&'a str, &'a str),
    Defaults,
    Save,
    Exit,
    Empty,
    Unknown,
}

fn parse_command(line: &str) -> Command<'_> {
    let mut words = line.split_whitespace();
    let Some(cmd) = words.next() else {
        return Command::Empty;
    };
    match cmd {
        "help" | "?" => Command::Help,
        "show" => Command::Show,
        "defaults" => Command::Defaults,
        "save" => Command::Save,
        "exit" | "quit" => Command::Exit,
        "set" => match (words.next(), words.next()) {
            (Some(field), Some(value)) => Command::Set(field, value),
            _ => Command::Unknown,
        },
        _ => Command::Unknown,
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value {
        "on" | "1" | "yes" => Some(true),
        "off" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Apply one `set` command to `settings`. Returns `false` for an unknown
/// field or an illegal value, leaving `settings` untouched.
pub fn apply_field(settings: &mut Settings, field: &str, value: &str) -> bool {
    let m = &mut settings.mouse;
    let k = &mut settings.keyboard;
    let number = value.parse::<u32>().ok();

    match field {
        "xy" | "x" | "y" => {
            let Some(pct) = number.and_then(|n| u8::try_from(n).ok()) else {
                return false;
            };
            if pct != clamp_travel(pct) {
                return false;
            }
            match field {
                "xy" => m.travel_xy = pct,
                "x" => m.travel_x = pct,
                _ => m.travel_y = pct,
            }
        }
        "type" => {
            m.mouse_type = match value {
                "two" | "0" => MouseType::TwoButton,
                "three" | "1" => MouseType::ThreeButton,
                "wheel" | "2" => MouseType::Wheel,
                _ => return false,
            }
        }
        "stop" => {
            m.double_stop_bit = match value {
                "1" => false,
                "2" => true,
                _ => return false,
            }
        }
        "baud" => match number.and_then(BaudRate::from_bps) {
            Some(baud) => m.baud = baud,
            None => return false,
        },
        "swap" | "side" | "swapside" | "invx" | "invy" | "xtclone" => {
            let Some(on) = parse_flag(value) else {
                return false;
            };
            match field {
                "swap" => m.swap_left_right = on,
                "side" => m.use_side_buttons = on,
                "swapside" => m.swap_side_buttons = on,
                "invx" => m.invert_x = on,
                "invy" => m.invert_y = on,
                _ => k.xt_clone = on,
            }
        }
        "movement" => {
            m.movement = match value {
                "additive" | "0" => MovementMode::Additive,
                "average" | "1" => MovementMode::Average,
                "coast" | "2" => MovementMode::Coast,
                _ => return false,
            }
        }
        "cosine" => match number.and_then(|n| u8::try_from(n).ok()).and_then(CosineLevel::new) {
            Some(level) => m.cosine = level,
            None => return false,
        },
        "lang" => match number {
            Some(n @ (0 | 1)) => m.language = n as u8,
            _ => return false,
        },
        "kbd" => {
            k.kind = match value {
                "xt" => KeyboardType::Xt,
                "at" | "ps2" => KeyboardType::At,
                _ => return false,
            }
        }
        "codeset" => {
            k.code_set = match value {
                "auto" | "0" => CodeSetPreference::Auto,
                "1" => CodeSetPreference::Set1,
                "2" => CodeSetPreference::Set2,
                "3" => CodeSetPreference::Set3,
                _ => return false,
            }
        }
        _ => return false,
    }
    true
}

/// An open terminal session.
pub struct Terminal<IO, D> {
    io: IO,
    delay: D,
    char_delay: Duration,
}

impl<IO: TerminalIo, D: DelayNs> Terminal<IO, D> {
    /// `char_delay` paces every byte written so slow terminals keep up.
    pub fn new(io: IO, delay: D, char_delay: Duration) -> Self {
        Self {
            io,
            delay,
            char_delay,
        }
    }

    pub fn into_inner(self) -> IO {
        self.io
    }

    async fn put(&mut self, byte: u8) -> Result<(), TerminalError> {
        self.io.write_byte(byte).await?;
        let us = u32::try_from(self.char_delay.as_micros()).unwrap_or(u32::MAX);
        if us > 0 {
            self.delay.delay_us(us).await;
        }
        Ok(())
    }

    pub async fn print(&mut self, text: &str) -> Result<(), TerminalError> {
        for &b in text.as_bytes() {
            self.put(b).await?;
        }
        Ok(())
    }

    pub async fn println(&mut self, text: &str) -> Result<(), TerminalError> {
        self.print(text).await?;
        self.print("\r\n").await
    }

    async fn print_fmt(&mut self, args: core::fmt::Arguments<'_>) -> Result<(), TerminalError> {
        let mut buf: String<64> = String::new();
        buf.write_fmt(args).map_err(|_| TerminalError::Format)?;
        self.println(&buf).await
    }

    /// Read one line with echo and backspace handling.
    async fn read_line(&mut self) -> Result<String<LINE_CAPACITY>, TerminalError> {
        let mut line: String<LINE_CAPACITY> = String::new();
        loop {
            let b = self.io.read_byte().await?;
            match b {
                b'\r' | b'\n' => {
                    self.print("\r\n").await?;
                    return Ok(line);
                }
                0x08 | 0x7F => {
                    if line.pop().is_some() {
                        self.print("\x08 \x08").await?;
                    }
                }
                0x20..=0x7E => {
                    if line.push(char::from(b)).is_ok() {
                        self.put(b).await?;
                    } else {
                        self.put(0x07).await?;
                    }
                }
                _ => {}
            }
        }
    }

    async fn show(&mut self, s: &Settings) -> Result<(), TerminalError> {
        let m = &s.mouse;
        let k = &s.keyboard;
        self.print_fmt(format_args!(
            "firmware  {}.{}.{}",
            s.version.major, s.version.minor, s.version.revision
        ))
        .await?;
        self.print_fmt(format_args!(
            "travel    xy {}% x {}% y {}%",
            m.travel_xy, m.travel_x, m.travel_y
        ))
        .await?;
        let kind = match m.mouse_type {
            MouseType::TwoButton => "two",
            MouseType::ThreeButton => "three",
            MouseType::Wheel => "wheel",
        };
        self.print_fmt(format_args!(
            "mouse     {} @ {} 7N{}",
            kind,
            m.baud.bps(),
            if m.double_stop_bit { 2 } else { 1 }
        ))
        .await?;
        self.print_fmt(format_args!(
            "buttons   swap {} side {} swapside {}",
            on_off(m.swap_left_right),
            on_off(m.use_side_buttons),
            on_off(m.swap_side_buttons)
        ))
        .await?;
        self.print_fmt(format_args!(
            "invert    x {} y {}",
            on_off(m.invert_x),
            on_off(m.invert_y)
        ))
        .await?;
        let movement = match m.movement {
            MovementMode::Additive => "additive",
            MovementMode::Average => "average",
            MovementMode::Coast => "coast",
        };
        self.print_fmt(format_args!(
            "movement  {} cosine {} lang {}",
            movement,
            m.cosine.level(),
            m.language
        ))
        .await?;
        let kbd = match k.kind {
            KeyboardType::Xt => "xt",
            KeyboardType::At => "at",
        };
        let set = match k.code_set {
            CodeSetPreference::Auto => "auto",
            CodeSetPreference::Set1 => "1",
            CodeSetPreference::Set2 => "2",
            CodeSetPreference::Set3 => "3",
        };
        self.print_fmt(format_args!(
            "keyboard  {} xtclone {} codeset {}",
            kbd,
            on_off(k.xt_clone),
            set
        ))
        .await
    }

    /// Run the session until `save` or `exit`.
    pub async fn run(&mut self, current: &Settings) -> Result<TerminalExit, TerminalError> {
        let mut working = *current;

        self.println("").await?;
        self.println("USB to legacy adapter setup, type help").await?;

        loop {
            self.print(PROMPT).await?;
            let line = self.read_line().await?;
            match parse_command(&line) {
                Command::Help => {
                    for text in HELP {
                        self.println(text).await?;
                    }
                }
                Command::Show => self.show(&working).await?,
                Command::Set(field, value) => {
                    if apply_field(&mut working, field, value) {
                        self.println("ok").await?;
                    } else {
                        self.println("invalid field or value").await?;
                    }
                }
                Command::Defaults => {
                    let version = working.version;
                    let dip = working.dip;
                    working = Settings {
                        version,
                        dip,
                        ..Settings::DEFAULT
                    };
                    self.println("defaults loaded").await?;
                }
                Command::Save => {
                    self.println("saving...").await?;
                    return Ok(TerminalExit::Save(working));
                }
                Command::Exit => {
                    self.println("bye").await?;
                    return Ok(TerminalExit::Discard);
                }
                Command::Empty => {}
                Command::Unknown => self.println("unknown command, type help").await?,
            }
        }
    }

    /// Printed by the bus core once it is back up after a save.
    pub async fn announce_saved(&mut self) -> Result<(), TerminalError> {
        self.println("").await?;
        self.println("settings saved").await
    }
}

#[inline]
fn on_off(v: bool) -> &'static str {
    if v {
        "on"
    } else {
        "off"
    }
}
