//! DIP switch bank with per-group debounce.
//!
//! The first edge on any switch of a group arms a 1.5 s timer for that
//! group; further edges while it is armed are folded into the same change.
//! When the timer expires the live switch state is sent to the poll core.

use defmt::info;
use embassy_futures::select::{select, select_array, Either};
use embassy_rp::gpio::{Input, Pull};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Sender};
use embassy_time::{Duration, Instant, Timer};
use legacy_core::settings::{DipGroup, DipSwitches};

use crate::board::DipPins;

pub const DEBOUNCE: Duration = Duration::from_millis(1500);
/// Wait after configuring the pull-ups before the first read.
pub const SETTLE: Duration = Duration::from_millis(20);

pub const DIP_CHANGE_DEPTH: usize = 4;

/// A debounced change of one switch group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, defmt::Format)]
pub struct DipChange {
    pub group: DipGroup,
    pub live: DipSwitches,
}

pub type DipChannel = Channel<CriticalSectionRawMutex, DipChange, DIP_CHANGE_DEPTH>;

const GROUP_OF_PIN: [DipGroup; 6] = [
    DipGroup::MouseType,
    DipGroup::MouseType,
    DipGroup::Speed,
    DipGroup::Speed,
    DipGroup::Format,
    DipGroup::Baud,
];

pub struct DipSwitchBank {
    pins: [Input<'static>; 6],
}

impl DipSwitchBank {
    pub fn new(pins: DipPins) -> Self {
        Self {
            pins: [
                Input::new(pins.three_button, Pull::Up),
                Input::new(pins.wheel, Pull::Up),
                Input::new(pins.speed_75, Pull::Up),
                Input::new(pins.speed_50, Pull::Up),
                Input::new(pins.two_stop_bits, Pull::Up),
                Input::new(pins.baud_19200, Pull::Up),
            ],
        }
    }

    pub fn read(&mut self) -> DipSwitches {
        let [three_button, wheel, speed_75, speed_50, two_stop_bits, baud_19200] = &self.pins;
        DipSwitches {
            three_button: three_button.is_high(),
            wheel: wheel.is_high(),
            speed_75: speed_75.is_high(),
            speed_50: speed_50.is_high(),
            two_stop_bits: two_stop_bits.is_high(),
            baud_19200: baud_19200.is_high(),
        }
    }

    async fn next_edge(&mut self) -> DipGroup {
        let [a, b, c, d, e, f] = &mut self.pins;
        let ((), index) = select_array([
            a.wait_for_any_edge(),
            b.wait_for_any_edge(),
            c.wait_for_any_edge(),
            d.wait_for_any_edge(),
            e.wait_for_any_edge(),
            f.wait_for_any_edge(),
        ])
        .await;
        GROUP_OF_PIN[index]
    }

    pub async fn run(mut self, changes: Sender<'static, CriticalSectionRawMutex, DipChange, DIP_CHANGE_DEPTH>) -> ! {
        let mut armed: [Option<Instant>; 4] = [None; 4];
        loop {
            let due = armed.iter().flatten().min().copied().unwrap_or(Instant::MAX);
            match select(self.next_edge(), Timer::at(due)).await {
                Either::First(group) => {
                    let slot = &mut armed[group as usize];
                    if slot.is_none() {
                        *slot = Some(Instant::now() + DEBOUNCE);
                    }
                }
                Either::Second(()) => {
                    let now = Instant::now();
                    let live = self.read();
                    for group in DipGroup::ALL {
                        let slot = &mut armed[group as usize];
                        if slot.is_some_and(|at| at <= now) {
                            *slot = None;
                            info!("dip switches changed: {}", group);
                            changes.send(DipChange { group, live }).await;
                        }
                    }
                }
            }
        }
    }
}
