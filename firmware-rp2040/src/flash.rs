//! Settings partition on the on-board QSPI flash.

use core::cell::RefCell;

use embassy_embedded_hal::flash::partition::BlockingPartition;
use embassy_rp::flash::{Blocking, Flash};
use embassy_rp::peripherals::FLASH;
use embassy_rp::Peri;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use legacy_core::SettingsStore;
use static_cell::StaticCell;

pub const FLASH_SIZE: usize = 2 * 1024 * 1024;
/// Start of the settings region, right after the firmware image (see `memory.x`).
pub const SETTINGS_OFFSET: u32 = 384 * 1024;
pub const SETTINGS_SIZE: u32 = 64 * 1024;

pub type OnboardFlash = Flash<'static, FLASH, Blocking, FLASH_SIZE>;
pub type SettingsPartition = BlockingPartition<'static, CriticalSectionRawMutex, OnboardFlash>;

static FLASH_CELL: StaticCell<Mutex<CriticalSectionRawMutex, RefCell<OnboardFlash>>> =
    StaticCell::new();

/// Open the settings store. Call once.
pub fn settings_store(flash: Peri<'static, FLASH>) -> SettingsStore<SettingsPartition> {
    let flash = FLASH_CELL.init(Mutex::new(RefCell::new(Flash::new_blocking(flash))));
    SettingsStore::new(BlockingPartition::new(flash, SETTINGS_OFFSET, SETTINGS_SIZE))
}
