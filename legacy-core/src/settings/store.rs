//! Wear-levelled settings pages in a dedicated flash region.
//!
//! Each save programs the next blank page; the live record is the page
//! before the first blank one. When the region is full it is erased and
//! writing starts over at page 0.

use embedded_storage::nor_flash::NorFlash;

use crate::settings::record::{self, StoredRecord, ERASED, PAGE_SIZE};
use crate::settings::{FirmwareVersion, Settings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StoreError {
    /// The flash driver reported an error.
    Flash,
}

/// Result of [`SettingsStore::load_or_default`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LoadOutcome {
    /// A usable record was found. `upgraded` is set when only the stored
    /// version number was bumped and saved.
    Loaded { settings: Settings, upgraded: bool },
    /// Defaults were written; the caller must reboot before using them.
    DefaultsWritten(Settings),
}

/// Settings store over a flash region. Offsets are relative to the region.
pub struct SettingsStore<F> {
    flash: F,
}

impl<F: NorFlash> SettingsStore<F> {
    pub fn new(flash: F) -> Self {
        Self { flash }
    }

    pub fn into_inner(self) -> F {
        self.flash
    }

    #[inline]
    fn page_count(&self) -> usize {
        self.flash.capacity() / PAGE_SIZE
    }

    /// Index of the first page whose first byte is erased, `None` if every page is used.
    pub fn find_empty_page(&mut self) -> Result<Option<usize>, StoreError> {
        let mut marker = [0u8; 1];
        for page in 0..self.page_count() {
            self.flash
                .read((page * PAGE_SIZE) as u32, &mut marker)
                .map_err(|_| StoreError::Flash)?;
            if marker[0] == ERASED {
                return Ok(Some(page));
            }
        }
        Ok(None)
    }

    /// Read the live record. A blank region yields a blank record.
    pub fn load(&mut self) -> Result<StoredRecord, StoreError> {
        let page = match self.find_empty_page()? {
            Some(0) => 0,
            Some(n) => n - 1,
            None => self.page_count().saturating_sub(1),
        };

        let mut buf = [0u8; PAGE_SIZE];
        self.flash
            .read((page * PAGE_SIZE) as u32, &mut buf)
            .map_err(|_| StoreError::Flash)?;
        Ok(record::decode(&buf))
    }

    /// Program `settings` into the next free page.
    pub fn save(&mut self, settings: &Settings) -> Result<(), StoreError> {
        let page = match self.find_empty_page()? {
            Some(0) | None => {
                let capacity = self.flash.capacity() as u32;
                self.flash
                    .erase(0, capacity)
                    .map_err(|_| StoreError::Flash)?;
                0
            }
            Some(n) => n,
        };

        let buf = record::encode(settings);
        self.flash
            .write((page * PAGE_SIZE) as u32, &buf)
            .map_err(|_| StoreError::Flash)
    }

    /// Load the stored settings, writing defaults on first run or when the
    /// running firmware revision is newer than the stored one.
    pub fn load_or_default(&mut self, running: FirmwareVersion) -> Result<LoadOutcome, StoreError> {
        let rec = self.load()?;
        let stored = rec.settings.version;

        if rec.is_blank() || running.revision > stored.revision {
            let defaults = Settings {
                version: running,
                ..Settings::DEFAULT
            };
            self.save(&defaults)?;
            return Ok(LoadOutcome::DefaultsWritten(defaults));
        }

        let mut settings = rec.settings;
        if running.major > stored.major || running.minor > stored.minor {
            settings.version.major = running.major;
            settings.version.minor = running.minor;
            self.save(&settings)?;
            return Ok(LoadOutcome::Loaded {
                settings,
                upgraded: true,
            });
        }

        Ok(LoadOutcome::Loaded {
            settings,
            upgraded: false,
        })
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::types::{BaudRate, MouseType};
    use embedded_storage::nor_flash::{ErrorType, NorFlashErrorKind, ReadNorFlash};
    use std::vec;
    use std::vec::Vec;

    const REGION: usize = 64 * 1024;

    struct MemFlash {
        data: Vec<u8>,
        erases: usize,
        fail: bool,
    }

    impl MemFlash {
        fn new() -> Self {
            Self {
                data: vec![ERASED; REGION],
                erases: 0,
                fail: false,
            }
        }
    }

    impl ErrorType for MemFlash {
        type Error = NorFlashErrorKind;
    }

    impl ReadNorFlash for MemFlash {
        const READ_SIZE: usize = 1;

        fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
            if self.fail {
                return Err(NorFlashErrorKind::Other);
            }
            let start = offset as usize;
            let end = start + bytes.len();
            if end > self.data.len() {
                return Err(NorFlashErrorKind::OutOfBounds);
            }
            bytes.copy_from_slice(&self.data[start..end]);
            Ok(())
        }

        fn capacity(&self) -> usize {
            self.data.len()
        }
    }

    impl NorFlash for MemFlash {
        const WRITE_SIZE: usize = 1;
        const ERASE_SIZE: usize = 4096;

        fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
            self.erases += 1;
            for b in &mut self.data[from as usize..to as usize] {
                *b = ERASED;
            }
            Ok(())
        }

        fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
            let start = offset as usize;
            for (dst, src) in self.data[start..start + bytes.len()].iter_mut().zip(bytes) {
                // NOR programming can only clear bits
                *dst &= *src;
            }
            Ok(())
        }
    }

    fn custom() -> Settings {
        let mut s = Settings::DEFAULT;
        s.mouse.baud = BaudRate::B4800;
        s.mouse.mouse_type = MouseType::ThreeButton;
        s.mouse.travel_y = 180;
        s.keyboard.xt_clone = false;
        s
    }

    #[test]
    fn test_first_boot_writes_defaults_once() {
        let mut store = SettingsStore::new(MemFlash::new());
        let running = crate::settings::FIRMWARE_VERSION;

        let first = store.load_or_default(running).unwrap();
        assert_eq!(first, LoadOutcome::DefaultsWritten(Settings::DEFAULT));

        // after the reboot the record is there
        let second = store.load_or_default(running).unwrap();
        assert_eq!(
            second,
            LoadOutcome::Loaded {
                settings: Settings::DEFAULT,
                upgraded: false,
            }
        );
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let mut store = SettingsStore::new(MemFlash::new());
        store.save(&Settings::DEFAULT).unwrap();
        store.save(&custom()).unwrap();

        assert_eq!(store.find_empty_page().unwrap(), Some(2));
        assert_eq!(store.load().unwrap().settings, custom());
    }

    #[test]
    fn test_full_region_wraps() {
        let mut store = SettingsStore::new(MemFlash::new());
        let pages = REGION / PAGE_SIZE;
        for _ in 0..pages {
            store.save(&Settings::DEFAULT).unwrap();
        }
        assert_eq!(store.find_empty_page().unwrap(), None);
        // with no blank page the last one is live
        assert_eq!(store.load().unwrap().settings, Settings::DEFAULT);

        store.save(&custom()).unwrap();
        assert_eq!(store.find_empty_page().unwrap(), Some(1));
        assert_eq!(store.load().unwrap().settings, custom());
        // one erase for the first save, one for the wrap
        assert_eq!(store.into_inner().erases, 2);
    }

    #[test]
    fn test_newer_revision_resets_to_defaults() {
        let mut store = SettingsStore::new(MemFlash::new());
        let mut old = custom();
        old.version = FirmwareVersion::new(1, 2, 0);
        store.save(&old).unwrap();

        let running = FirmwareVersion::new(1, 2, 1);
        match store.load_or_default(running).unwrap() {
            LoadOutcome::DefaultsWritten(s) => {
                assert_eq!(s.version, running);
                assert_eq!(s.mouse, Settings::DEFAULT.mouse);
            }
            other => panic!("expected defaults, got {other:?}"),
        }
    }

    #[test]
    fn test_newer_minor_keeps_settings() {
        let mut store = SettingsStore::new(MemFlash::new());
        let mut old = custom();
        old.version = FirmwareVersion::new(1, 1, 0);
        store.save(&old).unwrap();

        let running = FirmwareVersion::new(1, 2, 0);
        let LoadOutcome::Loaded { settings, upgraded } = store.load_or_default(running).unwrap() else {
            panic!("expected loaded settings");
        };
        assert!(upgraded);
        assert_eq!(settings.version, running);
        assert_eq!(settings.mouse, custom().mouse);
        assert_eq!(store.load().unwrap().settings.version, running);
    }

    #[test]
    fn test_flash_error_surfaces() {
        let mut flash = MemFlash::new();
        flash.fail = true;
        let mut store = SettingsStore::new(flash);
        assert_eq!(store.load(), Err(StoreError::Flash));
    }
}
