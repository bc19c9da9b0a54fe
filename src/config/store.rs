//! Settings layout and the load/save/wipe logic on top of [`Eeprom`].

use crate::baud::DEFAULT_DIVISOR;
use crate::baudot::TranslationTable;
use crate::config::{BridgeConfig, ConfFlags, Eeprom, DEFAULT_FLAGS};

/// Marker proving the area holds a valid configuration. Written last during
/// a wipe so that a reset mid-wipe leaves the area invalid, not plausible.
pub const MAGIC: u16 = 0x4545;

/// Fixed addresses within the settings area.
///
/// ```text
/// 0x000  magic (u16 LE)
/// 0x002  flags (u8)
/// 0x004  divisor (u16 LE)
/// 0x006  table selector (u8)
/// 0x010  table slots: 7 x 64 bytes (letters page, then figures page)
/// 0x200  answerback message: length (u8), then up to 63 bytes
/// ```
pub mod layout {
    pub const MAGIC_ADDR: u16 = 0x000;
    pub const FLAGS_ADDR: u16 = 0x002;
    pub const DIVISOR_ADDR: u16 = 0x004;
    pub const TABLE_SELECT_ADDR: u16 = 0x006;

    pub const TABLES_ADDR: u16 = 0x010;
    pub const TABLE_STRIDE: u16 = 64;
    pub const NUM_TABLES: u8 = 7;

    pub const AUTOMSG_LEN_ADDR: u16 = 0x200;
    pub const AUTOMSG_DATA_ADDR: u16 = 0x201;
    pub const AUTOMSG_MAX: u8 = 63;

    /// A wipe erases only the settings header and the first table slot;
    /// the answerback message area deliberately survives.
    pub const WIPE_SPAN: u16 = 128;
}

/// What `boot` found in the settings area.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BootReport {
    /// Valid marker; settings loaded as stored.
    Loaded,
    /// Blank or damaged area; defaults written and loaded.
    Initialized,
}

/// Object-safe settings interface used by the bridge loop and the command
/// shell. Keeps the storage backend type parameter out of everything that
/// only wants to read and flip settings.
pub trait ConfigOps {
    /// The working configuration.
    fn config(&self) -> BridgeConfig;

    /// Bumped whenever table bytes or the selector may have changed, so
    /// cached copies know to re-read [`ConfigOps::active_table`].
    fn table_generation(&self) -> u32;

    /// The table bytes for the current selector.
    fn active_table(&mut self) -> TranslationTable;

    fn set_translate(&mut self, on: bool);
    fn set_crlf(&mut self, on: bool);
    fn set_autocr(&mut self, on: bool);
    fn set_usos(&mut self, on: bool);
    fn set_show_break(&mut self, on: bool);
    fn set_autoprint(&mut self, on: bool);

    /// Toggle 8-bit framing. Turning it on suppresses translation; turning
    /// it off restores translation to its persisted value.
    fn set_eight_bit(&mut self, on: bool);

    fn set_divisor(&mut self, divisor: u16);

    /// Select a table slot. Out-of-range selections fall back to slot 0;
    /// the effective slot is returned.
    fn set_table(&mut self, index: u8) -> u8;

    /// Persist the working configuration.
    fn save(&mut self);

    /// Replace the working configuration with the persisted one.
    fn load(&mut self);

    /// Reset the persisted settings to factory defaults. The working
    /// configuration is left alone; `load` afterwards picks up the
    /// defaults.
    fn wipe(&mut self);

    fn saved_flags(&mut self) -> ConfFlags;
    fn saved_divisor(&mut self) -> u16;
    fn saved_table(&mut self) -> u8;

    /// Raw byte access, for the dump and patch commands.
    fn read_raw(&mut self, addr: u16) -> u8;
    fn write_raw(&mut self, addr: u16, value: u8);

    /// Stored answerback message length, 0 when none is stored.
    fn automsg_len(&mut self) -> u8;
    fn automsg_byte(&mut self, index: u8) -> u8;

    /// Store a new answerback message. Text beyond
    /// [`layout::AUTOMSG_MAX`] bytes is truncated by the caller.
    fn set_automsg(&mut self, text: &[u8]);
}

/// Settings store over a concrete storage backend.
pub struct ConfigStore<E: Eeprom> {
    eeprom: E,
    config: BridgeConfig,
    generation: u32,
}

impl<E: Eeprom> ConfigStore<E> {
    pub fn new(eeprom: E) -> Self {
        Self {
            eeprom,
            config: BridgeConfig::default(),
            generation: 0,
        }
    }

    /// Validate the settings area and load it, initializing defaults first
    /// if the marker is missing.
    pub fn boot(&mut self) -> BootReport {
        let fresh = self.eeprom.read_u16(layout::MAGIC_ADDR) != MAGIC;
        if fresh {
            self.wipe();
        }
        self.load();
        if fresh {
            BootReport::Initialized
        } else {
            BootReport::Loaded
        }
    }

    /// Direct access to the backend, for inspection in tests.
    pub fn eeprom_mut(&mut self) -> &mut E {
        &mut self.eeprom
    }

    fn table_addr(index: u8) -> u16 {
        layout::TABLES_ADDR + index as u16 * layout::TABLE_STRIDE
    }
}

impl<E: Eeprom> ConfigOps for ConfigStore<E> {
    fn config(&self) -> BridgeConfig {
        self.config
    }

    fn table_generation(&self) -> u32 {
        self.generation
    }

    fn active_table(&mut self) -> TranslationTable {
        let mut bytes = [0u8; 64];
        self.eeprom
            .read_block(Self::table_addr(self.config.table), &mut bytes);
        TranslationTable::from_bytes(&bytes)
    }

    fn set_translate(&mut self, on: bool) {
        self.config.flags.set(ConfFlags::TRANSLATE, on);
    }

    fn set_crlf(&mut self, on: bool) {
        self.config.flags.set(ConfFlags::CRLF, on);
    }

    fn set_autocr(&mut self, on: bool) {
        self.config.flags.set(ConfFlags::AUTOCR, on);
    }

    fn set_usos(&mut self, on: bool) {
        self.config.flags.set(ConfFlags::USOS, on);
    }

    fn set_show_break(&mut self, on: bool) {
        self.config.flags.set(ConfFlags::SHOW_BREAK, on);
    }

    fn set_autoprint(&mut self, on: bool) {
        self.config.flags.set(ConfFlags::AUTOPRINT, on);
    }

    fn set_eight_bit(&mut self, on: bool) {
        self.config.flags.set(ConfFlags::EIGHT_BIT, on);
        if on {
            self.config.flags.set(ConfFlags::TRANSLATE, false);
        } else {
            // restore from the persisted value, not whatever the working
            // copy held before the 8-bit excursion
            let saved = self.saved_flags();
            self.config.flags.set(ConfFlags::TRANSLATE, saved.translate());
        }
    }

    fn set_divisor(&mut self, divisor: u16) {
        self.config.divisor = if divisor == 0 { DEFAULT_DIVISOR } else { divisor };
    }

    fn set_table(&mut self, index: u8) -> u8 {
        let effective = if index >= layout::NUM_TABLES { 0 } else { index };
        self.config.table = effective;
        self.generation = self.generation.wrapping_add(1);
        effective
    }

    fn save(&mut self) {
        self.eeprom
            .write_byte(layout::FLAGS_ADDR, self.config.flags.bits());
        self.eeprom.write_u16(layout::DIVISOR_ADDR, self.config.divisor);
        self.eeprom
            .write_byte(layout::TABLE_SELECT_ADDR, self.config.table);
    }

    fn load(&mut self) {
        self.config.flags = ConfFlags::from_bits(self.eeprom.read_byte(layout::FLAGS_ADDR));
        let divisor = self.eeprom.read_u16(layout::DIVISOR_ADDR);
        self.config.divisor = if divisor == 0 { DEFAULT_DIVISOR } else { divisor };
        let table = self.eeprom.read_byte(layout::TABLE_SELECT_ADDR);
        self.config.table = if table >= layout::NUM_TABLES { 0 } else { table };
        self.generation = self.generation.wrapping_add(1);
    }

    fn wipe(&mut self) {
        let blank = [crate::config::eeprom::ERASED; layout::WIPE_SPAN as usize];
        self.eeprom.write_block(0, &blank);
        self.eeprom.write_u16(layout::DIVISOR_ADDR, DEFAULT_DIVISOR);
        self.eeprom.write_byte(layout::FLAGS_ADDR, DEFAULT_FLAGS.bits());
        self.eeprom
            .write_block(Self::table_addr(0), &TranslationTable::CANONICAL.to_bytes());
        self.eeprom.write_byte(layout::TABLE_SELECT_ADDR, 0);
        // marker goes in last
        self.eeprom.write_u16(layout::MAGIC_ADDR, MAGIC);
        self.generation = self.generation.wrapping_add(1);
    }

    fn saved_flags(&mut self) -> ConfFlags {
        ConfFlags::from_bits(self.eeprom.read_byte(layout::FLAGS_ADDR))
    }

    fn saved_divisor(&mut self) -> u16 {
        self.eeprom.read_u16(layout::DIVISOR_ADDR)
    }

    fn saved_table(&mut self) -> u8 {
        self.eeprom.read_byte(layout::TABLE_SELECT_ADDR)
    }

    fn read_raw(&mut self, addr: u16) -> u8 {
        self.eeprom.read_byte(addr)
    }

    fn write_raw(&mut self, addr: u16, value: u8) {
        self.eeprom.write_byte(addr, value);
        // the patch may have touched table bytes
        self.generation = self.generation.wrapping_add(1);
    }

    fn automsg_len(&mut self) -> u8 {
        let len = self.eeprom.read_byte(layout::AUTOMSG_LEN_ADDR);
        if len == 0 || len > layout::AUTOMSG_MAX {
            0
        } else {
            len
        }
    }

    fn automsg_byte(&mut self, index: u8) -> u8 {
        self.eeprom
            .read_byte(layout::AUTOMSG_DATA_ADDR + index as u16)
    }

    fn set_automsg(&mut self, text: &[u8]) {
        let len = text.len().min(layout::AUTOMSG_MAX as usize);
        self.eeprom.write_byte(layout::AUTOMSG_LEN_ADDR, len as u8);
        self.eeprom.write_block(layout::AUTOMSG_DATA_ADDR, &text[..len]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RamEeprom;

    fn blank_store() -> ConfigStore<RamEeprom> {
        ConfigStore::new(RamEeprom::new())
    }

    #[test]
    fn test_boot_initializes_blank_area() {
        let mut store = blank_store();
        assert_eq!(store.boot(), BootReport::Initialized);
        let config = store.config();
        assert_eq!(config.divisor, DEFAULT_DIVISOR);
        assert!(config.flags.translate());
        assert!(config.flags.crlf());
        assert_eq!(config.table, 0);
        assert_eq!(store.eeprom_mut().read_u16(layout::MAGIC_ADDR), MAGIC);
    }

    #[test]
    fn test_boot_keeps_valid_settings() {
        let mut store = blank_store();
        store.boot();
        store.set_usos(true);
        store.set_divisor(1833);
        store.save();
        // simulate a power cycle over the same storage
        let ee_image = *store.eeprom_mut().data();
        let mut ee = RamEeprom::new();
        for (addr, &byte) in ee_image.iter().enumerate() {
            ee.write_byte(addr as u16, byte);
        }
        let mut store = ConfigStore::new(ee);
        assert_eq!(store.boot(), BootReport::Loaded);
        assert!(store.config().flags.usos());
        assert_eq!(store.config().divisor, 1833);
    }

    #[test]
    fn test_wipe_installs_canonical_table() {
        let mut store = blank_store();
        store.wipe();
        store.load();
        let table = store.active_table();
        assert_eq!(table, crate::baudot::TranslationTable::CANONICAL);
    }

    #[test]
    fn test_toggles_are_ram_only_until_save() {
        let mut store = blank_store();
        store.boot();
        store.set_translate(false);
        assert!(!store.config().flags.translate());
        assert!(store.saved_flags().translate());
        store.save();
        assert!(!store.saved_flags().translate());
    }

    #[test]
    fn test_eight_bit_suppresses_translate() {
        let mut store = blank_store();
        store.boot();
        store.set_eight_bit(true);
        assert!(store.config().flags.eight_bit());
        assert!(!store.config().flags.translate());
        store.set_eight_bit(false);
        // persisted flags still say translate, so it comes back
        assert!(store.config().flags.translate());
    }

    #[test]
    fn test_eight_bit_restore_honors_saved_state() {
        let mut store = blank_store();
        store.boot();
        store.set_translate(false);
        store.save();
        store.set_translate(true); // unsaved experiment
        store.set_eight_bit(true);
        store.set_eight_bit(false);
        assert!(!store.config().flags.translate());
    }

    #[test]
    fn test_zero_divisor_falls_back() {
        let mut store = blank_store();
        store.boot();
        store.eeprom_mut().write_u16(layout::DIVISOR_ADDR, 0);
        store.load();
        assert_eq!(store.config().divisor, DEFAULT_DIVISOR);
        store.set_divisor(0);
        assert_eq!(store.config().divisor, DEFAULT_DIVISOR);
    }

    #[test]
    fn test_table_selector_clamps() {
        let mut store = blank_store();
        store.boot();
        assert_eq!(store.set_table(6), 6);
        assert_eq!(store.set_table(7), 0);
        store.eeprom_mut().write_byte(layout::TABLE_SELECT_ADDR, 9);
        store.load();
        assert_eq!(store.config().table, 0);
    }

    #[test]
    fn test_generation_tracks_table_changes() {
        let mut store = blank_store();
        store.boot();
        let gen = store.table_generation();
        store.set_table(1);
        assert_ne!(store.table_generation(), gen);
        let gen = store.table_generation();
        store.write_raw(layout::TABLES_ADDR, b'X');
        assert_ne!(store.table_generation(), gen);
    }

    #[test]
    fn test_automsg_round_trip() {
        let mut store = blank_store();
        store.boot();
        assert_eq!(store.automsg_len(), 0);
        store.set_automsg(b"QTH HERE");
        assert_eq!(store.automsg_len(), 8);
        let text: Vec<u8> = (0..8).map(|i| store.automsg_byte(i)).collect();
        assert_eq!(&text, b"QTH HERE");
    }

    #[test]
    fn test_automsg_survives_wipe() {
        let mut store = blank_store();
        store.boot();
        store.set_automsg(b"RYRY");
        store.wipe();
        assert_eq!(store.automsg_len(), 4);
        assert_eq!(store.automsg_byte(0), b'R');
    }

    #[test]
    fn test_erased_automsg_reads_as_none() {
        let mut store = blank_store();
        store.boot();
        // erased length byte is 0xFF
        assert_eq!(
            store.eeprom_mut().read_byte(layout::AUTOMSG_LEN_ADDR),
            crate::config::eeprom::ERASED
        );
        assert_eq!(store.automsg_len(), 0);
    }
}
