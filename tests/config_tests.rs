//! Config store tests against a RAM backend

use rust_baudot_bridge::baudot::TranslationTable;
use rust_baudot_bridge::config::eeprom::ERASED;
use rust_baudot_bridge::config::store::{layout, MAGIC};
use rust_baudot_bridge::config::{BootReport, ConfigOps, ConfigStore, Eeprom, RamEeprom};

#[test]
fn test_factory_defaults_shape() {
    let mut store = ConfigStore::new(RamEeprom::new());
    assert_eq!(store.boot(), BootReport::Initialized);

    let config = store.config();
    assert_eq!(config.flags.bits(), 0x03, "translate + crlf only");
    assert_eq!(config.divisor, 1667);
    assert_eq!(config.table, 0);
    assert_eq!(store.automsg_len(), 0);
    assert_eq!(store.active_table(), TranslationTable::CANONICAL);

    // Only slot 0 is populated; the others stay erased.
    assert_eq!(store.read_raw(layout::TABLES_ADDR + layout::TABLE_STRIDE), ERASED);
}

#[test]
fn test_wipe_erases_first_and_writes_marker_last() {
    let mut store = ConfigStore::new(TracingEeprom::new());
    store.wipe();

    let writes = &store.eeprom_mut().writes;
    assert!(writes.len() > 4);
    // The blank pass starts at the marker, invalidating it before anything
    // else changes.
    assert_eq!(writes[0], layout::MAGIC_ADDR);
    // The marker bytes are the very last thing written.
    assert_eq!(
        &writes[writes.len() - 2..],
        &[layout::MAGIC_ADDR, layout::MAGIC_ADDR + 1]
    );

    assert_eq!(store.eeprom_mut().inner.read_u16(layout::MAGIC_ADDR), MAGIC);
}

#[test]
fn test_power_cycle_preserves_saved_state() {
    let mut store = ConfigStore::new(RamEeprom::new());
    store.boot();

    store.set_usos(true);
    store.set_show_break(true);
    store.set_divisor(1123);
    store.set_table(2);
    store.save();
    store.set_automsg(b"TEST DE ADAPTER");
    // table slot 2 gets one recognizable byte
    store.write_raw(layout::TABLES_ADDR + 2 * layout::TABLE_STRIDE, b'E');

    let mut store = ConfigStore::new(copy_of(store.eeprom_mut()));
    assert_eq!(store.boot(), BootReport::Loaded);

    let config = store.config();
    assert!(config.flags.usos());
    assert!(config.flags.show_break());
    assert!(config.flags.translate(), "defaults keep riding along");
    assert_eq!(config.divisor, 1123);
    assert_eq!(config.table, 2);
    assert_eq!(store.automsg_len(), 15);
    assert_eq!(store.automsg_byte(0), b'T');
    assert_eq!(store.active_table().letters[0], b'E');
}

#[test]
fn test_damaged_marker_restores_defaults() {
    let mut store = ConfigStore::new(RamEeprom::new());
    store.boot();
    store.set_divisor(757);
    store.save();

    // A wipe that died after the blank pass leaves no marker.
    store.write_raw(layout::MAGIC_ADDR, ERASED);
    store.write_raw(layout::MAGIC_ADDR + 1, ERASED);

    let mut store = ConfigStore::new(copy_of(store.eeprom_mut()));
    assert_eq!(store.boot(), BootReport::Initialized);
    assert_eq!(store.config().divisor, 1667);
}

#[test]
fn test_usable_through_trait_object() {
    let mut concrete = ConfigStore::new(RamEeprom::new());
    concrete.boot();

    let store: &mut dyn ConfigOps = &mut concrete;
    store.set_autocr(true);
    store.save();
    assert!(store.saved_flags().autocr());
    assert_eq!(store.set_table(9), 0);
}

fn copy_of(source: &mut RamEeprom) -> RamEeprom {
    let image = *source.data();
    let mut copy = RamEeprom::new();
    for (addr, &byte) in image.iter().enumerate() {
        copy.write_byte(addr as u16, byte);
    }
    copy
}

// Records the address order of every byte written.
struct TracingEeprom {
    inner: RamEeprom,
    writes: Vec<u16>,
}

impl TracingEeprom {
    fn new() -> Self {
        Self {
            inner: RamEeprom::new(),
            writes: Vec::new(),
        }
    }
}

impl Eeprom for TracingEeprom {
    fn read_byte(&mut self, addr: u16) -> u8 {
        self.inner.read_byte(addr)
    }

    fn write_byte(&mut self, addr: u16, value: u8) {
        self.writes.push(addr);
        self.inner.write_byte(addr, value);
    }
}
