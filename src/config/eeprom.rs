//! Byte-addressed settings storage.
//!
//! The settings area is modelled as a flat 1 KiB EEPROM. On hardware it is
//! backed by an NVS blob (see `hal::eeprom`); on the host it is a plain RAM
//! array. Out-of-range reads return the erased value and out-of-range
//! writes are dropped, matching how a real part at the end of its address
//! space behaves under a sloppy caller.

/// Size of the settings area in bytes.
pub const EEPROM_SIZE: usize = 1024;

/// Erased-cell value.
pub const ERASED: u8 = 0xFF;

/// Byte-level access to the settings area.
///
/// Multi-byte helpers have default implementations; backends override
/// `write_block` when batching writes is materially cheaper.
pub trait Eeprom {
    fn read_byte(&mut self, addr: u16) -> u8;
    fn write_byte(&mut self, addr: u16, value: u8);

    fn read_block(&mut self, addr: u16, buf: &mut [u8]) {
        for (i, slot) in buf.iter_mut().enumerate() {
            *slot = self.read_byte(addr.wrapping_add(i as u16));
        }
    }

    fn write_block(&mut self, addr: u16, data: &[u8]) {
        for (i, &byte) in data.iter().enumerate() {
            self.write_byte(addr.wrapping_add(i as u16), byte);
        }
    }

    /// Little-endian 16-bit read.
    fn read_u16(&mut self, addr: u16) -> u16 {
        let lo = self.read_byte(addr) as u16;
        let hi = self.read_byte(addr.wrapping_add(1)) as u16;
        lo | (hi << 8)
    }

    /// Little-endian 16-bit write.
    fn write_u16(&mut self, addr: u16, value: u16) {
        self.write_byte(addr, value as u8);
        self.write_byte(addr.wrapping_add(1), (value >> 8) as u8);
    }
}

/// In-memory settings area, starting fully erased. Used for host-side tests
/// and as the fallback when no persistent backend is available.
pub struct RamEeprom {
    data: [u8; EEPROM_SIZE],
}

impl RamEeprom {
    pub const fn new() -> Self {
        Self {
            data: [ERASED; EEPROM_SIZE],
        }
    }

    /// Raw view of the whole area, for inspection.
    pub fn data(&self) -> &[u8; EEPROM_SIZE] {
        &self.data
    }
}

impl Eeprom for RamEeprom {
    fn read_byte(&mut self, addr: u16) -> u8 {
        self.data.get(addr as usize).copied().unwrap_or(ERASED)
    }

    fn write_byte(&mut self, addr: u16, value: u8) {
        if let Some(slot) = self.data.get_mut(addr as usize) {
            *slot = value;
        }
    }
}

impl Default for RamEeprom {
    fn default() -> Self {
        Self::new()
    }
}
