//! EEPROM emulation over a single NVS blob.
//!
//! The whole 1 KiB image lives in RAM and is rewritten to flash on change.
//! NVS replaces the blob atomically, so a power loss mid-wipe leaves either
//! the old image or a magicless partial one and the next boot re-wipes.

use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};
use esp_idf_svc::sys::EspError;

use crate::config::eeprom::{Eeprom, ERASED};
use crate::config::EEPROM_SIZE;

/// NVS namespace holding the adapter state.
pub const NVS_NAMESPACE: &str = "ttybridge";

const BLOB_KEY: &str = "eeprom";

pub struct NvsEeprom {
    nvs: EspNvs<NvsDefault>,
    cache: [u8; EEPROM_SIZE],
}

impl NvsEeprom {
    /// Opens the namespace and loads the stored image, erased where absent.
    pub fn new(partition: EspDefaultNvsPartition) -> Result<Self, EspError> {
        let nvs = EspNvs::new(partition, NVS_NAMESPACE, true)?;
        let mut cache = [ERASED; EEPROM_SIZE];
        let mut buf = [0u8; EEPROM_SIZE];
        if let Some(stored) = nvs.get_blob(BLOB_KEY, &mut buf)? {
            cache[..stored.len()].copy_from_slice(stored);
        }
        Ok(Self { nvs, cache })
    }

    fn flush(&mut self) {
        // On a failed flash write the RAM image stays authoritative and the
        // next write retries the whole blob.
        let _ = self.nvs.set_blob(BLOB_KEY, &self.cache);
    }
}

impl Eeprom for NvsEeprom {
    fn read_byte(&mut self, addr: u16) -> u8 {
        match self.cache.get(addr as usize) {
            Some(&b) => b,
            None => ERASED,
        }
    }

    fn write_byte(&mut self, addr: u16, value: u8) {
        if let Some(cell) = self.cache.get_mut(addr as usize) {
            if *cell != value {
                *cell = value;
                self.flush();
            }
        }
    }

    // One flash rewrite per block instead of one per byte.
    fn write_block(&mut self, addr: u16, data: &[u8]) {
        let mut dirty = false;
        for (i, &value) in data.iter().enumerate() {
            let cell_addr = addr.wrapping_add(i as u16) as usize;
            if let Some(cell) = self.cache.get_mut(cell_addr) {
                if *cell != value {
                    *cell = value;
                    dirty = true;
                }
            }
        }
        if dirty {
            self.flush();
        }
    }
}
