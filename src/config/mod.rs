//! Adapter configuration: flags, line divisor, translation tables.
//!
//! Settings live in a byte-addressed area ([`eeprom`]) with a fixed layout
//! ([`store::layout`]) guarded by a magic marker; a blank or corrupted area
//! is re-initialized to defaults on boot. The in-RAM working copy and the
//! persisted copy are distinct: toggles edit the working copy and `save`
//! writes it back, so experiments are free until saved.

pub mod eeprom;
pub mod store;

pub use eeprom::{Eeprom, RamEeprom, EEPROM_SIZE};
pub use store::{BootReport, ConfigOps, ConfigStore};

/// Behavior flags, stored as one byte.
///
/// `TRANSLATE` and `EIGHT_BIT` are mutually exclusive: an 8-bit machine is
/// by definition not a 5-level Baudot machine. The setters in
/// [`store::ConfigStore`] enforce that.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct ConfFlags(u8);

impl ConfFlags {
    /// ASCII/Baudot translation (off = transparent passthrough).
    pub const TRANSLATE: u8 = 0x01;
    /// Expand a lone CR or LF from the host into CR LF.
    pub const CRLF: u8 = 0x02;
    /// Inject CR LF when the output column reaches the carriage width.
    pub const AUTOCR: u8 = 0x04;
    /// Unshift on space, both directions.
    pub const USOS: u8 = 0x08;
    /// Report loop break events to the host.
    pub const SHOW_BREAK: u8 = 0x10;
    /// 8N1 framing for ASCII machines instead of 5N2.
    pub const EIGHT_BIT: u8 = 0x20;
    /// Answer a loop break with the stored message instead of `[BREAK]`.
    pub const AUTOPRINT: u8 = 0x40;

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, mask: u8) -> bool {
        self.0 & mask != 0
    }

    pub fn set(&mut self, mask: u8, on: bool) {
        if on {
            self.0 |= mask;
        } else {
            self.0 &= !mask;
        }
    }

    pub const fn translate(self) -> bool {
        self.contains(Self::TRANSLATE)
    }

    pub const fn crlf(self) -> bool {
        self.contains(Self::CRLF)
    }

    pub const fn autocr(self) -> bool {
        self.contains(Self::AUTOCR)
    }

    pub const fn usos(self) -> bool {
        self.contains(Self::USOS)
    }

    pub const fn show_break(self) -> bool {
        self.contains(Self::SHOW_BREAK)
    }

    pub const fn eight_bit(self) -> bool {
        self.contains(Self::EIGHT_BIT)
    }

    pub const fn autoprint(self) -> bool {
        self.contains(Self::AUTOPRINT)
    }
}

/// Factory defaults: translate with CRLF expansion, everything else off.
pub const DEFAULT_FLAGS: ConfFlags = ConfFlags::from_bits(ConfFlags::TRANSLATE | ConfFlags::CRLF);

/// The working configuration, as the bridge loop consumes it.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct BridgeConfig {
    pub flags: ConfFlags,
    pub divisor: u16,
    /// Active translation table slot, 0..=6.
    pub table: u8,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            flags: DEFAULT_FLAGS,
            divisor: crate::baud::DEFAULT_DIVISOR,
            table: 0,
        }
    }
}
