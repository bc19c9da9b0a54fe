//! Hardware Abstraction Layer for the TTY bridge.
//!
//! Thin wrappers around ESP-IDF peripherals.
//! Business logic stays in core modules, HAL is just I/O.

pub mod pins;

#[cfg(target_os = "espidf")]
pub mod eeprom;
#[cfg(target_os = "espidf")]
pub mod gpio;
#[cfg(target_os = "espidf")]
pub mod usb;

#[cfg(target_os = "espidf")]
pub use eeprom::NvsEeprom;
#[cfg(target_os = "espidf")]
pub use gpio::{ControlInputs, RelayPins};
#[cfg(target_os = "espidf")]
pub use usb::UsbPort;
