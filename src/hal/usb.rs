//! USB Serial/JTAG transport for the host side of the bridge.

use esp_idf_svc::hal::delay::NON_BLOCK;
use esp_idf_svc::hal::usb_serial::UsbSerialDriver;

use crate::bridge::HostPort;

/// Host port over the built-in USB Serial/JTAG console.
///
/// The Serial/JTAG peripheral has no CDC break event, so
/// `SoftUart::signal_host_break` is never fired from here; it stays wired
/// for transports that report breaks.
pub struct UsbPort {
    driver: UsbSerialDriver<'static>,
}

impl UsbPort {
    pub fn new(driver: UsbSerialDriver<'static>) -> Self {
        Self { driver }
    }
}

impl HostPort for UsbPort {
    fn try_read(&mut self) -> Option<u8> {
        let mut buf = [0u8; 1];
        match self.driver.read(&mut buf, NON_BLOCK) {
            Ok(n) if n > 0 => Some(buf[0]),
            _ => None,
        }
    }

    fn write(&mut self, byte: u8) -> bool {
        matches!(self.driver.write(&[byte], NON_BLOCK), Ok(n) if n > 0)
    }
}
