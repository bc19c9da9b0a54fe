//! Firmware entry point: hardware bring-up and the bridge polling loop.
//!
//! Boot order:
//! 1. Load the persisted configuration from NVS (a fresh part is wiped to
//!    defaults first).
//! 2. Program the soft UART divisor and data width from it.
//! 3. Start the bit-clock timer sampling the loop RX pin and driving the
//!    loop TX pin.
//! 4. Open the USB Serial/JTAG port and the control/relay GPIOs.
//! 5. Poll the bridge forever, applying relay outputs and retiming the bit
//!    clock when the console changes the baud rate.
//!
//! Debug logging drains to the IDF console UART, leaving the USB port
//! entirely to the bridge.

#[cfg(target_os = "espidf")]
use core::time::Duration;

#[cfg(target_os = "espidf")]
use esp_idf_svc::hal::delay::FreeRtos;
#[cfg(target_os = "espidf")]
use esp_idf_svc::hal::gpio::{AnyIOPin, PinDriver, Pull};
#[cfg(target_os = "espidf")]
use esp_idf_svc::hal::peripherals::Peripherals;
#[cfg(target_os = "espidf")]
use esp_idf_svc::hal::usb_serial::{UsbSerialConfig, UsbSerialDriver};
#[cfg(target_os = "espidf")]
use esp_idf_svc::nvs::EspDefaultNvsPartition;
#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::{esp_timer_get_time, EspError};
#[cfg(target_os = "espidf")]
use esp_idf_svc::timer::EspTaskTimerService;

#[cfg(target_os = "espidf")]
use rust_baudot_bridge::bridge::Bridge;
#[cfg(target_os = "espidf")]
use rust_baudot_bridge::config::{BootReport, ConfigOps, ConfigStore};
#[cfg(target_os = "espidf")]
use rust_baudot_bridge::console::VERSION;
#[cfg(target_os = "espidf")]
use rust_baudot_bridge::hal::{pins, ControlInputs, NvsEeprom, RelayPins, UsbPort};
#[cfg(target_os = "espidf")]
use rust_baudot_bridge::log_globals::LOG_STREAM;
#[cfg(target_os = "espidf")]
use rust_baudot_bridge::softuart::{DataBits, SoftUart};

// Shared between the bridge task and the bit-clock timer callback. All
// cross-context state inside is atomic.
#[cfg(target_os = "espidf")]
static SOFTUART: SoftUart = SoftUart::new();

#[cfg(target_os = "espidf")]
fn main() -> Result<(), EspError> {
    esp_idf_svc::sys::link_patches();

    let peripherals = Peripherals::take()?;

    let partition = EspDefaultNvsPartition::take()?;
    let eeprom = NvsEeprom::new(partition)?;
    let mut store = ConfigStore::new(eeprom);
    match store.boot() {
        BootReport::Loaded => println!("{}: config loaded", VERSION),
        BootReport::Initialized => println!("{}: blank config, wrote defaults", VERSION),
    }

    SOFTUART.set_divisor(store.config().divisor);
    SOFTUART.set_data_bits(if store.config().flags.eight_bit() {
        DataBits::Eight
    } else {
        DataBits::Five
    });

    // SAFETY: the loop pins are claimed here and nowhere else.
    let mut rx_pin = PinDriver::input(unsafe { AnyIOPin::new(pins::LOOP_RX) })?;
    rx_pin.set_pull(Pull::Up)?;
    let mut tx_pin = PinDriver::output(unsafe { AnyIOPin::new(pins::LOOP_TX) })?;
    // Idle at mark before the first tick.
    tx_pin.set_high()?;

    let timer_service = EspTaskTimerService::new()?;
    let tick_timer = timer_service.timer(move || {
        let mark = SOFTUART.tick(rx_pin.is_high());
        let _ = tx_pin.set_level(mark.into());
    })?;
    let mut tick_period = SOFTUART.tick_period_us();
    tick_timer.every(Duration::from_micros(u64::from(tick_period)))?;

    let usb = UsbSerialDriver::new(peripherals.usb_serial, &UsbSerialConfig::default())?;
    let mut host = UsbPort::new(usb);

    let controls = ControlInputs::new()?;
    let mut relay_pins = RelayPins::new()?;

    let mut bridge = Bridge::new(&LOG_STREAM);

    loop {
        let now_ms = (unsafe { esp_timer_get_time() } / 1000) as u32;
        let outputs = bridge.poll(&SOFTUART, &mut store, &mut host, &controls, now_ms);
        relay_pins.apply(outputs)?;

        // A baud change from the console retimes the bit clock.
        let period = SOFTUART.tick_period_us();
        if period != tick_period {
            tick_period = period;
            tick_timer.every(Duration::from_micros(u64::from(period)))?;
        }

        drain_console_log();
        FreeRtos::delay_ms(1);
    }
}

/// Forward buffered log entries to the IDF console UART.
#[cfg(target_os = "espidf")]
fn drain_console_log() {
    while let Some(entry) = LOG_STREAM.drain() {
        let msg = core::str::from_utf8(&entry.msg[..entry.len as usize])
            .unwrap_or("<invalid utf8>");
        println!("[{:10}] {}: {}", entry.timestamp_us, entry.level.as_str(), msg);
    }
    let dropped = LOG_STREAM.dropped();
    if dropped > 0 {
        LOG_STREAM.reset_dropped();
        println!("log: {} entries dropped", dropped);
    }
}

#[cfg(not(target_os = "espidf"))]
fn main() {}
