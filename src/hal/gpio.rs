//! GPIO glue: control inputs and relay/LED outputs.

use esp_idf_svc::hal::gpio::{AnyIOPin, Input, Output, PinDriver, Pull};
use esp_idf_svc::sys::EspError;

use crate::bridge::Controls;
use crate::hal::pins;
use crate::relay::RelayOutputs;

/// The three active-low control inputs, with internal pull-ups enabled.
pub struct ControlInputs {
    command: PinDriver<'static, AnyIOPin, Input>,
    enable: PinDriver<'static, AnyIOPin, Input>,
    forced_on: PinDriver<'static, AnyIOPin, Input>,
}

impl ControlInputs {
    pub fn new() -> Result<Self, EspError> {
        Ok(Self {
            command: pulled_up(pins::COMMAND_JUMPER)?,
            enable: pulled_up(pins::RELAY_ENABLE)?,
            forced_on: pulled_up(pins::RELAYS_FORCED_ON)?,
        })
    }
}

impl Controls for ControlInputs {
    fn command_mode(&self) -> bool {
        self.command.is_low()
    }

    fn relay_enable(&self) -> bool {
        self.enable.is_low()
    }

    fn relay_forced_on(&self) -> bool {
        self.forced_on.is_low()
    }
}

fn pulled_up(pin: i32) -> Result<PinDriver<'static, AnyIOPin, Input>, EspError> {
    // SAFETY: each GPIO number in `pins` is claimed exactly once at startup.
    let mut driver = PinDriver::input(unsafe { AnyIOPin::new(pin) })?;
    driver.set_pull(Pull::Up)?;
    Ok(driver)
}

/// Relay and LED outputs, refreshed from the sequencer state every poll.
pub struct RelayPins {
    loop_relay: PinDriver<'static, AnyIOPin, Output>,
    ac_relay: PinDriver<'static, AnyIOPin, Output>,
    tx_led: PinDriver<'static, AnyIOPin, Output>,
    rx_led: PinDriver<'static, AnyIOPin, Output>,
}

impl RelayPins {
    pub fn new() -> Result<Self, EspError> {
        Ok(Self {
            loop_relay: output(pins::LOOP_RELAY)?,
            ac_relay: output(pins::AC_RELAY)?,
            tx_led: output(pins::TX_LED)?,
            rx_led: output(pins::RX_LED)?,
        })
    }

    pub fn apply(&mut self, outputs: RelayOutputs) -> Result<(), EspError> {
        self.loop_relay.set_level(outputs.loop_supply.into())?;
        self.ac_relay.set_level(outputs.ac_power.into())?;
        self.tx_led.set_level(outputs.leds.into())?;
        self.rx_led.set_level(outputs.leds.into())?;
        Ok(())
    }
}

fn output(pin: i32) -> Result<PinDriver<'static, AnyIOPin, Output>, EspError> {
    // SAFETY: each GPIO number in `pins` is claimed exactly once at startup.
    PinDriver::output(unsafe { AnyIOPin::new(pin) })
}
