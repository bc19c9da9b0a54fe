//! Pin assignment for the adapter board.
//!
//! Raw GPIO indices on the ESP32-C3 module. The loop side is optically
//! isolated and idles at mark (high); the relay drivers and LEDs are
//! active high, the three control inputs are active low with pull-ups.

/// Receive side of the current loop.
pub const LOOP_RX: i32 = 6;
/// Transmit side of the current loop.
pub const LOOP_TX: i32 = 7;
/// Relay switching the loop supply.
pub const LOOP_RELAY: i32 = 4;
/// Relay switching AC power to the machine motor.
pub const AC_RELAY: i32 = 5;
/// Transmit activity LED, blinks during relay sequences.
pub const TX_LED: i32 = 8;
/// Receive activity LED, blinks during relay sequences.
pub const RX_LED: i32 = 10;
/// Command mode jumper.
pub const COMMAND_JUMPER: i32 = 3;
/// Front panel machine power switch.
pub const RELAY_ENABLE: i32 = 1;
/// Jumper reporting the relays as externally forced on.
pub const RELAYS_FORCED_ON: i32 = 2;
