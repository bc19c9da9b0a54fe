//! # rust-baudot-bridge
//!
//! Firmware for a USB to current-loop adapter that puts a 5-bit Baudot
//! teletype on a modern host as a plain serial device.
//!
//! ## Architecture
//!
//! One polling task owns the [`Bridge`] and turns the crank; one periodic
//! timer callback clocks the [`SoftUart`] bit engines. The two sides meet
//! only through single-word atomics inside [`SoftUart`]. Hardware access is
//! confined to `hal/` and `main.rs`; everything else runs on the host for
//! tests.

#![cfg_attr(not(test), no_std)]

pub mod baud;
pub mod baudot;
pub mod bridge;
pub mod config;
pub mod console;
pub mod hal;
pub mod log_globals;
pub mod logging;
pub mod relay;
pub mod softuart;

pub use baud::BitClock;
pub use baudot::{BaudotCodec, TranslationTable};
pub use bridge::{Bridge, Controls, HostPort};
pub use config::{ConfigOps, ConfigStore};
pub use console::Console;
pub use relay::{PowerTarget, RelayOutputs, RelaySequencer};
pub use softuart::SoftUart;
