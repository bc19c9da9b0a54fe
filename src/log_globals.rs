//! Global log stream instance.

use crate::logging::LogStream;

/// Firmware-wide log stream.
///
/// Producers are the bridge loop and the hardware glue; the single consumer
/// is the main task, which drains entries to the debug console between
/// polls.
pub static LOG_STREAM: LogStream = LogStream::new();
