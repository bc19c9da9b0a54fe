//! Serial command shell for configuration and diagnostics
//!
//! Entered when the command jumper is grounded; the loop receiver is gated
//! off while the shell owns the host port. Zero heap allocation, all static
//! buffers.

pub mod commands;
pub mod console;
pub mod error;
pub mod line_buffer;
pub mod parser;

pub use commands::{execute, CmdAction, CommandDescriptor, ShellContext, COMMANDS};
pub use console::{Console, VERSION};
pub use error::ConsoleError;
pub use line_buffer::LineBuffer;
pub use parser::{parse_line, ParsedCommand};
