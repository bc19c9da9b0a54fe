//! Main shell struct integrating all components

use core::fmt::Write;

use super::commands::{execute, CmdAction, ShellContext};
use super::{parse_line, LineBuffer};

/// Version string (set by build.rs, includes git hash)
pub const VERSION: &str = env!("VERSION_STRING");

/// Shell prompt.
const PROMPT: &str = "cmd> ";

/// Shell state machine
pub struct Console {
    line: LineBuffer,
    /// Escape sequence state
    escape_state: EscapeState,
}

#[derive(Clone, Copy, PartialEq)]
enum EscapeState {
    Normal,
    Escape,  // Got ESC
    Bracket, // Got ESC [
}

impl Console {
    /// Create new shell
    pub const fn new() -> Self {
        Self {
            line: LineBuffer::new(),
            escape_state: EscapeState::Normal,
        }
    }

    /// Process a single input byte.
    ///
    /// Returns Some(action) when a command line completed, None while more
    /// input is needed. Command errors are reported to `out` here; the
    /// caller only has to honor [`CmdAction::Exit`].
    pub fn process_byte(
        &mut self,
        byte: u8,
        cx: &mut ShellContext<'_>,
        out: &mut dyn Write,
    ) -> Option<CmdAction> {
        match self.escape_state {
            EscapeState::Normal => self.process_normal(byte, cx, out),
            EscapeState::Escape => {
                if byte == b'[' {
                    self.escape_state = EscapeState::Bracket;
                } else {
                    self.escape_state = EscapeState::Normal;
                }
                None
            }
            EscapeState::Bracket => {
                // swallow cursor keys and the like
                self.escape_state = EscapeState::Normal;
                None
            }
        }
    }

    fn process_normal(
        &mut self,
        byte: u8,
        cx: &mut ShellContext<'_>,
        out: &mut dyn Write,
    ) -> Option<CmdAction> {
        match byte {
            // Enter
            b'\r' | b'\n' => {
                let _ = writeln!(out);
                let line = self.line.as_str();

                if !line.is_empty() {
                    let cmd = parse_line(line);
                    let action = match execute(&cmd, cx, out) {
                        Ok(action) => action,
                        Err(e) => {
                            let _ = writeln!(out, "{}", e);
                            CmdAction::None
                        }
                    };
                    self.line.clear();
                    if action != CmdAction::Exit {
                        self.print_prompt(out);
                    }
                    return Some(action);
                }

                self.print_prompt(out);
                None
            }

            // Backspace
            0x7F | 0x08 => {
                if !self.line.is_empty() {
                    self.line.backspace();
                    // Echo: backspace, space, backspace
                    let _ = write!(out, "\x08 \x08");
                }
                None
            }

            // Escape
            0x1B => {
                self.escape_state = EscapeState::Escape;
                None
            }

            // Ctrl+C
            0x03 => {
                let _ = writeln!(out, "^C");
                self.line.clear();
                self.print_prompt(out);
                None
            }

            // Ctrl+U (clear line)
            0x15 => {
                for _ in 0..self.line.len() {
                    let _ = write!(out, "\x08 \x08");
                }
                self.line.clear();
                None
            }

            // Printable character
            0x20..=0x7E => {
                self.line.push(byte);
                let _ = write!(out, "{}", byte as char);
                None
            }

            _ => None,
        }
    }

    /// Print the prompt
    pub fn print_prompt(&self, out: &mut dyn Write) {
        let _ = write!(out, "{}", PROMPT);
    }

    /// Print welcome banner
    pub fn print_banner(&self, out: &mut dyn Write) {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", VERSION);
        let _ = writeln!(out, "Type 'help' for commands.");
        self.print_prompt(out);
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}
