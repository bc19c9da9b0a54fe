//! Command handlers

use core::fmt::Write;

use super::parser::ParsedCommand;
use super::ConsoleError;
use crate::baud::{baud_to_divisor, divisor_for_rate, divisor_to_baud};
use crate::bridge::BridgeCounters;
use crate::config::store::layout;
use crate::config::{ConfigOps, EEPROM_SIZE};
use crate::softuart::{DataBits, SoftUart};

/// What the caller should do after a command completes.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CmdAction {
    None,
    /// Leave the shell and resume bridging.
    Exit,
}

/// Everything a command handler may touch.
///
/// The settings store is behind `dyn ConfigOps` so the handlers stay plain
/// functions regardless of the storage backend in use.
pub struct ShellContext<'a> {
    pub store: &'a mut dyn ConfigOps,
    pub uart: &'a SoftUart,
    /// Bridge-side counters, snapshotted at shell entry.
    pub counters: BridgeCounters,
    /// Relays held on by the override jumper.
    pub forced_on: bool,
}

/// Command descriptor
pub struct CommandDescriptor {
    pub name: &'static str,
    pub brief: &'static str,
    pub handler:
        fn(&ParsedCommand<'_>, &mut ShellContext<'_>, &mut dyn Write) -> Result<CmdAction, ConsoleError>,
}

/// All available commands
pub static COMMANDS: &[CommandDescriptor] = &[
    CommandDescriptor { name: "help", brief: "List commands", handler: cmd_help },
    CommandDescriptor { name: "show", brief: "Show settings, current and saved", handler: cmd_show },
    CommandDescriptor { name: "status", brief: "Line statistics", handler: cmd_status },
    CommandDescriptor { name: "save", brief: "Persist current settings", handler: cmd_save },
    CommandDescriptor { name: "load", brief: "Reload saved settings", handler: cmd_load },
    CommandDescriptor { name: "baud", brief: "Set line speed", handler: cmd_baud },
    CommandDescriptor { name: "table", brief: "Select translation table", handler: cmd_table },
    CommandDescriptor { name: "translate", brief: "ASCII/Baudot translation on", handler: cmd_translate },
    CommandDescriptor { name: "notranslate", brief: "Transparent passthrough", handler: cmd_notranslate },
    CommandDescriptor { name: "passthru", brief: "Alias for notranslate", handler: cmd_notranslate },
    CommandDescriptor { name: "crlf", brief: "Expand CR or LF to CR+LF", handler: cmd_crlf },
    CommandDescriptor { name: "nocrlf", brief: "CR and LF independent", handler: cmd_nocrlf },
    CommandDescriptor { name: "autocr", brief: "New line at carriage width", handler: cmd_autocr },
    CommandDescriptor { name: "noautocr", brief: "No automatic new line", handler: cmd_noautocr },
    CommandDescriptor { name: "usos", brief: "Unshift on space on", handler: cmd_usos },
    CommandDescriptor { name: "nousos", brief: "Unshift on space off", handler: cmd_nousos },
    CommandDescriptor { name: "showbreak", brief: "Report loop breaks", handler: cmd_showbreak },
    CommandDescriptor { name: "noshowbreak", brief: "Ignore loop breaks", handler: cmd_noshowbreak },
    CommandDescriptor { name: "autoprint", brief: "Answer breaks with stored text", handler: cmd_autoprint },
    CommandDescriptor { name: "noautoprint", brief: "Plain break reports", handler: cmd_noautoprint },
    CommandDescriptor { name: "automsg", brief: "Store the answerback text", handler: cmd_automsg },
    CommandDescriptor { name: "8bit", brief: "8N1 framing for ASCII machines", handler: cmd_8bit },
    CommandDescriptor { name: "no8bit", brief: "5N2 framing for Baudot machines", handler: cmd_no8bit },
    CommandDescriptor { name: "eedump", brief: "Hex dump of the settings area", handler: cmd_eedump },
    CommandDescriptor { name: "eewrite", brief: "Patch settings bytes", handler: cmd_eewrite },
    CommandDescriptor { name: "eewipe", brief: "Factory-reset the settings area", handler: cmd_eewipe },
    CommandDescriptor { name: "exit", brief: "Return to adapter mode", handler: cmd_exit },
];

/// Execute a parsed command
pub fn execute(
    cmd: &ParsedCommand<'_>,
    cx: &mut ShellContext<'_>,
    out: &mut dyn Write,
) -> Result<CmdAction, ConsoleError> {
    if cmd.command.is_empty() {
        return Ok(CmdAction::None);
    }

    let descriptor = COMMANDS
        .iter()
        .find(|c| c.name == cmd.command)
        .ok_or(ConsoleError::UnknownCommand)?;

    (descriptor.handler)(cmd, cx, out)
}

fn yn(flag: bool) -> char {
    if flag {
        'Y'
    } else {
        'N'
    }
}

// --- Command Implementations ---

fn cmd_help(
    cmd: &ParsedCommand<'_>,
    _cx: &mut ShellContext<'_>,
    out: &mut dyn Write,
) -> Result<CmdAction, ConsoleError> {
    if let Some(name) = cmd.arg(0) {
        let c = COMMANDS
            .iter()
            .find(|c| c.name == name)
            .ok_or(ConsoleError::UnknownCommand)?;
        let _ = writeln!(out, "{}: {}", c.name, c.brief);
    } else {
        let _ = writeln!(out, "Commands available:");
        for c in COMMANDS {
            let _ = writeln!(out, "  {:<12} {}", c.name, c.brief);
        }
    }
    Ok(CmdAction::None)
}

fn cmd_show(
    _cmd: &ParsedCommand<'_>,
    cx: &mut ShellContext<'_>,
    out: &mut dyn Write,
) -> Result<CmdAction, ConsoleError> {
    let cur = cx.store.config();
    let saved_flags = cx.store.saved_flags();
    let saved_divisor = cx.store.saved_divisor();
    let saved_table = cx.store.saved_table();

    let _ = writeln!(out, "Settings:                                  Cur     Saved");
    let _ = writeln!(
        out,
        "[no]translate   Translate ASCII/Baudot:    {}      {}",
        yn(cur.flags.translate()),
        yn(saved_flags.translate())
    );
    let _ = writeln!(
        out,
        "[no]crlf        CR or LF --> CR+LF:        {}      {}",
        yn(cur.flags.crlf()),
        yn(saved_flags.crlf())
    );
    let _ = writeln!(
        out,
        "[no]autocr      Send CRLF at end of line:  {}      {}",
        yn(cur.flags.autocr()),
        yn(saved_flags.autocr())
    );
    let _ = writeln!(
        out,
        "[no]usos        Unshift on space:          {}      {}",
        yn(cur.flags.usos()),
        yn(saved_flags.usos())
    );
    let _ = writeln!(
        out,
        "[no]showbreak   Display received breaks:   {}      {}",
        yn(cur.flags.show_break()),
        yn(saved_flags.show_break())
    );
    let _ = writeln!(
        out,
        "[no]8bit        8bit mode:                 {}      {}",
        yn(cur.flags.eight_bit()),
        yn(saved_flags.eight_bit())
    );
    let _ = writeln!(
        out,
        "[no]autoprint   autoprint mode:            {}      {}",
        yn(cur.flags.autoprint()),
        yn(saved_flags.autoprint())
    );
    let _ = writeln!(
        out,
        "table N         Translation table number:  {}      {}",
        cur.table, saved_table
    );
    let _ = writeln!(
        out,
        "baud N          Baud rate:                 {}     {}",
        divisor_to_baud(cur.divisor),
        divisor_to_baud(saved_divisor)
    );
    Ok(CmdAction::None)
}

fn cmd_status(
    _cmd: &ParsedCommand<'_>,
    cx: &mut ShellContext<'_>,
    out: &mut dyn Write,
) -> Result<CmdAction, ConsoleError> {
    let counters = cx.uart.counters();
    let divisor = cx.uart.divisor();
    let framing = match cx.uart.data_bits() {
        DataBits::Five => "5N2",
        DataBits::Eight => "8N1",
    };
    let _ = writeln!(out, "Line status:");
    let _ = writeln!(out, "  baud rate       {} (divisor {})", divisor_to_baud(divisor), divisor);
    let _ = writeln!(out, "  framing         {}", framing);
    let _ = writeln!(out, "  rx bytes        {}", counters.rx_bytes);
    let _ = writeln!(out, "  tx bytes        {}", counters.tx_bytes);
    let _ = writeln!(out, "  framing errors  {}", counters.framing_errors);
    let _ = writeln!(out, "  overruns        {}", counters.overruns);
    let _ = writeln!(out, "  breaks seen     {}", cx.counters.breaks);
    let _ = writeln!(out, "  chars dropped   {}", cx.counters.dropped);
    if cx.forced_on {
        let _ = writeln!(out, "  relays forced on by jumper");
    }
    Ok(CmdAction::None)
}

fn cmd_save(
    _cmd: &ParsedCommand<'_>,
    cx: &mut ShellContext<'_>,
    out: &mut dyn Write,
) -> Result<CmdAction, ConsoleError> {
    cx.store.save();
    let _ = writeln!(out, "Settings saved.");
    Ok(CmdAction::None)
}

fn cmd_load(
    _cmd: &ParsedCommand<'_>,
    cx: &mut ShellContext<'_>,
    out: &mut dyn Write,
) -> Result<CmdAction, ConsoleError> {
    cx.store.load();
    cx.uart.set_divisor(cx.store.config().divisor);
    let _ = writeln!(out, "Settings loaded.");
    Ok(CmdAction::None)
}

fn cmd_baud(
    cmd: &ParsedCommand<'_>,
    cx: &mut ShellContext<'_>,
    out: &mut dyn Write,
) -> Result<CmdAction, ConsoleError> {
    let arg = match cmd.arg(0) {
        Some(arg) => arg,
        None => {
            let _ = writeln!(out, "baud <45|50|56|75|110>");
            return Ok(CmdAction::None);
        }
    };
    let baud: u16 = arg.parse().map_err(|_| ConsoleError::InvalidValue)?;
    let mut divisor = baud_to_divisor(baud);
    if divisor == 0 {
        let _ = writeln!(out, "Nonstandard baud rate selected, winging it.");
        divisor = divisor_for_rate(baud as u32);
        if divisor == 0 {
            return Err(ConsoleError::OutOfRange);
        }
    }
    cx.store.set_divisor(divisor);
    cx.uart.set_divisor(divisor);
    let _ = writeln!(out, "Baud rate set to {} (divisor {})", divisor_to_baud(divisor), divisor);
    Ok(CmdAction::None)
}

fn cmd_table(
    cmd: &ParsedCommand<'_>,
    cx: &mut ShellContext<'_>,
    out: &mut dyn Write,
) -> Result<CmdAction, ConsoleError> {
    let arg = match cmd.arg(0) {
        Some(arg) => arg,
        None => {
            let _ = writeln!(out, "table <0-6>");
            return Ok(CmdAction::None);
        }
    };
    let requested: u8 = arg.parse().map_err(|_| ConsoleError::InvalidValue)?;
    let effective = cx.store.set_table(requested);
    if effective != requested {
        let _ = writeln!(out, "Table numbers are 0 - 6; selecting 0.");
    } else {
        let _ = writeln!(out, "Selected translation table #{}", effective);
    }
    Ok(CmdAction::None)
}

fn cmd_translate(
    _cmd: &ParsedCommand<'_>,
    cx: &mut ShellContext<'_>,
    out: &mut dyn Write,
) -> Result<CmdAction, ConsoleError> {
    cx.store.set_translate(true);
    let _ = writeln!(out, "Set to ASCII/Baudot translate mode.");
    Ok(CmdAction::None)
}

fn cmd_notranslate(
    _cmd: &ParsedCommand<'_>,
    cx: &mut ShellContext<'_>,
    out: &mut dyn Write,
) -> Result<CmdAction, ConsoleError> {
    cx.store.set_translate(false);
    let _ = writeln!(out, "Set to passthru mode.");
    Ok(CmdAction::None)
}

fn cmd_crlf(
    _cmd: &ParsedCommand<'_>,
    cx: &mut ShellContext<'_>,
    out: &mut dyn Write,
) -> Result<CmdAction, ConsoleError> {
    cx.store.set_crlf(true);
    let _ = writeln!(out, "CR or LF --> CRLF.");
    Ok(CmdAction::None)
}

fn cmd_nocrlf(
    _cmd: &ParsedCommand<'_>,
    cx: &mut ShellContext<'_>,
    out: &mut dyn Write,
) -> Result<CmdAction, ConsoleError> {
    cx.store.set_crlf(false);
    let _ = writeln!(out, "CR & LF independent.");
    Ok(CmdAction::None)
}

fn cmd_autocr(
    _cmd: &ParsedCommand<'_>,
    cx: &mut ShellContext<'_>,
    out: &mut dyn Write,
) -> Result<CmdAction, ConsoleError> {
    cx.store.set_autocr(true);
    let _ = writeln!(out, "Auto-CRLF at end of line.");
    Ok(CmdAction::None)
}

fn cmd_noautocr(
    _cmd: &ParsedCommand<'_>,
    cx: &mut ShellContext<'_>,
    out: &mut dyn Write,
) -> Result<CmdAction, ConsoleError> {
    cx.store.set_autocr(false);
    let _ = writeln!(out, "No Auto-CRLF at end of line.");
    Ok(CmdAction::None)
}

fn cmd_usos(
    _cmd: &ParsedCommand<'_>,
    cx: &mut ShellContext<'_>,
    out: &mut dyn Write,
) -> Result<CmdAction, ConsoleError> {
    cx.store.set_usos(true);
    let _ = writeln!(out, "Unshift-on-space enabled.");
    Ok(CmdAction::None)
}

fn cmd_nousos(
    _cmd: &ParsedCommand<'_>,
    cx: &mut ShellContext<'_>,
    out: &mut dyn Write,
) -> Result<CmdAction, ConsoleError> {
    cx.store.set_usos(false);
    let _ = writeln!(out, "Unshift-on-space disabled.");
    Ok(CmdAction::None)
}

fn cmd_showbreak(
    _cmd: &ParsedCommand<'_>,
    cx: &mut ShellContext<'_>,
    out: &mut dyn Write,
) -> Result<CmdAction, ConsoleError> {
    cx.store.set_show_break(true);
    let _ = writeln!(out, "Show break indicator.");
    Ok(CmdAction::None)
}

fn cmd_noshowbreak(
    _cmd: &ParsedCommand<'_>,
    cx: &mut ShellContext<'_>,
    out: &mut dyn Write,
) -> Result<CmdAction, ConsoleError> {
    cx.store.set_show_break(false);
    let _ = writeln!(out, "Do not show break indicator.");
    Ok(CmdAction::None)
}

fn cmd_autoprint(
    _cmd: &ParsedCommand<'_>,
    cx: &mut ShellContext<'_>,
    out: &mut dyn Write,
) -> Result<CmdAction, ConsoleError> {
    cx.store.set_autoprint(true);
    let _ = writeln!(out, "Print saved text on break.");
    Ok(CmdAction::None)
}

fn cmd_noautoprint(
    _cmd: &ParsedCommand<'_>,
    cx: &mut ShellContext<'_>,
    out: &mut dyn Write,
) -> Result<CmdAction, ConsoleError> {
    cx.store.set_autoprint(false);
    let _ = writeln!(out, "Do not print saved text on break.");
    Ok(CmdAction::None)
}

fn cmd_automsg(
    cmd: &ParsedCommand<'_>,
    cx: &mut ShellContext<'_>,
    out: &mut dyn Write,
) -> Result<CmdAction, ConsoleError> {
    if cmd.rest.is_empty() {
        let len = cx.store.automsg_len();
        if len == 0 {
            let _ = writeln!(out, "No message stored.");
        } else {
            let _ = write!(out, "Stored message: ");
            for i in 0..len {
                let byte = cx.store.automsg_byte(i);
                let shown = if (0x20..=0x7E).contains(&byte) { byte as char } else { '.' };
                let _ = write!(out, "{}", shown);
            }
            let _ = writeln!(out);
        }
        return Ok(CmdAction::None);
    }
    let text = cmd.rest.as_bytes();
    if text.len() > layout::AUTOMSG_MAX as usize {
        return Err(ConsoleError::TooLong);
    }
    cx.store.set_automsg(text);
    let _ = writeln!(out, "Message stored ({} chars).", text.len());
    Ok(CmdAction::None)
}

fn cmd_8bit(
    _cmd: &ParsedCommand<'_>,
    cx: &mut ShellContext<'_>,
    out: &mut dyn Write,
) -> Result<CmdAction, ConsoleError> {
    cx.store.set_eight_bit(true);
    let _ = writeln!(out, "8 bit mode for ascii machines.");
    Ok(CmdAction::None)
}

fn cmd_no8bit(
    _cmd: &ParsedCommand<'_>,
    cx: &mut ShellContext<'_>,
    out: &mut dyn Write,
) -> Result<CmdAction, ConsoleError> {
    cx.store.set_eight_bit(false);
    let _ = writeln!(out, "normal mode for 5-level machines.");
    Ok(CmdAction::None)
}

fn cmd_eedump(
    _cmd: &ParsedCommand<'_>,
    cx: &mut ShellContext<'_>,
    out: &mut dyn Write,
) -> Result<CmdAction, ConsoleError> {
    for row in 0..(EEPROM_SIZE as u16 / 16) {
        let base = row * 16;
        let _ = write!(out, "{:04x} ", base);
        for offset in 0..16 {
            let _ = write!(out, "{:02x} ", cx.store.read_raw(base + offset));
        }
        let _ = writeln!(out);
    }
    Ok(CmdAction::None)
}

fn cmd_eewrite(
    cmd: &ParsedCommand<'_>,
    cx: &mut ShellContext<'_>,
    out: &mut dyn Write,
) -> Result<CmdAction, ConsoleError> {
    // eewrite XXXX YY YY ... writes bytes sequentially starting at XXXX
    let mut tokens = cmd.rest.split_whitespace();
    let addr_token = tokens.next().ok_or(ConsoleError::MissingArg)?;
    let addr = u16::from_str_radix(addr_token, 16).map_err(|_| ConsoleError::InvalidValue)?;

    let mut offset = 0u16;
    for token in tokens {
        if token.len() > 2 {
            return Err(ConsoleError::InvalidValue);
        }
        let byte = u8::from_str_radix(token, 16).map_err(|_| ConsoleError::InvalidValue)?;
        let at = addr.wrapping_add(offset);
        let _ = writeln!(out, "{} ({:04x}): {} ({:02X})", at, at, byte, byte);
        cx.store.write_raw(at, byte);
        offset += 1;
    }
    if offset == 0 {
        return Err(ConsoleError::MissingArg);
    }
    Ok(CmdAction::None)
}

fn cmd_eewipe(
    _cmd: &ParsedCommand<'_>,
    cx: &mut ShellContext<'_>,
    out: &mut dyn Write,
) -> Result<CmdAction, ConsoleError> {
    cx.store.wipe();
    let _ = writeln!(out, "Settings area wiped to defaults.");
    Ok(CmdAction::None)
}

fn cmd_exit(
    _cmd: &ParsedCommand<'_>,
    _cx: &mut ShellContext<'_>,
    out: &mut dyn Write,
) -> Result<CmdAction, ConsoleError> {
    let _ = writeln!(out, "Returning to adapter mode.");
    Ok(CmdAction::Exit)
}
