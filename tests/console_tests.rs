//! Command shell tests

use rust_baudot_bridge::baud::DEFAULT_DIVISOR;
use rust_baudot_bridge::bridge::BridgeCounters;
use rust_baudot_bridge::config::store::layout;
use rust_baudot_bridge::config::{ConfFlags, ConfigOps, ConfigStore, RamEeprom};
use rust_baudot_bridge::console::{
    execute, parse_line, CmdAction, Console, ConsoleError, ShellContext, COMMANDS, VERSION,
};
use rust_baudot_bridge::softuart::{DataBits, SoftUart};

#[test]
fn test_command_registry_has_all_commands() {
    let expected = [
        "help", "show", "status", "save", "load", "baud", "table", "translate", "notranslate",
        "passthru", "crlf", "nocrlf", "autocr", "noautocr", "usos", "nousos", "showbreak",
        "noshowbreak", "autoprint", "noautoprint", "automsg", "8bit", "no8bit", "eedump",
        "eewrite", "eewipe", "exit",
    ];

    for name in expected {
        assert!(
            COMMANDS.iter().any(|c| c.name == name),
            "Command '{}' should be in registry",
            name
        );
    }
}

#[test]
fn test_execute_unknown_command() {
    let mut shell = Shell::new();
    let (result, _) = shell.run("frobnicate");
    assert_eq!(result, Err(ConsoleError::UnknownCommand));
}

#[test]
fn test_execute_empty_line_is_a_noop() {
    let mut shell = Shell::new();
    let (result, out) = shell.run("");
    assert_eq!(result, Ok(CmdAction::None));
    assert!(out.is_empty());
}

#[test]
fn test_help_lists_every_command() {
    let mut shell = Shell::new();
    let (result, out) = shell.run("help");
    assert!(result.is_ok());
    assert!(out.contains("Commands available:"));
    for c in COMMANDS {
        assert!(out.contains(c.name), "help should mention '{}'", c.name);
    }
}

#[test]
fn test_help_for_one_command() {
    let mut shell = Shell::new();
    let (result, out) = shell.run("help baud");
    assert!(result.is_ok());
    assert_eq!(out, "baud: Set line speed\n");

    let (result, _) = shell.run("help frobnicate");
    assert_eq!(result, Err(ConsoleError::UnknownCommand));
}

#[test]
fn test_show_tracks_current_versus_saved() {
    let mut shell = Shell::new();

    let (_, out) = shell.run("show");
    assert!(out.contains("Settings:                                  Cur     Saved"));
    assert!(out.contains("[no]usos        Unshift on space:          N      N"));
    assert!(out.contains("baud N          Baud rate:                 50     50"));

    // toggles edit the working copy only
    shell.run("usos");
    let (_, out) = shell.run("show");
    assert!(out.contains("[no]usos        Unshift on space:          Y      N"));

    let (_, out) = shell.run("save");
    assert!(out.contains("Settings saved."));
    let (_, out) = shell.run("show");
    assert!(out.contains("[no]usos        Unshift on space:          Y      Y"));
}

#[test]
fn test_save_and_load_round_trip() {
    let mut shell = Shell::new();
    shell.run("baud 75");
    shell.run("nocrlf");
    shell.run("save");

    // wander off, then pull the saved settings back
    shell.run("baud 45");
    shell.run("crlf");
    assert_eq!(shell.uart.divisor(), 1833);

    let (result, out) = shell.run("load");
    assert!(result.is_ok());
    assert!(out.contains("Settings loaded."));
    assert_eq!(shell.store.config().divisor, 1123);
    assert!(!shell.store.config().flags.crlf());
    // load retunes the line clock as well
    assert_eq!(shell.uart.divisor(), 1123);
}

#[test]
fn test_baud_tabulated_rate() {
    let mut shell = Shell::new();
    let (result, out) = shell.run("baud 45");
    assert!(result.is_ok());
    assert!(out.contains("Baud rate set to 45 (divisor 1833)"));
    assert!(!out.contains("winging"));
    assert_eq!(shell.store.config().divisor, 1833);
    assert_eq!(shell.uart.divisor(), 1833);
}

#[test]
fn test_baud_nonstandard_rate_wings_it() {
    let mut shell = Shell::new();
    let (result, out) = shell.run("baud 300");
    assert!(result.is_ok());
    assert!(out.contains("Nonstandard baud rate selected, winging it."));
    assert!(out.contains("Baud rate set to 300 (divisor 277)"));
    assert_eq!(shell.uart.divisor(), 277);
}

#[test]
fn test_baud_bad_values() {
    let mut shell = Shell::new();

    let (result, out) = shell.run("baud");
    assert_eq!(result, Ok(CmdAction::None));
    assert!(out.contains("baud <45|50|56|75|110>"));

    let (result, _) = shell.run("baud fast");
    assert_eq!(result, Err(ConsoleError::InvalidValue));

    // zero survives the parse but no divisor can express it
    let (result, _) = shell.run("baud 0");
    assert_eq!(result, Err(ConsoleError::OutOfRange));

    assert_eq!(shell.uart.divisor(), DEFAULT_DIVISOR);
}

#[test]
fn test_table_select_and_clamp() {
    let mut shell = Shell::new();

    let (result, out) = shell.run("table 2");
    assert!(result.is_ok());
    assert!(out.contains("Selected translation table #2"));
    assert_eq!(shell.store.config().table, 2);

    let (result, out) = shell.run("table 9");
    assert!(result.is_ok());
    assert!(out.contains("Table numbers are 0 - 6; selecting 0."));
    assert_eq!(shell.store.config().table, 0);

    let (result, out) = shell.run("table");
    assert_eq!(result, Ok(CmdAction::None));
    assert!(out.contains("table <0-6>"));

    let (result, _) = shell.run("table z");
    assert_eq!(result, Err(ConsoleError::InvalidValue));
}

#[test]
fn test_mode_toggles_flip_their_flags() {
    let pairs: [(&str, &str, fn(ConfFlags) -> bool); 6] = [
        ("translate", "notranslate", ConfFlags::translate),
        ("crlf", "nocrlf", ConfFlags::crlf),
        ("autocr", "noautocr", ConfFlags::autocr),
        ("usos", "nousos", ConfFlags::usos),
        ("showbreak", "noshowbreak", ConfFlags::show_break),
        ("autoprint", "noautoprint", ConfFlags::autoprint),
    ];

    for (on, off, flag) in pairs {
        let mut shell = Shell::new();
        let (result, _) = shell.run(off);
        assert!(result.is_ok());
        assert!(!flag(shell.store.config().flags), "'{}' should clear the flag", off);
        let (result, _) = shell.run(on);
        assert!(result.is_ok());
        assert!(flag(shell.store.config().flags), "'{}' should set the flag", on);
    }

    // passthru is a straight alias
    let mut shell = Shell::new();
    let (result, out) = shell.run("passthru");
    assert!(result.is_ok());
    assert!(out.contains("Set to passthru mode."));
    assert!(!shell.store.config().flags.translate());
}

#[test]
fn test_eight_bit_excludes_translate() {
    let mut shell = Shell::new();
    assert!(shell.store.config().flags.translate());

    let (_, out) = shell.run("8bit");
    assert!(out.contains("8 bit mode for ascii machines."));
    assert!(shell.store.config().flags.eight_bit());
    assert!(!shell.store.config().flags.translate());

    // leaving 8-bit restores translate from the saved settings
    let (_, out) = shell.run("no8bit");
    assert!(out.contains("normal mode for 5-level machines."));
    assert!(!shell.store.config().flags.eight_bit());
    assert!(shell.store.config().flags.translate());
}

#[test]
fn test_automsg_store_show_and_limit() {
    let mut shell = Shell::new();

    let (_, out) = shell.run("automsg");
    assert!(out.contains("No message stored."));

    let (result, out) = shell.run("automsg RYRY TEST");
    assert!(result.is_ok());
    assert!(out.contains("Message stored (9 chars)."));
    assert_eq!(shell.store.automsg_len(), 9);

    let (_, out) = shell.run("automsg");
    assert!(out.contains("Stored message: RYRY TEST"));

    let long = format!("automsg {}", "X".repeat(layout::AUTOMSG_MAX as usize + 1));
    let (result, _) = shell.run(&long);
    assert_eq!(result, Err(ConsoleError::TooLong));
    assert_eq!(shell.store.automsg_len(), 9, "rejected text must not clobber the stored one");
}

#[test]
fn test_eedump_row_format() {
    let mut shell = Shell::new();
    let (result, out) = shell.run("eedump");
    assert!(result.is_ok());

    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 64);
    // marker, flags, divisor and table selector as written by the wipe
    assert_eq!(lines[0], "0000 45 45 03 ff 83 06 00 ff ff ff ff ff ff ff ff ff ");
    assert!(lines[63].starts_with("03f0 "));
}

#[test]
fn test_eewrite_patches_and_echoes() {
    let mut shell = Shell::new();

    let (result, out) = shell.run("eewrite 0010 41 5a");
    assert!(result.is_ok());
    assert!(out.contains("16 (0010): 65 (41)"));
    assert!(out.contains("17 (0011): 90 (5A)"));
    assert_eq!(shell.store.read_raw(0x0010), 0x41);
    assert_eq!(shell.store.read_raw(0x0011), 0x5A);

    let (result, _) = shell.run("eewrite");
    assert_eq!(result, Err(ConsoleError::MissingArg));
    let (result, _) = shell.run("eewrite 0010");
    assert_eq!(result, Err(ConsoleError::MissingArg));
    let (result, _) = shell.run("eewrite zzzz 41");
    assert_eq!(result, Err(ConsoleError::InvalidValue));
    let (result, _) = shell.run("eewrite 0010 123");
    assert_eq!(result, Err(ConsoleError::InvalidValue));
}

#[test]
fn test_eewipe_resets_saved_settings() {
    let mut shell = Shell::new();
    shell.run("baud 75");
    shell.run("save");
    shell.run("automsg KEEP");

    let (result, out) = shell.run("eewipe");
    assert!(result.is_ok());
    assert!(out.contains("Settings area wiped to defaults."));
    assert_eq!(shell.store.saved_divisor(), DEFAULT_DIVISOR);
    assert_eq!(shell.store.saved_flags().bits(), 0x03);
    // the working copy keeps running as configured until a load
    assert_eq!(shell.store.config().divisor, 1123);
    // the answerback text lives outside the wiped span
    assert_eq!(shell.store.automsg_len(), 4);
}

#[test]
fn test_exit_returns_to_adapter_mode() {
    let mut shell = Shell::new();
    let (result, out) = shell.run("exit");
    assert_eq!(result, Ok(CmdAction::Exit));
    assert!(out.contains("Returning to adapter mode."));
}

#[test]
fn test_status_report() {
    let mut shell = Shell::new();
    shell.counters = BridgeCounters { breaks: 3, dropped: 7 };
    shell.forced_on = true;

    let (result, out) = shell.run("status");
    assert!(result.is_ok());
    assert!(out.contains("baud rate       50 (divisor 1667)"));
    assert!(out.contains("framing         5N2"));
    assert!(out.contains("rx bytes        0"));
    assert!(out.contains("breaks seen     3"));
    assert!(out.contains("chars dropped   7"));
    assert!(out.contains("relays forced on by jumper"));

    shell.forced_on = false;
    shell.uart.set_data_bits(DataBits::Eight);
    let (_, out) = shell.run("status");
    assert!(out.contains("framing         8N1"));
    assert!(!out.contains("jumper"));
}

#[test]
fn test_console_runs_a_typed_line() {
    let mut shell = Shell::new();
    let mut console = Console::new();

    let (action, out) = shell.type_bytes(&mut console, b"help\r");
    assert_eq!(action, Some(CmdAction::None));
    // the line echoes as typed, then the command output, then a fresh prompt
    assert!(out.starts_with("help\n"));
    assert!(out.contains("Commands available:"));
    assert!(out.ends_with("cmd> "));
}

#[test]
fn test_console_empty_enter_reprompts() {
    let mut shell = Shell::new();
    let mut console = Console::new();

    let (action, out) = shell.type_bytes(&mut console, b"\r");
    assert_eq!(action, None);
    assert_eq!(out, "\ncmd> ");
}

#[test]
fn test_console_reports_command_errors() {
    let mut shell = Shell::new();
    let mut console = Console::new();

    let (action, out) = shell.type_bytes(&mut console, b"bogus\r");
    assert_eq!(action, Some(CmdAction::None));
    assert_eq!(out, "bogus\nE01: no such command\ncmd> ");
}

#[test]
fn test_console_backspace_editing() {
    let mut shell = Shell::new();
    let mut console = Console::new();

    let (action, out) = shell.type_bytes(&mut console, b"helq\x7fp\r");
    assert_eq!(action, Some(CmdAction::None));
    assert!(out.contains("\x08 \x08"));
    assert!(out.contains("Commands available:"));

    // backspace on an empty line neither echoes nor underflows
    let mut console = Console::new();
    let (_, out) = shell.type_bytes(&mut console, b"\x7f");
    assert!(out.is_empty());
}

#[test]
fn test_console_ctrl_c_cancels_the_line() {
    let mut shell = Shell::new();
    let mut console = Console::new();

    let (_, out) = shell.type_bytes(&mut console, b"bogus\x03");
    assert!(out.ends_with("^C\ncmd> "));

    // the canceled text is gone, enter gives a bare reprompt
    let (action, out) = shell.type_bytes(&mut console, b"\r");
    assert_eq!(action, None);
    assert!(!out.contains("E01"));
}

#[test]
fn test_console_ctrl_u_erases_the_echo() {
    let mut shell = Shell::new();
    let mut console = Console::new();

    let (_, out) = shell.type_bytes(&mut console, b"abc\x15");
    assert_eq!(out, "abc\x08 \x08\x08 \x08\x08 \x08");

    let (action, _) = shell.type_bytes(&mut console, b"exit\r");
    assert_eq!(action, Some(CmdAction::Exit));
}

#[test]
fn test_console_swallows_ansi_arrows() {
    let mut shell = Shell::new();
    let mut console = Console::new();

    // up arrow must not leak into the line or the echo
    let (action, out) = shell.type_bytes(&mut console, b"\x1b[A");
    assert_eq!(action, None);
    assert!(out.is_empty());

    let (action, out) = shell.type_bytes(&mut console, b"exit\r");
    assert_eq!(action, Some(CmdAction::Exit));
    assert!(out.contains("Returning to adapter mode."));
    // no prompt after leaving the shell
    assert!(!out.ends_with("cmd> "));
}

#[test]
fn test_console_banner() {
    let mut out = String::new();
    let console = Console::new();
    console.print_banner(&mut out);

    assert!(out.starts_with('\n'));
    assert!(VERSION.starts_with("ttybridge v"));
    assert!(out.contains(VERSION));
    assert!(out.contains("Type 'help' for commands."));
    assert!(out.ends_with("cmd> "));
}

// Shell harness: a settings store over RAM plus an idle line, the same
// pieces the bridge hands the console on entry.
struct Shell {
    store: ConfigStore<RamEeprom>,
    uart: SoftUart,
    counters: BridgeCounters,
    forced_on: bool,
}

impl Shell {
    fn new() -> Self {
        let mut store = ConfigStore::new(RamEeprom::new());
        store.boot();
        Self {
            store,
            uart: SoftUart::new(),
            counters: BridgeCounters::default(),
            forced_on: false,
        }
    }

    /// Parse and execute one command line, collecting its output.
    fn run(&mut self, line: &str) -> (Result<CmdAction, ConsoleError>, String) {
        let cmd = parse_line(line);
        let mut out = String::new();
        let mut cx = ShellContext {
            store: &mut self.store,
            uart: &self.uart,
            counters: self.counters,
            forced_on: self.forced_on,
        };
        let result = execute(&cmd, &mut cx, &mut out);
        (result, out)
    }

    /// Feed raw bytes through the console editor, collecting the echo and
    /// any command output. Returns the last completed action.
    fn type_bytes(&mut self, console: &mut Console, bytes: &[u8]) -> (Option<CmdAction>, String) {
        let mut out = String::new();
        let mut last = None;
        for &byte in bytes {
            let mut cx = ShellContext {
                store: &mut self.store,
                uart: &self.uart,
                counters: self.counters,
                forced_on: self.forced_on,
            };
            if let Some(action) = console.process_byte(byte, &mut cx, &mut out) {
                last = Some(action);
            }
        }
        (last, out)
    }
}
