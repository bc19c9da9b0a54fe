//! The adapter's main policy loop: USB host on one side, current loop on
//! the other.
//!
//! # Architecture
//!
//! ```text
//!            ┌──────────┐   try_read/write   ┌────────┐  try_send/try_recv  ┌──────────┐
//!  USB CDC ──┤ HostPort ├───────────────────▶│ Bridge │◀────────────────────┤ SoftUart │── loop
//!            └──────────┘                    └───┬────┘                     └──────────┘
//!                                                │ request/tick
//!                                          ┌─────▼─────────┐
//!                                          │ RelaySequencer│── relay pins
//!                                          └───────────────┘
//! ```
//!
//! [`Bridge::poll`] runs one bounded iteration and never blocks: at most
//! one byte moves toward the loop and one byte toward the host per call.
//! The loop side is the bottleneck by four orders of magnitude, so all
//! pacing falls out of the transmitter's depth-one pipeline.
//!
//! Poll order is fixed: shell handoff, framing refresh, break edges, host
//! break, one transmit slot, one receive byte, relay bookkeeping. Keeping
//! the order fixed makes the edge cases (break during autoprint, shell
//! entry mid-break) reproducible.

use crate::baudot::{BaudotCodec, Encoded, Shift, FIGS, LTRS};
use crate::config::{ConfFlags, ConfigOps};
use crate::console::{CmdAction, Console, ShellContext};
use crate::logging::LogStream;
use crate::relay::{PowerTarget, RelayOutputs, RelaySequencer};
use crate::softuart::{DataBits, SoftUart};

/// Host-side sentinel that forces the FIGS page onto the wire.
pub const ASCII_FIGS_CHAR: u8 = b'{';
/// Host-side sentinel that forces the LTRS page onto the wire.
pub const ASCII_LTRS_CHAR: u8 = b'}';

/// Column at which auto-CRLF injects a new line. Teletype carriages are 72
/// columns; injecting a little early leaves room for a final word.
pub const AUTOCR_COLUMN: u8 = 68;

/// DC2: power the machine up (honored only while the enable input allows).
pub const CTRL_RELAYS_ON: u8 = 0x12;
/// DC4: power the machine down.
pub const CTRL_RELAYS_OFF: u8 = 0x14;

/// Host bytes the shell drains per poll, to bound time in the shell path.
const SHELL_CHUNK: usize = 32;

/// USB-side byte transport.
///
/// `write` returns false when the transport cannot take the byte right
/// now; callers treat host output as best-effort.
pub trait HostPort {
    fn try_read(&mut self) -> Option<u8>;
    fn write(&mut self, byte: u8) -> bool;
    /// Run transport housekeeping once per poll.
    fn service(&mut self) {}
}

/// Board-level control inputs.
pub trait Controls {
    /// Command jumper grounded: the shell owns the host port.
    fn command_mode(&self) -> bool;
    /// Power gate for the relay sequencer.
    fn relay_enable(&self) -> bool;
    /// Override jumper holding the relays on at the board level.
    fn relay_forced_on(&self) -> bool;
}

/// Bridge-side event counters, shown by the shell's `status` command.
#[derive(Clone, Copy, Default, Debug)]
pub struct BridgeCounters {
    /// Loop break events reported to the host.
    pub breaks: u32,
    /// Host characters dropped: unmappable in translation, or overflowing
    /// the expansion queue.
    pub dropped: u32,
}

const PENDING_CAP: usize = 8;

/// Holds the trailing codes of a multi-code expansion (shift prefixes,
/// CRLF pairs, auto-CR injections) until the transmitter frees up.
struct PendingFifo {
    buf: [u8; PENDING_CAP],
    head: usize,
    len: usize,
}

impl PendingFifo {
    const fn new() -> Self {
        Self {
            buf: [0; PENDING_CAP],
            head: 0,
            len: 0,
        }
    }

    fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn push(&mut self, code: u8) -> bool {
        if self.len == PENDING_CAP {
            return false;
        }
        self.buf[(self.head + self.len) % PENDING_CAP] = code;
        self.len += 1;
        true
    }

    fn pop(&mut self) -> Option<u8> {
        if self.len == 0 {
            return None;
        }
        let code = self.buf[self.head];
        self.head = (self.head + 1) % PENDING_CAP;
        self.len -= 1;
        Some(code)
    }
}

/// `core::fmt::Write` adapter over a [`HostPort`], expanding `\n` to CRLF
/// for the terminal. Output is best-effort; bytes the transport refuses
/// are dropped.
pub struct HostWriter<'a> {
    port: &'a mut dyn HostPort,
}

impl<'a> HostWriter<'a> {
    pub fn new(port: &'a mut dyn HostPort) -> Self {
        Self { port }
    }
}

impl core::fmt::Write for HostWriter<'_> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        for &byte in s.as_bytes() {
            if byte == b'\n' {
                let _ = self.port.write(b'\r');
            }
            let _ = self.port.write(byte);
        }
        Ok(())
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Bridging,
    Shell,
}

/// Progress through the stored answerback message.
#[derive(Clone, Copy)]
struct Autoprint {
    pos: u8,
    len: u8,
}

/// Protocol state spanning polls.
pub struct Bridge {
    mode: Mode,
    codec: BaudotCodec,
    relays: RelaySequencer,
    console: Console,
    pending: PendingFifo,
    autoprint: Option<Autoprint>,
    /// Printable characters since the last carriage return, for auto-CRLF.
    column: u8,
    /// Framing flag from the previous poll, for break edge detection.
    framing_error_seen: bool,
    /// Enable gate level from the previous poll, for rising-edge detection.
    enable_seen: bool,
    /// Translation table generation last loaded into the codec.
    table_gen: u32,
    counters: BridgeCounters,
    log: &'static LogStream,
}

impl Bridge {
    pub fn new(log: &'static LogStream) -> Self {
        Self {
            mode: Mode::Bridging,
            codec: BaudotCodec::new(),
            relays: RelaySequencer::new(),
            console: Console::new(),
            pending: PendingFifo::new(),
            autoprint: None,
            column: 0,
            framing_error_seen: false,
            enable_seen: false,
            table_gen: 0,
            counters: BridgeCounters { breaks: 0, dropped: 0 },
            log,
        }
    }

    pub fn counters(&self) -> BridgeCounters {
        self.counters
    }

    /// True while the command shell owns the host port.
    pub fn in_shell(&self) -> bool {
        self.mode == Mode::Shell
    }

    /// Run one bounded bridge iteration. Returns the relay pin levels to
    /// drive. `now_ms` is a wrapping millisecond timestamp.
    pub fn poll(
        &mut self,
        uart: &SoftUart,
        store: &mut dyn ConfigOps,
        host: &mut dyn HostPort,
        controls: &dyn Controls,
        now_ms: u32,
    ) -> RelayOutputs {
        self.refresh_table(store);

        match self.mode {
            Mode::Bridging => self.poll_bridging(uart, store, host, controls, now_ms),
            Mode::Shell => self.poll_shell(uart, store, host, controls, now_ms),
        }

        let outputs = self.poll_relays(controls, now_ms);
        host.service();
        outputs
    }

    fn poll_bridging(
        &mut self,
        uart: &SoftUart,
        store: &mut dyn ConfigOps,
        host: &mut dyn HostPort,
        controls: &dyn Controls,
        now_ms: u32,
    ) {
        if controls.command_mode() {
            self.enter_shell(uart, host, now_ms);
            return;
        }

        let flags = store.config().flags;
        uart.set_data_bits(if flags.eight_bit() {
            DataBits::Eight
        } else {
            DataBits::Five
        });

        // A break is over when the framing flag falls. Report it once.
        let framing = uart.framing_error();
        if self.framing_error_seen && !framing {
            self.counters.breaks = self.counters.breaks.wrapping_add(1);
            crate::log_debug!(self.log, timestamp_us(now_ms), "loop break ended");
            if flags.show_break() {
                if flags.autoprint() && store.automsg_len() > 0 {
                    self.start_autoprint(host, store);
                } else {
                    write_host(host, b"[BREAK]\r\n");
                }
            }
        }
        self.framing_error_seen = framing;

        if uart.take_host_break() {
            uart.send_break();
        }

        // One transmit slot: leftovers first, then the answerback drip,
        // then fresh host input.
        if uart.tx_idle() {
            if let Some(code) = self.pending.pop() {
                uart.try_send(code);
            } else if let Some(state) = self.autoprint {
                let byte = store.automsg_byte(state.pos);
                let next = state.pos + 1;
                let finished = next >= state.len;
                self.autoprint = if finished {
                    None
                } else {
                    Some(Autoprint { pos: next, len: state.len })
                };
                self.send_host_byte(uart, flags, byte);
                if finished {
                    write_host(host, b"done.]\r\n");
                }
            } else if let Some(byte) = host.try_read() {
                match byte {
                    CTRL_RELAYS_ON => {
                        if controls.relay_enable() {
                            self.relays.request(PowerTarget::On, now_ms);
                        }
                    }
                    CTRL_RELAYS_OFF => {
                        self.relays.request(PowerTarget::Off, now_ms);
                    }
                    _ => self.send_host_byte(uart, flags, byte),
                }
            }
        }

        // One receive byte toward the host.
        if let Some(code) = uart.try_recv() {
            let out = if flags.translate() {
                let decoded = self.codec.decode(code);
                if decoded == Some(b' ') && flags.usos() {
                    self.codec.unshift_recv();
                }
                decoded
            } else if flags.eight_bit() {
                Some(code)
            } else {
                Some(code & 0x1F)
            };
            if let Some(byte) = out {
                let _ = host.write(byte);
            }
        }
    }

    fn poll_shell(
        &mut self,
        uart: &SoftUart,
        store: &mut dyn ConfigOps,
        host: &mut dyn HostPort,
        controls: &dyn Controls,
        now_ms: u32,
    ) {
        let mut exit = false;
        for _ in 0..SHELL_CHUNK {
            let byte = match host.try_read() {
                Some(byte) => byte,
                None => break,
            };
            let mut cx = ShellContext {
                store: &mut *store,
                uart,
                counters: self.counters,
                forced_on: controls.relay_forced_on(),
            };
            let mut out = HostWriter::new(host);
            if self.console.process_byte(byte, &mut cx, &mut out) == Some(CmdAction::Exit) {
                exit = true;
                break;
            }
        }

        if exit {
            self.leave_shell(uart, now_ms);
        }
    }

    fn enter_shell(&mut self, uart: &SoftUart, host: &mut dyn HostPort, now_ms: u32) {
        // The shell owns the host port; incoming loop traffic would only
        // interleave garbage into it.
        uart.set_rx_enabled(false);
        self.framing_error_seen = false;
        self.autoprint = None;
        self.mode = Mode::Shell;
        crate::log_info!(self.log, timestamp_us(now_ms), "entering command shell");
        let mut out = HostWriter::new(host);
        self.console.print_banner(&mut out);
    }

    fn leave_shell(&mut self, uart: &SoftUart, now_ms: u32) {
        uart.set_rx_enabled(true);
        self.framing_error_seen = false;
        self.column = 0;
        self.mode = Mode::Bridging;
        crate::log_info!(self.log, timestamp_us(now_ms), "leaving command shell");
    }

    fn poll_relays(&mut self, controls: &dyn Controls, now_ms: u32) -> RelayOutputs {
        let enabled = controls.relay_enable();
        if !enabled {
            // level-style: keep asking for off while the gate is down
            self.relays.request(PowerTarget::Off, now_ms);
        } else if !self.enable_seen {
            self.relays.request(PowerTarget::On, now_ms);
        }
        self.enable_seen = enabled;

        let before = self.relays.state();
        let outputs = self.relays.tick(now_ms);
        let after = self.relays.state();
        if before != after {
            crate::log_info!(
                self.log,
                timestamp_us(now_ms),
                "machine power {}",
                match after {
                    crate::relay::RelayState::Enabled => "up",
                    crate::relay::RelayState::Off => "down",
                }
            );
        }
        outputs
    }

    fn refresh_table(&mut self, store: &mut dyn ConfigOps) {
        let gen = store.table_generation();
        if gen != self.table_gen {
            self.codec.set_table(store.active_table());
            self.table_gen = gen;
        }
    }

    fn start_autoprint(&mut self, host: &mut dyn HostPort, store: &mut dyn ConfigOps) {
        write_host(host, b"[Autoprinting... ");
        self.autoprint = Some(Autoprint {
            pos: 0,
            len: store.automsg_len(),
        });
    }

    /// Push one host-side character toward the loop, applying the
    /// translation policy chain.
    fn send_host_byte(&mut self, uart: &SoftUart, flags: ConfFlags, byte: u8) {
        if !flags.translate() {
            let code = if flags.eight_bit() { byte } else { byte & 0x1F };
            self.emit_code(uart, code);
            return;
        }

        // Page sentinels bypass every other policy.
        match byte {
            ASCII_FIGS_CHAR => {
                self.emit_code(uart, FIGS);
                self.codec.set_send_shift(Shift::Figs);
                return;
            }
            ASCII_LTRS_CHAR => {
                self.emit_code(uart, LTRS);
                self.codec.set_send_shift(Shift::Ltrs);
                return;
            }
            _ => {}
        }

        if flags.crlf() && (byte == b'\r' || byte == b'\n') {
            self.encode_and_emit(uart, b'\r');
            self.encode_and_emit(uart, b'\n');
        } else {
            self.encode_and_emit(uart, byte);
            if flags.usos() && byte == b' ' {
                self.codec.unshift_send();
            }
        }

        // carriage position bookkeeping
        if byte == b'\r' || byte == b'\n' {
            self.column = 0;
        } else if (0x20..=0x7E).contains(&byte) {
            self.column = self.column.saturating_add(1);
        }
        if flags.autocr() && self.column >= AUTOCR_COLUMN {
            self.encode_and_emit(uart, b'\r');
            self.encode_and_emit(uart, b'\n');
            self.column = 0;
        }
    }

    fn encode_and_emit(&mut self, uart: &SoftUart, byte: u8) {
        match self.codec.encode(byte) {
            Encoded::Code(code) => self.emit_code(uart, code),
            Encoded::Shifted { shift, code } => {
                self.emit_code(uart, shift);
                self.emit_code(uart, code);
            }
            Encoded::Unmapped => {
                self.counters.dropped = self.counters.dropped.wrapping_add(1);
            }
        }
    }

    /// Hand a line code to the transmitter, spilling into the pending FIFO
    /// when the pipeline is busy. Order is preserved: once anything is
    /// pending, everything queues behind it.
    fn emit_code(&mut self, uart: &SoftUart, code: u8) {
        if self.pending.is_empty() && uart.try_send(code) {
            return;
        }
        if !self.pending.push(code) {
            self.counters.dropped = self.counters.dropped.wrapping_add(1);
        }
    }
}

/// Best-effort raw write toward the host; the text carries its own line
/// endings.
fn write_host(host: &mut dyn HostPort, text: &[u8]) {
    for &byte in text {
        let _ = host.write(byte);
    }
}

fn timestamp_us(now_ms: u32) -> i64 {
    now_ms as i64 * 1000
}
