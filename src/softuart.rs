//! Software UART for the current-loop line.
//!
//! The line has no hardware UART behind it; both directions are bit-banged
//! from a periodic timer callback running at three ticks per bit
//! ([`crate::baud::TICKS_PER_BIT`]). The receiver samples the line level it
//! is handed each tick; the transmitter returns the level to drive.
//!
//! # Architecture
//!
//! ```text
//!  timer tick ──▶ RX engine ──▶ rx_buf/rx_ready ──▶ poll loop (try_recv)
//!  poll loop  ──▶ tx_buf/tx_pending ──▶ TX engine ──▶ line level
//! ```
//!
//! Each direction hands off through a depth-one cell: the receiver publishes
//! at most one byte (a newer byte overwrites an unread one and counts an
//! overrun), and the transmitter accepts at most one byte ahead of the frame
//! on the wire. At 50 baud a frame lasts 160 ms, so a poll loop running
//! every few milliseconds never comes close to either limit.
//!
//! # Memory ordering
//!
//! The tick callback and the poll loop are distinct contexts, possibly on
//! distinct cores. Every handoff flag is stored with `Release` after its
//! payload and read with `Acquire` before the payload, so a flag observed
//! set guarantees the payload is visible. Counters are monotonic and use
//! relaxed ordering.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

use crate::baud::{BitClock, TICKS_PER_BIT};

/// How long a transmitted break holds the line in the spacing state.
pub const BREAK_DURATION_US: u32 = 500_000;

/// Character width on the line. Five data bits ride with two stop bits,
/// eight data bits with one, matching the framing the loop machines expect.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DataBits {
    Five,
    Eight,
}

impl DataBits {
    #[inline]
    pub fn count(self) -> u8 {
        match self {
            DataBits::Five => 5,
            DataBits::Eight => 8,
        }
    }

    fn from_count(count: u8) -> Self {
        if count == 8 {
            DataBits::Eight
        } else {
            DataBits::Five
        }
    }

    /// Start + data + stop bit-times for one frame, and the frame image as
    /// a shift register, LSB first: start bit at bit 0, stop bits high.
    fn frame(self, byte: u8) -> (u16, u8) {
        match self {
            DataBits::Five => ((0b11 << 6) | ((byte as u16 & 0x1F) << 1), 8),
            DataBits::Eight => ((1 << 9) | ((byte as u16) << 1), 10),
        }
    }
}

/// Snapshot of the line counters, for status reporting.
#[derive(Clone, Copy, Default, Debug)]
pub struct LineCounters {
    pub rx_bytes: u32,
    pub tx_bytes: u32,
    pub framing_errors: u32,
    pub overruns: u32,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum RxState {
    /// Line is marking; waiting for a start edge.
    Idle,
    /// Saw the start edge; re-check the level mid start bit.
    Start,
    /// Clocking in data bits, LSB first.
    Data,
    /// Sampling the first stop bit.
    Stop,
    /// Sustained spacing (break); waiting for the line to mark again.
    BreakHold,
}

struct RxEngine {
    state: RxState,
    /// Ticks until the next sample point.
    countdown: u8,
    bit: u8,
    shift: u8,
    /// Data bit count latched at the start edge of this frame.
    data_bits: u8,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum TxState {
    Idle,
    Sending,
    Break,
}

struct TxEngine {
    state: TxState,
    countdown: u8,
    bits_left: u8,
    shift: u16,
    break_ticks_left: u32,
    /// Level currently driven on the line; mark when idle.
    level: bool,
}

/// Bit-banged UART with a tick side and a poll side.
///
/// [`SoftUart::tick`] is called from exactly one context (the periodic timer
/// callback); everything else may be called from the poll loop. The two bit
/// engines live in `UnsafeCell`s because only the tick context ever touches
/// them.
pub struct SoftUart {
    clock: BitClock,
    rx: UnsafeCell<RxEngine>,
    tx: UnsafeCell<TxEngine>,

    // receive handoff
    rx_buf: AtomicU8,
    rx_ready: AtomicBool,
    rx_enabled: AtomicBool,
    framing_error: AtomicBool,

    // transmit handoff
    tx_buf: AtomicU8,
    tx_pending: AtomicBool,
    tx_active: AtomicBool,
    break_pending: AtomicBool,

    /// Break request raised by the host transport, consumed by the poll loop.
    host_break: AtomicBool,

    data_bits: AtomicU8,

    rx_bytes: AtomicU32,
    tx_bytes: AtomicU32,
    framing_errors: AtomicU32,
    overruns: AtomicU32,
}

// SAFETY: the UnsafeCell fields are only accessed from tick(), which is
// documented to have a single caller context; all cross-context state is in
// atomics.
unsafe impl Sync for SoftUart {}

impl SoftUart {
    pub const fn new() -> Self {
        Self {
            clock: BitClock::new(),
            rx: UnsafeCell::new(RxEngine {
                state: RxState::Idle,
                countdown: 0,
                bit: 0,
                shift: 0,
                data_bits: 5,
            }),
            tx: UnsafeCell::new(TxEngine {
                state: TxState::Idle,
                countdown: 0,
                bits_left: 0,
                shift: 0,
                break_ticks_left: 0,
                level: true,
            }),
            rx_buf: AtomicU8::new(0),
            rx_ready: AtomicBool::new(false),
            rx_enabled: AtomicBool::new(true),
            framing_error: AtomicBool::new(false),
            tx_buf: AtomicU8::new(0),
            tx_pending: AtomicBool::new(false),
            tx_active: AtomicBool::new(false),
            break_pending: AtomicBool::new(false),
            host_break: AtomicBool::new(false),
            data_bits: AtomicU8::new(5),
            rx_bytes: AtomicU32::new(0),
            tx_bytes: AtomicU32::new(0),
            framing_errors: AtomicU32::new(0),
            overruns: AtomicU32::new(0),
        }
    }

    /// Install a new line divisor. Both bit engines restart at the next
    /// tick; a frame in flight is abandoned rather than finished at a
    /// mixture of rates.
    pub fn set_divisor(&self, divisor: u16) {
        self.clock.set_divisor(divisor);
    }

    #[inline]
    pub fn divisor(&self) -> u16 {
        self.clock.divisor()
    }

    /// Current tick period in microseconds, for timer (re)programming.
    #[inline]
    pub fn tick_period_us(&self) -> u32 {
        self.clock.tick_period_us()
    }

    /// Set the character width. Takes effect at the next frame boundary in
    /// each direction; the width of a frame already in progress is latched.
    pub fn set_data_bits(&self, bits: DataBits) {
        self.data_bits.store(bits.count(), Ordering::Relaxed);
    }

    pub fn data_bits(&self) -> DataBits {
        DataBits::from_count(self.data_bits.load(Ordering::Relaxed))
    }

    /// Gate the receiver. While disabled the RX engine idles and incoming
    /// edges are ignored. Re-enabling clears any stale framing indication
    /// left over from the moment the gate closed.
    pub fn set_rx_enabled(&self, enabled: bool) {
        self.rx_enabled.store(enabled, Ordering::Relaxed);
        self.framing_error.store(false, Ordering::Release);
        if !enabled {
            self.rx_ready.store(false, Ordering::Release);
        }
    }

    /// Offer a byte to the transmitter. Returns false while a frame or
    /// break occupies the pipeline; the caller retries on a later poll.
    pub fn try_send(&self, byte: u8) -> bool {
        if !self.tx_idle() {
            return false;
        }
        self.tx_buf.store(byte, Ordering::Relaxed);
        self.tx_pending.store(true, Ordering::Release);
        true
    }

    /// True when the transmit pipeline can accept a byte.
    #[inline]
    pub fn tx_idle(&self) -> bool {
        !self.tx_pending.load(Ordering::Acquire)
            && !self.tx_active.load(Ordering::Acquire)
            && !self.break_pending.load(Ordering::Acquire)
    }

    /// Queue a break: the line is forced spacing for [`BREAK_DURATION_US`].
    /// A frame in flight is abandoned; a byte already accepted but not yet
    /// started is sent after the break ends.
    pub fn send_break(&self) {
        self.break_pending.store(true, Ordering::Release);
    }

    /// Fetch the received byte, if one is waiting.
    pub fn try_recv(&self) -> Option<u8> {
        if !self.rx_ready.load(Ordering::Acquire) {
            return None;
        }
        let byte = self.rx_buf.load(Ordering::Relaxed);
        self.rx_ready.store(false, Ordering::Release);
        Some(byte)
    }

    /// Current framing indication. Set on a bad stop bit, held through a
    /// break, cleared when the line recovers or a clean frame arrives.
    #[inline]
    pub fn framing_error(&self) -> bool {
        self.framing_error.load(Ordering::Acquire)
    }

    /// Record a break request arriving from the host transport.
    pub fn signal_host_break(&self) {
        self.host_break.store(true, Ordering::Release);
    }

    /// Consume a pending host break request.
    pub fn take_host_break(&self) -> bool {
        self.host_break.swap(false, Ordering::AcqRel)
    }

    pub fn counters(&self) -> LineCounters {
        LineCounters {
            rx_bytes: self.rx_bytes.load(Ordering::Relaxed),
            tx_bytes: self.tx_bytes.load(Ordering::Relaxed),
            framing_errors: self.framing_errors.load(Ordering::Relaxed),
            overruns: self.overruns.load(Ordering::Relaxed),
        }
    }

    /// Advance both bit engines by one tick.
    ///
    /// `rx_level` is the line level sampled this tick (true = mark); the
    /// return value is the level to drive (true = mark).
    ///
    /// # Timing
    ///
    /// Must be called from a single context at the period reported by
    /// [`SoftUart::tick_period_us`].
    pub fn tick(&self, rx_level: bool) -> bool {
        if self.clock.take_resync() {
            // SAFETY: tick() has a single caller context.
            let rx = unsafe { &mut *self.rx.get() };
            rx.state = RxState::Idle;
            let tx = unsafe { &mut *self.tx.get() };
            if tx.state != TxState::Idle {
                tx.state = TxState::Idle;
                tx.level = true;
                self.tx_active.store(false, Ordering::Release);
            }
        }
        self.tick_rx(rx_level);
        self.tick_tx()
    }

    fn tick_rx(&self, level: bool) {
        // SAFETY: tick() has a single caller context.
        let rx = unsafe { &mut *self.rx.get() };

        if !self.rx_enabled.load(Ordering::Relaxed) {
            rx.state = RxState::Idle;
            return;
        }

        match rx.state {
            RxState::Idle => {
                if !level {
                    // Start edge. One more tick puts the sample point a
                    // third of the way into the start bit.
                    rx.state = RxState::Start;
                    rx.countdown = 1;
                }
            }
            RxState::Start => {
                rx.countdown -= 1;
                if rx.countdown == 0 {
                    if level {
                        // Line bounced back to mark: a glitch, not a start
                        // bit.
                        rx.state = RxState::Idle;
                    } else {
                        rx.state = RxState::Data;
                        rx.shift = 0;
                        rx.bit = 0;
                        rx.data_bits = self.data_bits.load(Ordering::Relaxed);
                        rx.countdown = TICKS_PER_BIT as u8;
                    }
                }
            }
            RxState::Data => {
                rx.countdown -= 1;
                if rx.countdown == 0 {
                    if level {
                        rx.shift |= 1 << rx.bit;
                    }
                    rx.bit += 1;
                    rx.countdown = TICKS_PER_BIT as u8;
                    if rx.bit == rx.data_bits {
                        rx.state = RxState::Stop;
                    }
                }
            }
            RxState::Stop => {
                rx.countdown -= 1;
                if rx.countdown == 0 {
                    if level {
                        self.publish_rx(rx.shift);
                        self.framing_error.store(false, Ordering::Release);
                        rx.state = RxState::Idle;
                    } else if rx.shift == 0 {
                        // All-zero frame with a spacing stop bit: the line
                        // is being held open. Flag it and wait for mark.
                        self.framing_error.store(true, Ordering::Release);
                        rx.state = RxState::BreakHold;
                    } else {
                        self.framing_error.store(true, Ordering::Release);
                        self.framing_errors.fetch_add(1, Ordering::Relaxed);
                        rx.state = RxState::Idle;
                    }
                }
            }
            RxState::BreakHold => {
                if level {
                    self.framing_error.store(false, Ordering::Release);
                    rx.state = RxState::Idle;
                }
            }
        }
    }

    fn publish_rx(&self, byte: u8) {
        if self.rx_ready.load(Ordering::Relaxed) {
            // Poll loop never picked up the previous byte; newest wins.
            self.overruns.fetch_add(1, Ordering::Relaxed);
        }
        self.rx_buf.store(byte, Ordering::Relaxed);
        self.rx_ready.store(true, Ordering::Release);
        self.rx_bytes.fetch_add(1, Ordering::Relaxed);
    }

    fn tick_tx(&self) -> bool {
        // SAFETY: tick() has a single caller context.
        let tx = unsafe { &mut *self.tx.get() };

        match tx.state {
            TxState::Idle => {
                if self.break_pending.swap(false, Ordering::AcqRel) {
                    tx.state = TxState::Break;
                    tx.break_ticks_left = BREAK_DURATION_US / self.clock.tick_period_us();
                    tx.level = false;
                    self.tx_active.store(true, Ordering::Release);
                } else if self.tx_pending.load(Ordering::Acquire) {
                    let byte = self.tx_buf.load(Ordering::Relaxed);
                    self.tx_pending.store(false, Ordering::Release);
                    let bits = DataBits::from_count(self.data_bits.load(Ordering::Relaxed));
                    let (shift, len) = bits.frame(byte);
                    tx.shift = shift;
                    tx.bits_left = len;
                    tx.countdown = TICKS_PER_BIT as u8;
                    tx.level = shift & 1 != 0; // start bit, always spacing
                    tx.state = TxState::Sending;
                    self.tx_active.store(true, Ordering::Release);
                } else {
                    tx.level = true;
                }
            }
            TxState::Sending => {
                if self.break_pending.swap(false, Ordering::AcqRel) {
                    // Break preempts the frame; the byte on the wire is
                    // sacrificed.
                    tx.state = TxState::Break;
                    tx.break_ticks_left = BREAK_DURATION_US / self.clock.tick_period_us();
                    tx.level = false;
                } else {
                    tx.countdown -= 1;
                    if tx.countdown == 0 {
                        tx.bits_left -= 1;
                        if tx.bits_left == 0 {
                            tx.state = TxState::Idle;
                            tx.level = true;
                            self.tx_bytes.fetch_add(1, Ordering::Relaxed);
                            self.tx_active.store(false, Ordering::Release);
                        } else {
                            tx.shift >>= 1;
                            tx.countdown = TICKS_PER_BIT as u8;
                            tx.level = tx.shift & 1 != 0;
                        }
                    }
                }
            }
            TxState::Break => {
                tx.break_ticks_left -= 1;
                if tx.break_ticks_left == 0 {
                    tx.state = TxState::Idle;
                    tx.level = true;
                    self.tx_active.store(false, Ordering::Release);
                }
            }
        }
        tx.level
    }
}

impl Default for SoftUart {
    fn default() -> Self {
        Self::new()
    }
}
