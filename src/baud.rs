//! Bit timing for the current-loop side.
//!
//! The line is clocked by a fixed 250 kHz reference divided by a 16-bit
//! divisor; the resulting tick runs at three times the bit rate, so one bit
//! cell is exactly [`TICKS_PER_BIT`] ticks. Divisors for the classic teletype
//! speeds are tabulated; anything else is derived from the reference with
//! plain integer division, evaluated left to right.

use core::sync::atomic::{AtomicBool, AtomicU16, Ordering};

/// Reference clock the divisor counts against, in Hz.
pub const TICK_CLOCK_HZ: u32 = 250_000;

/// Oversampling factor: ticks per bit cell.
pub const TICKS_PER_BIT: u32 = 3;

/// Divisor for 50 baud, the safe default for a blank or damaged config.
pub const DEFAULT_DIVISOR: u16 = 1667;

/// Known-good (rate, divisor) pairs. These override the computed divisor
/// because the real machines are picky about the exact values.
pub const SPEEDS: [(u16, u16); 5] = [
    (45, 1833),
    (50, 1667),
    (56, 1464),
    (75, 1123),
    (110, 757),
];

/// Look up the divisor for a tabulated rate.
///
/// Returns 0 when the rate is not in [`SPEEDS`]; the caller decides whether
/// to fall back to [`divisor_for_rate`].
pub fn baud_to_divisor(baud: u16) -> u16 {
    let mut divisor = 0;
    for (rate, div) in SPEEDS {
        if rate == baud {
            divisor = div;
        }
    }
    divisor
}

/// Recover the nominal rate for a divisor, for display.
///
/// Tabulated divisors report their exact rate; anything else reports
/// `250000 / 3 / divisor` in integer arithmetic.
pub fn divisor_to_baud(divisor: u16) -> u32 {
    let mut baud = 0;
    for (rate, div) in SPEEDS {
        if div == divisor {
            baud = rate as u32;
        }
    }
    if baud == 0 && divisor != 0 {
        baud = TICK_CLOCK_HZ / TICKS_PER_BIT / divisor as u32;
    }
    baud
}

/// Compute a divisor for an arbitrary rate. Returns 0 when the rate is too
/// fast for the reference clock.
pub fn divisor_for_rate(baud: u32) -> u16 {
    if baud == 0 {
        return 0;
    }
    (TICK_CLOCK_HZ / TICKS_PER_BIT / baud) as u16
}

/// Tick period for a divisor, in microseconds.
pub fn tick_period_us(divisor: u16) -> u32 {
    divisor as u32 * (1_000_000 / TICK_CLOCK_HZ)
}

/// Shared divisor state between the polling side and the tick callback.
///
/// The polling side stores a new divisor; the tick callback picks up the
/// pending resync at its next invocation and restarts its bit counters, so a
/// rate change never corrupts a frame in flight.
pub struct BitClock {
    divisor: AtomicU16,
    resync: AtomicBool,
}

impl BitClock {
    pub const fn new() -> Self {
        Self {
            divisor: AtomicU16::new(DEFAULT_DIVISOR),
            resync: AtomicBool::new(false),
        }
    }

    /// Install a new divisor and request a resync. A zero divisor would stop
    /// the line clock entirely, so it is replaced by [`DEFAULT_DIVISOR`].
    pub fn set_divisor(&self, divisor: u16) {
        let divisor = if divisor == 0 { DEFAULT_DIVISOR } else { divisor };
        self.divisor.store(divisor, Ordering::Release);
        self.resync.store(true, Ordering::Release);
    }

    #[inline]
    pub fn divisor(&self) -> u16 {
        self.divisor.load(Ordering::Acquire)
    }

    /// Current tick period in microseconds. The hardware timer is
    /// reprogrammed whenever this changes.
    #[inline]
    pub fn tick_period_us(&self) -> u32 {
        tick_period_us(self.divisor())
    }

    /// Consume a pending resync request. Called from the tick context only.
    #[inline]
    pub(crate) fn take_resync(&self) -> bool {
        self.resync.swap(false, Ordering::AcqRel)
    }
}

impl Default for BitClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tabulated_rates() {
        assert_eq!(baud_to_divisor(45), 1833);
        assert_eq!(baud_to_divisor(50), 1667);
        assert_eq!(baud_to_divisor(110), 757);
        assert_eq!(divisor_to_baud(1833), 45);
        assert_eq!(divisor_to_baud(1667), 50);
    }

    #[test]
    fn test_unknown_rate_yields_zero() {
        assert_eq!(baud_to_divisor(300), 0);
        assert_eq!(baud_to_divisor(0), 0);
    }

    #[test]
    fn test_untabulated_divisor_uses_formula() {
        // 250000 / 3 = 83333, then / 9999 = 8
        assert_eq!(divisor_to_baud(9999), 8);
        assert_eq!(divisor_to_baud(0), 0);
    }

    #[test]
    fn test_winging_it() {
        assert_eq!(divisor_for_rate(300), 277);
        assert_eq!(divisor_for_rate(0), 0);
        // faster than the reference clock can express
        assert_eq!(divisor_for_rate(100_000), 0);
    }

    #[test]
    fn test_tick_period() {
        // 250 kHz reference: 4 us per divisor count
        assert_eq!(tick_period_us(1667), 6668);
        assert_eq!(tick_period_us(757), 3028);
    }

    #[test]
    fn test_bit_clock_rejects_zero() {
        let clock = BitClock::new();
        clock.set_divisor(0);
        assert_eq!(clock.divisor(), DEFAULT_DIVISOR);
    }

    #[test]
    fn test_bit_clock_resync_is_one_shot() {
        let clock = BitClock::new();
        assert!(!clock.take_resync());
        clock.set_divisor(757);
        assert!(clock.take_resync());
        assert!(!clock.take_resync());
        assert_eq!(clock.divisor(), 757);
    }
}
