//! Pulse counting shared between the edge interrupts and the polling loop.
//!
//! Each line has exactly one writer (its rising-edge interrupt) and one reader (the driver's
//! update cycle). The interrupt only ever increments; the reader swaps the count back to zero,
//! so no edge is lost or counted twice and neither side ever blocks the other.

use portable_atomic::{AtomicU32, Ordering};

use crate::calibration::get_hz;

/// The two pulse outputs of the chip.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Line {
    /// Active power.
    Cf,
    /// Current or voltage, depending on the `SEL` level.
    Cf1,
}

/// Rising-edge counters for the `CF` and `CF1` lines.
///
/// Lives in a `static` so the interrupt handlers can reach it without capturing state.
#[derive(Debug, Default)]
pub struct PulseCounter {
    cf: AtomicU32,
    cf1: AtomicU32,
}

impl PulseCounter {
    pub const fn new() -> Self {
        Self {
            cf: AtomicU32::new(0),
            cf1: AtomicU32::new(0),
        }
    }

    fn slot(&self, line: Line) -> &AtomicU32 {
        match line {
            Line::Cf => &self.cf,
            Line::Cf1 => &self.cf1,
        }
    }

    /// Records one rising edge. Safe to call from interrupt context.
    #[inline]
    pub fn on_edge(&self, line: Line) {
        self.slot(line).fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn on_cf_edge(&self) {
        self.on_edge(Line::Cf);
    }

    #[inline]
    pub fn on_cf1_edge(&self) {
        self.on_edge(Line::Cf1);
    }

    #[cfg(test)]
    fn pending(&self, line: Line) -> u32 {
        self.slot(line).load(Ordering::Relaxed)
    }

    /// Returns the edges counted so far and restarts the count at zero.
    pub fn take(&self, line: Line) -> u32 {
        self.slot(line).swap(0, Ordering::Relaxed)
    }
}

/// Pulses collected over one sampling window.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PulseSample {
    pub count: u32,
    /// Clock reading (µs) at which the window opened.
    pub started_at: u32,
}

impl PulseSample {
    /// Length of the window as seen from `now_us`. Tolerates one wrap of the microsecond clock.
    pub fn elapsed_us(&self, now_us: u32) -> u32 {
        now_us.wrapping_sub(self.started_at)
    }

    pub fn hz(&self, now_us: u32) -> f32 {
        get_hz(self.count, self.elapsed_us(now_us))
    }
}

/// Polling-side bookkeeping for one line: when it was last read.
#[derive(Copy, Clone, Debug)]
pub struct PulseWindow {
    line: Line,
    last_read: u32,
}

impl PulseWindow {
    pub const fn new(line: Line, now_us: u32) -> Self {
        Self {
            line,
            last_read: now_us,
        }
    }

    /// Moves the window baseline to `now_us` without touching the counter.
    pub fn restart(&mut self, now_us: u32) {
        self.last_read = now_us;
    }

    /// Takes this line's count from `counter` and opens a new window at `now_us`.
    pub fn read_and_reset(&mut self, counter: &PulseCounter, now_us: u32) -> PulseSample {
        let count = counter.take(self.line);
        let started_at = core::mem::replace(&mut self.last_read, now_us);
        PulseSample { count, started_at }
    }
}
